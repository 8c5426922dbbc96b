//! Planner error types

use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced by the planning logic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// No meal passes the recency check for the requested date
    #[error("No eligible meals to draw for {0}")]
    NoEligibleMeals(NaiveDate),

    /// Date range is inverted or too long
    #[error("Invalid date range {start}..={end}: {reason}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    /// Quantity is not a positive finite number
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(f64),

    /// Record is malformed
    #[error("Invalid {kind}: {reason}")]
    Invalid { kind: &'static str, reason: String },

    /// CSV rendering failed
    #[error("Export failed: {0}")]
    Export(String),
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::NoEligibleMeals("2024-01-01".parse().unwrap());
        assert_eq!(err.to_string(), "No eligible meals to draw for 2024-01-01");
    }
}
