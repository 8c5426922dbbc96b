//! Household error types

use crate::planner::PlannerError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised by household workspaces and meal hats
#[derive(Error, Debug)]
pub enum HouseholdError {
    /// Key is empty or cannot be used as a database path segment
    #[error("Invalid household key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// No meal hat exists under this name
    #[error("Meal hat not found: {0}")]
    HatNotFound(String),

    /// A meal hat with this key already exists
    #[error("Meal hat already exists: {0}")]
    HatExists(String),

    /// Record referenced by id does not exist in the active household
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Workspace has been closed (logout)
    #[error("Workspace is closed")]
    Closed,

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl HouseholdError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        HouseholdError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type alias for household operations
pub type HouseholdResult<T> = Result<T, HouseholdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            HouseholdError::not_found("Meal", "m1").to_string(),
            "Meal not found: m1"
        );
        let err: HouseholdError = StorageError::ShutDown.into();
        assert_eq!(err.to_string(), "Store is shut down");
    }
}
