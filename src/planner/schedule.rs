//! Drawn-meal schedule views
//!
//! Splits the drawn-meal records into the full, date-ordered history and
//! the "future" view (today onward, with a grace window so a meal assigned
//! up to a day ago still counts as current).

use crate::planner::draw::DateRange;
use crate::planner::types::DrawnMeal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Default grace window: a record up to 24h in the past is still "future"
pub const DEFAULT_GRACE_WINDOW_MS: i64 = 86_400_000;

/// History and future views of the drawn meals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrawnMealPartition {
    /// Every record, ascending by assigned date
    pub history: Vec<DrawnMeal>,
    /// Records assigned today or later, within the grace window
    pub future: Vec<DrawnMeal>,
}

/// Milliseconds since the epoch of `date` at midnight UTC
pub fn date_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// True if a record assigned to `date` counts as current at `now`
pub fn is_current(date: NaiveDate, now: DateTime<Utc>, grace_window_ms: i64) -> bool {
    date_millis(date) - now.timestamp_millis() > -grace_window_ms
}

/// Sort records by date (stable, ties keep input order) and split off the
/// future view.
pub fn partition(
    records: &[DrawnMeal],
    now: DateTime<Utc>,
    grace_window_ms: i64,
) -> DrawnMealPartition {
    let mut history = records.to_vec();
    history.sort_by_key(|d| d.assigned_date);

    let future = history
        .iter()
        .filter(|d| is_current(d.assigned_date, now, grace_window_ms))
        .cloned()
        .collect();

    DrawnMealPartition { history, future }
}

/// Records whose date falls inside `range`, in date order
pub fn in_window(records: &[DrawnMeal], range: DateRange) -> Vec<DrawnMeal> {
    let mut selected: Vec<DrawnMeal> = records
        .iter()
        .filter(|d| range.contains(d.assigned_date))
        .cloned()
        .collect();
    selected.sort_by_key(|d| d.assigned_date);
    selected
}

/// The record scheduled on `date`, if any
pub fn on_date(records: &[DrawnMeal], date: NaiveDate) -> Option<&DrawnMeal> {
    records.iter().find(|d| d.assigned_date == date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn record(id: &str, day: &str) -> DrawnMeal {
        DrawnMeal::new(id, "m", date(day))
    }

    #[test]
    fn test_partition_example() {
        let records = vec![record("a", "2024-01-05"), record("b", "2024-01-01")];
        let parts = partition(&records, at("2024-01-03T00:00:00Z"), DEFAULT_GRACE_WINDOW_MS);

        let history: Vec<&str> = parts.history.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(history, vec!["b", "a"]);
        assert_eq!(parts.future, vec![record("a", "2024-01-05")]);
    }

    #[test]
    fn test_grace_window() {
        let now = at("2024-01-03T15:00:00Z");
        // 15h ago: still current
        assert!(is_current(date("2024-01-03"), now, DEFAULT_GRACE_WINDOW_MS));
        // 39h ago: past
        assert!(!is_current(date("2024-01-02"), now, DEFAULT_GRACE_WINDOW_MS));
        // Exactly 24h ago is excluded (strict comparison)
        assert!(!is_current(
            date("2024-01-02"),
            at("2024-01-03T00:00:00Z"),
            DEFAULT_GRACE_WINDOW_MS
        ));
    }

    #[test]
    fn test_stable_for_equal_dates() {
        let records = vec![
            record("x", "2024-01-02"),
            record("y", "2024-01-01"),
            record("z", "2024-01-02"),
        ];
        let parts = partition(&records, at("2024-01-01T00:00:00Z"), DEFAULT_GRACE_WINDOW_MS);
        let ids: Vec<&str> = parts.history.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_partition_is_idempotent() {
        let records = vec![
            record("a", "2024-02-10"),
            record("b", "2024-01-01"),
            record("c", "2024-02-10"),
            record("d", "2023-12-31"),
        ];
        let now = at("2024-01-15T08:00:00Z");

        let once = partition(&records, now, DEFAULT_GRACE_WINDOW_MS);
        let twice = partition(&once.history, now, DEFAULT_GRACE_WINDOW_MS);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        let parts = partition(&[], Utc::now(), DEFAULT_GRACE_WINDOW_MS);
        assert!(parts.history.is_empty());
        assert!(parts.future.is_empty());
    }

    #[test]
    fn test_in_window_and_on_date() {
        let records = vec![
            record("a", "2024-01-05"),
            record("b", "2024-01-01"),
            record("c", "2024-01-09"),
        ];
        let range = DateRange::new(date("2024-01-01"), date("2024-01-07")).unwrap();

        let ids: Vec<String> = in_window(&records, range).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        assert_eq!(on_date(&records, date("2024-01-09")).unwrap().id, "c");
        assert!(on_date(&records, date("2024-01-08")).is_none());
    }
}
