//! Slash-separated paths into the tree store
//!
//! A `DbPath` addresses a subtree, e.g. `alice-example-com/meals/42`.
//! The root path has no segments.

use crate::storage::error::{StorageError, StorageResult};
use std::fmt;

/// Characters that cannot appear in a path segment
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']', '/'];

/// A validated path into the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The root of the tree
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path. Leading and trailing slashes are ignored.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut path = Self::root();
        for segment in trimmed.split('/') {
            path = path.child(segment).map_err(|e| match e {
                StorageError::InvalidPath { reason, .. } => StorageError::InvalidPath {
                    path: raw.to_string(),
                    reason,
                },
                other => other,
            })?;
        }
        Ok(path)
    }

    /// Append one segment
    pub fn child(&self, segment: impl AsRef<str>) -> StorageResult<Self> {
        let segment = segment.as_ref();
        validate_segment(segment).map_err(|reason| StorageError::InvalidPath {
            path: format!("{}/{}", self, segment),
            reason,
        })?;

        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Path segments from the root down
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if `self` is `other` or one of its ancestors
    pub fn is_ancestor_of(&self, other: &DbPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// True if a write at `written` changes the subtree at `self`
    pub fn is_affected_by(&self, written: &DbPath) -> bool {
        self.is_ancestor_of(written) || written.is_ancestor_of(self)
    }
}

fn validate_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("empty segment".to_string());
    }
    if let Some(c) = segment.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        return Err(format!("segment contains {:?}", c));
    }
    Ok(())
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl std::str::FromStr for DbPath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_slashes() {
        let path = DbPath::parse("/household/meals/").unwrap();
        assert_eq!(path.segments(), &["household", "meals"]);
        assert_eq!(path.to_string(), "/household/meals");
    }

    #[test]
    fn test_parse_root() {
        assert!(DbPath::parse("").unwrap().is_root());
        assert!(DbPath::parse("/").unwrap().is_root());
    }

    #[test]
    fn test_rejects_forbidden_characters() {
        assert!(DbPath::parse("a/b.c").is_err());
        assert!(DbPath::parse("a//b").is_err());
        assert!(DbPath::parse("a/$b").is_err());
        assert!(DbPath::root().child("x[0]").is_err());
    }

    #[test]
    fn test_ancestry() {
        let household = DbPath::parse("k").unwrap();
        let meals = DbPath::parse("k/meals").unwrap();
        let meal = DbPath::parse("k/meals/1").unwrap();
        let other = DbPath::parse("k/drawnMeals").unwrap();

        assert!(household.is_ancestor_of(&meal));
        assert!(meals.is_ancestor_of(&meals));
        assert!(!meal.is_ancestor_of(&meals));

        assert!(meals.is_affected_by(&meal));
        assert!(meals.is_affected_by(&household));
        assert!(!meals.is_affected_by(&other));
    }

    #[test]
    fn test_parent_and_key() {
        let meal = DbPath::parse("k/meals/1").unwrap();
        assert_eq!(meal.key(), Some("1"));
        assert_eq!(meal.parent().unwrap().to_string(), "/k/meals");
        assert!(DbPath::root().parent().is_none());
    }
}
