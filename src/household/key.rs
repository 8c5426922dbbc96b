//! Household keys
//!
//! A household's data lives under a single top-level key derived from an
//! email address (or, for shared meal hats, from the hat's name behind a
//! `~` prefix that no email-derived key can carry). The
//! derivation replaces punctuation with `-`, so `a.b@x.com` and `a-b@x.com`
//! map to the same key. Existing data is stored under these keys, so the
//! collision is kept rather than changing the derivation.

use crate::household::error::{HouseholdError, HouseholdResult};
use crate::planner::Collection;
use crate::storage::{DbPath, StorageResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[-!$%@^&*()_+|~=`{}\[\]:";'<>?,./]"#).expect("Invalid regex"));

/// Top-level key reserved for per-user records
pub const USERS_ROOT: &str = "users";

/// Leading character of every meal hat key. `derive_key` replaces it, so no
/// email-derived key can start with it.
pub const HAT_PREFIX: char = '~';

/// Replace every punctuation character with `-`
pub fn derive_key(raw: &str) -> String {
    PUNCTUATION.replace_all(raw, "-").into_owned()
}

/// Key of a household (or user) subtree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HouseholdKey(String);

impl HouseholdKey {
    /// Derive the key for an email address
    pub fn from_email(email: &str) -> HouseholdResult<Self> {
        Self::parse(&derive_key(email.trim()))
    }

    /// Derive the key for a meal hat name
    pub fn from_name(name: &str) -> HouseholdResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HouseholdError::InvalidKey {
                key: name.to_string(),
                reason: "hat name is empty".to_string(),
            });
        }
        Self::parse(&format!("{}{}", HAT_PREFIX, derive_key(name)))
    }

    /// True for keys made by [`HouseholdKey::from_name`]
    pub fn is_hat(&self) -> bool {
        self.0.starts_with(HAT_PREFIX)
    }

    /// Validate a key supplied by a client
    pub fn parse(raw: &str) -> HouseholdResult<Self> {
        let invalid = |reason: String| HouseholdError::InvalidKey {
            key: raw.to_string(),
            reason,
        };

        if raw.trim().is_empty() {
            return Err(invalid("key is empty".to_string()));
        }
        if raw == USERS_ROOT {
            return Err(invalid("key is reserved".to_string()));
        }
        DbPath::root().child(raw).map_err(|e| invalid(e.to_string()))?;

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `K`
    pub fn root(&self) -> DbPath {
        DbPath::root().child(&self.0).unwrap_or_default()
    }

    /// `K/<collection>`
    pub fn collection(&self, collection: Collection) -> DbPath {
        self.child(collection.segment())
            .unwrap_or_else(|_| self.root())
    }

    /// `K/<segment>`
    pub fn child(&self, segment: &str) -> StorageResult<DbPath> {
        self.root().child(segment)
    }

    /// `K/<collection>/<id>`
    pub fn record(&self, collection: Collection, id: &str) -> StorageResult<DbPath> {
        self.collection(collection).child(id)
    }

    /// `users/<K>` when this key identifies a user
    pub fn user_root(&self) -> StorageResult<DbPath> {
        DbPath::root().child(USERS_ROOT)?.child(&self.0)
    }
}

impl fmt::Display for HouseholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HouseholdKey {
    type Error = HouseholdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HouseholdKey> for String {
    fn from(key: HouseholdKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_email() {
        let key = HouseholdKey::from_email("jane.doe@example.com").unwrap();
        assert_eq!(key.as_str(), "jane-doe-example-com");
        assert_eq!(
            HouseholdKey::from_email("jane.doe@example.com").unwrap(),
            key
        );
    }

    #[test]
    fn test_punctuation_collision_is_kept() {
        // Both addresses share one household; existing data depends on it.
        let dotted = HouseholdKey::from_email("a.b@x.com").unwrap();
        let dashed = HouseholdKey::from_email("a-b@x.com").unwrap();
        assert_eq!(dotted, dashed);
        assert_eq!(dotted.as_str(), "a-b-x-com");
    }

    #[test]
    fn test_derive_key_replaces_every_listed_character() {
        assert_eq!(derive_key(r#"-!$%@^&*()_+|~=`{}[]:";'<>?,./"#), "-".repeat(30));
        assert_eq!(derive_key("Smith Family"), "Smith Family");
    }

    #[test]
    fn test_hat_keys_never_match_email_keys() {
        let hat = HouseholdKey::from_name("bob@example.com").unwrap();
        let bob = HouseholdKey::from_email("bob@example.com").unwrap();
        assert_eq!(hat.as_str(), "~bob-example-com");
        assert_ne!(hat, bob);
        assert!(hat.is_hat());
        assert!(!bob.is_hat());

        // Even an email spelled like a hat key derives to a plain key
        assert!(!HouseholdKey::from_email("~bob-example-com@x.com").unwrap().is_hat());
        assert!(HouseholdKey::from_name("  ").is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_keys() {
        assert!(HouseholdKey::parse("").is_err());
        assert!(HouseholdKey::parse("a#b").is_err());
        assert!(HouseholdKey::parse("a/b").is_err());
        assert!(HouseholdKey::parse(USERS_ROOT).is_err());
        assert!(HouseholdKey::from_email("#1@x.com").is_err());
        assert!(HouseholdKey::parse("smith-family").is_ok());
    }

    #[test]
    fn test_paths() {
        let key = HouseholdKey::parse("home").unwrap();
        assert_eq!(key.collection(Collection::Meals).to_string(), "/home/meals");
        assert_eq!(
            key.record(Collection::DrawnMeals, "d1").unwrap().to_string(),
            "/home/drawnMeals/d1"
        );
        assert_eq!(key.user_root().unwrap().to_string(), "/users/home");
    }

    #[test]
    fn test_serde_validates() {
        let key: HouseholdKey = serde_json::from_str("\"home\"").unwrap();
        assert_eq!(key.as_str(), "home");
        assert!(serde_json::from_str::<HouseholdKey>("\"a.b\"").is_err());
    }
}
