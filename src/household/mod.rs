//! Households
//!
//! A household is the unit of data isolation: every meal, drawn meal,
//! grocery and shopping entry lives under one household key. This module
//! derives keys, manages meal hats, and provides the [`Workspace`] that
//! keeps a session's view of its active household live.

pub mod error;
pub mod hats;
pub mod key;
pub mod workspace;

pub use error::{HouseholdError, HouseholdResult};
pub use hats::{create_hat, join_hat, list_hats, HatProfile, MealHat};
pub use key::{derive_key, HouseholdKey};
pub use workspace::{HomeSummary, ScheduledMeal, Workspace, WorkspaceSettings};
