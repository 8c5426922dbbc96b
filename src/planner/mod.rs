//! Meal planning logic
//!
//! Everything here is pure: functions take borrowed records and return new
//! values, and randomness is injected through [`rand::Rng`]. The household
//! workspace feeds these functions from the store and writes the results
//! back.
//!
//! # Example
//!
//! ```rust
//! use mealhat::planner::{draw_meal, Meal};
//! use rand::SeedableRng;
//!
//! let meals = vec![Meal::new("1", "Tacos", 7)];
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let today = "2024-01-01".parse().unwrap();
//! assert_eq!(draw_meal(&meals, today, &mut rng).unwrap().title, "Tacos");
//! ```

pub mod cache;
pub mod catalog;
pub mod draw;
pub mod error;
pub mod migration;
pub mod schedule;
pub mod shopping;
pub mod types;

pub use cache::{Collection, HouseholdCache};
pub use catalog::{normalize_name, GroceryCatalog, Resolution};
pub use draw::{draw_meal, draw_range, eligible_meals, redraw_meal, DateRange, DrawOutcome};
pub use error::{PlannerError, PlannerResult};
pub use migration::{is_legacy, plan_migration, MigrationPlan, SCHEMA_VERSION};
pub use schedule::{in_window, partition, DrawnMealPartition, DEFAULT_GRACE_WINDOW_MS};
pub use shopping::{
    adjust_quantity, aggregate, consolidate, meal_entries, meal_entry_id, sort_by_aisle, to_csv,
    toggle_purchased, unpurchased, ConsolidatedItem, PurchaseState,
};
pub use types::{DrawnMeal, EntrySource, GroceryCatalogItem, Ingredient, Meal, ShoppingListEntry};
