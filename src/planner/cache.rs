//! In-memory view of one household's collections
//!
//! Each collection is replaced wholesale whenever its listener delivers a new
//! snapshot. Readers get typed values; nothing here touches the store.

use crate::planner::catalog::GroceryCatalog;
use crate::planner::schedule::{partition, DrawnMealPartition};
use crate::planner::shopping::PurchaseState;
use crate::planner::types::{DrawnMeal, Meal, ShoppingListEntry};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A household collection kept in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Meals,
    DrawnMeals,
    GroceryCatalog,
    ShoppingList,
    Purchases,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Meals,
        Collection::DrawnMeals,
        Collection::GroceryCatalog,
        Collection::ShoppingList,
        Collection::Purchases,
    ];

    /// Child key under the household root
    pub fn segment(&self) -> &'static str {
        match self {
            Collection::Meals => "meals",
            Collection::DrawnMeals => "drawnMeals",
            Collection::GroceryCatalog => "grocery-catalog",
            Collection::ShoppingList => "shopping-list",
            Collection::Purchases => "purchases",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segment())
    }
}

/// Records whose `id` is stored as the map key
trait Keyed {
    fn set_id(&mut self, id: &str);
}

impl Keyed for Meal {
    fn set_id(&mut self, id: &str) {
        if self.id.is_empty() {
            self.id = id.to_string();
        }
    }
}

impl Keyed for DrawnMeal {
    fn set_id(&mut self, id: &str) {
        if self.id.is_empty() {
            self.id = id.to_string();
        }
    }
}

impl Keyed for crate::planner::types::GroceryCatalogItem {
    fn set_id(&mut self, id: &str) {
        if self.id.is_empty() {
            self.id = id.to_string();
        }
    }
}

impl Keyed for ShoppingListEntry {
    fn set_id(&mut self, id: &str) {
        if self.id.is_empty() {
            self.id = id.to_string();
        }
    }
}

/// Parse an object of `{id: record}` children, skipping malformed records
fn parse_map<T: DeserializeOwned + Keyed>(collection: Collection, value: Option<Value>) -> Vec<T> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };

    map.into_iter()
        .filter_map(|(id, raw)| match serde_json::from_value::<T>(raw) {
            Ok(mut record) => {
                record.set_id(&id);
                Some(record)
            }
            Err(e) => {
                tracing::warn!(%collection, record_id = %id, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

/// Typed, per-household application state
#[derive(Debug, Clone, Default)]
pub struct HouseholdCache {
    meals: Vec<Meal>,
    drawn_meals: Vec<DrawnMeal>,
    catalog: GroceryCatalog,
    manual: Vec<ShoppingListEntry>,
    purchases: PurchaseState,
    loaded: HashSet<Collection>,
}

impl HouseholdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `collection` with the records in `value`
    pub fn apply_snapshot(&mut self, collection: Collection, value: Option<Value>) {
        match collection {
            Collection::Meals => {
                let mut meals: Vec<Meal> = parse_map(collection, value);
                meals.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
                self.meals = meals;
            }
            Collection::DrawnMeals => {
                let mut drawn: Vec<DrawnMeal> = parse_map(collection, value);
                drawn.sort_by_key(|d| d.assigned_date);
                self.drawn_meals = drawn;
            }
            Collection::GroceryCatalog => {
                self.catalog = GroceryCatalog::new(parse_map(collection, value));
            }
            Collection::ShoppingList => {
                self.manual = parse_map(collection, value);
            }
            Collection::Purchases => {
                self.purchases = match value {
                    Some(Value::Object(map)) => map
                        .into_iter()
                        .filter_map(|(id, v)| v.as_bool().map(|b| (id, b)))
                        .collect(),
                    _ => PurchaseState::new(),
                };
            }
        }
        self.loaded.insert(collection);
    }

    /// Drop everything (used when switching households)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True once every collection has received its first snapshot
    pub fn is_ready(&self) -> bool {
        Collection::ALL.iter().all(|c| self.loaded.contains(c))
    }

    pub fn meals(&self) -> &[Meal] {
        &self.meals
    }

    pub fn meal(&self, id: &str) -> Option<&Meal> {
        self.meals.iter().find(|m| m.id == id)
    }

    /// Drawn meals in date order
    pub fn drawn_meals(&self) -> &[DrawnMeal] {
        &self.drawn_meals
    }

    pub fn drawn_meal(&self, id: &str) -> Option<&DrawnMeal> {
        self.drawn_meals.iter().find(|d| d.id == id)
    }

    pub fn partition(&self, now: DateTime<Utc>, grace_window_ms: i64) -> DrawnMealPartition {
        partition(&self.drawn_meals, now, grace_window_ms)
    }

    pub fn catalog(&self) -> &GroceryCatalog {
        &self.catalog
    }

    pub fn manual_entries(&self) -> &[ShoppingListEntry] {
        &self.manual
    }

    pub fn purchases(&self) -> &PurchaseState {
        &self.purchases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_snapshot_parses_and_fills_ids() {
        let mut cache = HouseholdCache::new();
        cache.apply_snapshot(
            Collection::Meals,
            Some(json!({
                "m2": {"title": "tacos", "frequencyDays": 7},
                "m1": {"id": "m1", "title": "Curry", "frequencyDays": 14},
                "bad": {"frequencyDays": "often"}
            })),
        );

        let titles: Vec<&str> = cache.meals().iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Curry", "tacos"]);
        assert_eq!(cache.meal("m2").unwrap().frequency_days, 7);
        assert!(cache.meal("bad").is_none());
    }

    #[test]
    fn test_snapshot_replaces_wholesale() {
        let mut cache = HouseholdCache::new();
        cache.apply_snapshot(
            Collection::DrawnMeals,
            Some(json!({
                "d2": {"mealId": "m", "assignedDate": "2024-01-05"},
                "d1": {"mealId": "m", "assignedDate": "2024-01-01"}
            })),
        );
        assert_eq!(cache.drawn_meals()[0].id, "d1");

        cache.apply_snapshot(Collection::DrawnMeals, None);
        assert!(cache.drawn_meals().is_empty());
    }

    #[test]
    fn test_purchases_and_ready() {
        let mut cache = HouseholdCache::new();
        assert!(!cache.is_ready());

        cache.apply_snapshot(Collection::Purchases, Some(json!({"d1-0": true, "d1-1": 3})));
        assert_eq!(cache.purchases().len(), 1);
        assert_eq!(cache.purchases().get("d1-0"), Some(&true));

        for collection in Collection::ALL {
            cache.apply_snapshot(collection, None);
        }
        assert!(cache.is_ready());

        cache.clear();
        assert!(!cache.is_ready());
        assert!(cache.purchases().is_empty());
    }

    #[test]
    fn test_collection_segments() {
        assert_eq!(Collection::DrawnMeals.to_string(), "drawnMeals");
        assert_eq!(
            serde_json::to_value(Collection::GroceryCatalog).unwrap(),
            json!("grocery_catalog")
        );
    }
}
