//! One-time conversion of the legacy shopping list
//!
//! Older households stored the list as
//! `{ items: { id: {name, quantity, units, aisle} }, purchased: { id: qty } }`.
//! Each legacy item becomes a catalog item plus a manual entry, and the
//! household is stamped with [`SCHEMA_VERSION`] so the check never runs again.

use crate::planner::catalog::{normalize_name, GroceryCatalog, Resolution};
use crate::planner::error::{PlannerError, PlannerResult};
use crate::planner::types::{EntrySource, GroceryCatalogItem, ShoppingListEntry};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Schema version written after migration
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Deserialize)]
struct LegacyItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    quantity: Option<f64>,
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    aisle: Option<u32>,
}

/// Records to write when migrating a household
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    /// Catalog items that did not exist yet
    pub catalog_items: Vec<GroceryCatalogItem>,
    /// Manual entries replacing the legacy items
    pub entries: Vec<ShoppingListEntry>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.catalog_items.is_empty() && self.entries.is_empty()
    }
}

/// True if `shopping_list` has the legacy `{items, purchased}` shape
pub fn is_legacy(shopping_list: &Value) -> bool {
    match shopping_list.as_object() {
        Some(map) => map.contains_key("items") || map.contains_key("purchased"),
        None => false,
    }
}

/// Convert a legacy shopping list into catalog items and manual entries.
///
/// Legacy ids are kept as entry ids. Items whose name is already in the
/// catalog reuse that catalog item; new names get a `legacy-<id>` catalog id.
pub fn plan_migration(legacy: &Value, catalog: &GroceryCatalog) -> PlannerResult<MigrationPlan> {
    let empty = Map::new();
    let root = legacy.as_object().ok_or_else(|| PlannerError::Invalid {
        kind: "legacy shopping list",
        reason: "expected an object".to_string(),
    })?;
    let items = root.get("items").and_then(Value::as_object).unwrap_or(&empty);
    let purchased = root
        .get("purchased")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut plan = MigrationPlan::default();
    let mut created: HashMap<String, usize> = HashMap::new();

    for (id, raw) in items {
        let item: LegacyItem = match serde_json::from_value(raw.clone()) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(legacy_id = %id, error = %e, "Skipping malformed legacy item");
                continue;
            }
        };
        if item.name.trim().is_empty() {
            continue;
        }

        let quantity = item.quantity.filter(|q| q.is_finite() && *q > 0.0).unwrap_or(1.0);
        let purchased_qty = purchased.get(id).and_then(Value::as_f64).unwrap_or(0.0);

        let grocery_id = match catalog.resolve(&item.name, item.units.as_deref(), item.aisle) {
            Resolution::Existing(existing) => existing.id.clone(),
            Resolution::New(mut new_item) => {
                let key = normalize_name(&item.name);
                match created.get(&key) {
                    Some(&i) => plan.catalog_items[i].id.clone(),
                    None => {
                        new_item.id = format!("legacy-{}", id);
                        created.insert(key, plan.catalog_items.len());
                        let id = new_item.id.clone();
                        plan.catalog_items.push(new_item);
                        id
                    }
                }
            }
        };

        plan.entries.push(ShoppingListEntry {
            id: id.clone(),
            grocery_id,
            name: item.name.trim().to_string(),
            quantity,
            units: item.units,
            aisle: item.aisle,
            source: EntrySource::Manual,
            meal_id: None,
            drawn_meal_id: None,
            purchased: purchased_qty >= quantity,
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_legacy() {
        assert!(is_legacy(&json!({"items": {}})));
        assert!(is_legacy(&json!({"purchased": {"a": 1}})));
        assert!(!is_legacy(&json!({"abc": {"name": "milk"}})));
        assert!(!is_legacy(&json!(null)));
    }

    #[test]
    fn test_plan_migration() {
        let catalog = GroceryCatalog::new(vec![GroceryCatalogItem {
            id: "g-milk".to_string(),
            name: "Milk".to_string(),
            default_units: None,
            default_aisle: Some(3),
        }]);
        let legacy = json!({
            "items": {
                "a": {"name": "milk", "quantity": 2, "units": "L"},
                "b": {"name": "Eggs", "quantity": 12, "aisle": 1},
                "c": {"name": "eggs ", "quantity": 6},
                "d": {"name": ""}
            },
            "purchased": {"a": 2, "b": 6}
        });

        let plan = plan_migration(&legacy, &catalog).unwrap();

        assert_eq!(plan.catalog_items.len(), 1);
        assert_eq!(plan.catalog_items[0].id, "legacy-b");
        assert_eq!(plan.catalog_items[0].default_aisle, Some(1));

        assert_eq!(plan.entries.len(), 3);
        let by_id: HashMap<&str, &ShoppingListEntry> =
            plan.entries.iter().map(|e| (e.id.as_str(), e)).collect();
        assert_eq!(by_id["a"].grocery_id, "g-milk");
        assert!(by_id["a"].purchased);
        assert!(!by_id["b"].purchased);
        assert_eq!(by_id["c"].grocery_id, "legacy-b");
        assert!(!by_id["c"].purchased);
        assert!(plan.entries.iter().all(|e| e.source == EntrySource::Manual));
    }

    #[test]
    fn test_plan_migration_rejects_non_object() {
        assert!(plan_migration(&json!([1, 2]), &GroceryCatalog::default()).is_err());
    }

    #[test]
    fn test_plan_migration_empty() {
        let plan = plan_migration(&json!({"purchased": {}}), &GroceryCatalog::default()).unwrap();
        assert!(plan.is_empty());
    }
}
