//! Shopping list aggregation
//!
//! The displayed list is a pure function of the meals, the drawn meals in
//! the shopping window, the manual entries and the purchased flags of
//! meal-derived entries. Meal-derived entries get deterministic ids
//! (`<drawnMealId>-<ingredientIndex>`) so their purchased flag survives
//! recomputation.

use crate::planner::catalog::GroceryCatalog;
use crate::planner::error::{PlannerError, PlannerResult};
use crate::planner::types::{DrawnMeal, EntrySource, Meal, ShoppingListEntry};
use serde::Serialize;
use std::collections::HashMap;

/// Purchased flags of meal-derived entries, keyed by entry id
pub type PurchaseState = HashMap<String, bool>;

/// Id of the entry generated for ingredient `index` of a drawn meal
pub fn meal_entry_id(drawn_meal_id: &str, index: usize) -> String {
    format!("{}-{}", drawn_meal_id, index)
}

/// Entries for every ingredient of every drawn meal in the window
pub fn meal_entries(
    meals: &[Meal],
    drawn: &[DrawnMeal],
    catalog: &GroceryCatalog,
) -> Vec<ShoppingListEntry> {
    let by_id: HashMap<&str, &Meal> = meals.iter().map(|m| (m.id.as_str(), m)).collect();
    let mut entries = Vec::new();

    for record in drawn {
        let Some(meal) = by_id.get(record.meal_id.as_str()) else {
            tracing::debug!(meal_id = %record.meal_id, "Drawn meal refers to a deleted meal");
            continue;
        };

        for (index, ingredient) in meal.ingredients.iter().enumerate() {
            if ingredient.name.trim().is_empty() {
                continue;
            }

            let known = ingredient
                .grocery_id
                .as_deref()
                .and_then(|id| catalog.get(id))
                .or_else(|| catalog.find_by_name(&ingredient.name));

            let grocery_id = known
                .map(|item| item.id.clone())
                .or_else(|| ingredient.grocery_id.clone())
                .unwrap_or_else(|| GroceryCatalog::fallback_id(&ingredient.name));

            let quantity = ingredient
                .quantity
                .filter(|q| q.is_finite() && *q > 0.0)
                .unwrap_or(1.0);

            entries.push(ShoppingListEntry {
                id: meal_entry_id(&record.id, index),
                grocery_id,
                name: ingredient.name.trim().to_string(),
                quantity,
                units: ingredient
                    .units
                    .clone()
                    .or_else(|| known.and_then(|i| i.default_units.clone())),
                aisle: ingredient.aisle.or_else(|| known.and_then(|i| i.default_aisle)),
                source: EntrySource::Meal,
                meal_id: Some(meal.id.clone()),
                drawn_meal_id: Some(record.id.clone()),
                purchased: false,
            });
        }
    }

    entries
}

/// Build the display list: meal-derived plus manual entries, sorted by aisle
pub fn aggregate(
    meals: &[Meal],
    drawn_in_window: &[DrawnMeal],
    manual: &[ShoppingListEntry],
    purchases: &PurchaseState,
    catalog: &GroceryCatalog,
) -> Vec<ShoppingListEntry> {
    let mut entries: Vec<ShoppingListEntry> = meal_entries(meals, drawn_in_window, catalog)
        .into_iter()
        .map(|mut entry| {
            entry.purchased = purchases.get(&entry.id).copied().unwrap_or(false);
            entry
        })
        .collect();

    entries.extend(manual.iter().cloned().map(|mut entry| {
        if entry.aisle.is_none() {
            entry.aisle = catalog.get(&entry.grocery_id).and_then(|i| i.default_aisle);
        }
        entry
    }));

    sort_by_aisle(&mut entries);
    entries
}

/// Stable ascending sort by aisle; entries without an aisle go last
pub fn sort_by_aisle(entries: &mut [ShoppingListEntry]) {
    entries.sort_by_key(ShoppingListEntry::sort_aisle);
}

/// Entries still to buy
pub fn unpurchased(entries: &[ShoppingListEntry]) -> Vec<ShoppingListEntry> {
    entries.iter().filter(|e| !e.purchased).cloned().collect()
}

/// Flip the purchased flag
pub fn toggle_purchased(entry: &ShoppingListEntry) -> ShoppingListEntry {
    ShoppingListEntry {
        purchased: !entry.purchased,
        ..entry.clone()
    }
}

/// Apply a +/- quantity change. `None` means the entry should be removed.
pub fn adjust_quantity(
    entry: &ShoppingListEntry,
    delta: f64,
) -> PlannerResult<Option<ShoppingListEntry>> {
    if !delta.is_finite() {
        return Err(PlannerError::InvalidQuantity(delta));
    }

    let quantity = entry.quantity + delta;
    if quantity <= 0.0 {
        return Ok(None);
    }

    Ok(Some(ShoppingListEntry {
        quantity,
        ..entry.clone()
    }))
}

/// Same grocery in the same units, summed for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedItem {
    pub grocery_id: String,
    pub name: String,
    pub quantity: f64,
    pub units: Option<String>,
    pub aisle: Option<u32>,
    pub entry_ids: Vec<String>,
    /// True only when every merged entry is purchased
    pub purchased: bool,
}

/// Merge entries for the same grocery and units, keeping first-seen order
pub fn consolidate(entries: &[ShoppingListEntry]) -> Vec<ConsolidatedItem> {
    let mut items: Vec<ConsolidatedItem> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for entry in entries {
        let units_key = entry
            .units
            .as_deref()
            .map(|u| u.trim().to_lowercase())
            .unwrap_or_default();
        let key = (entry.grocery_id.clone(), units_key);

        match index.get(&key) {
            Some(&i) => {
                let item = &mut items[i];
                item.quantity += entry.quantity;
                item.entry_ids.push(entry.id.clone());
                item.purchased &= entry.purchased;
                if item.aisle.is_none() {
                    item.aisle = entry.aisle;
                }
            }
            None => {
                index.insert(key, items.len());
                items.push(ConsolidatedItem {
                    grocery_id: entry.grocery_id.clone(),
                    name: entry.name.clone(),
                    quantity: entry.quantity,
                    units: entry.units.clone(),
                    aisle: entry.aisle,
                    entry_ids: vec![entry.id.clone()],
                    purchased: entry.purchased,
                });
            }
        }
    }

    items
}

/// Render the list as CSV (`aisle,name,quantity,units,source,purchased`)
pub fn to_csv(entries: &[ShoppingListEntry]) -> PlannerResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let export = |e: csv::Error| PlannerError::Export(e.to_string());

    writer
        .write_record(["aisle", "name", "quantity", "units", "source", "purchased"])
        .map_err(export)?;

    for entry in entries {
        writer
            .write_record([
                entry.aisle.map(|a| a.to_string()).unwrap_or_default(),
                entry.name.clone(),
                entry.quantity.to_string(),
                entry.units.clone().unwrap_or_default(),
                entry.source.to_string(),
                entry.purchased.to_string(),
            ])
            .map_err(export)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PlannerError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PlannerError::Export(e.to_string()))
}
