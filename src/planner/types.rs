//! Core data types for meal planning
//!
//! Field names serialize in camelCase so stored records keep the shape the
//! household data has always had (`frequencyDays`, `lastDrawn`, ...).

use crate::planner::error::{PlannerError, PlannerResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One ingredient line of a meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aisle: Option<u32>,
    /// Catalog item this ingredient resolves to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grocery_id: Option<String>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn aisle(mut self, aisle: u32) -> Self {
        self.aisle = Some(aisle);
        self
    }
}

/// A meal in the hat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    #[serde(default)]
    pub id: String,
    pub title: String,
    /// Minimum number of days between two draws of this meal
    #[serde(default)]
    pub frequency_days: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_drawn: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Meal {
    pub fn new(id: impl Into<String>, title: impl Into<String>, frequency_days: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            frequency_days,
            ingredients: Vec::new(),
            last_drawn: None,
            notes: None,
        }
    }

    pub fn ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    pub fn last_drawn(mut self, date: NaiveDate) -> Self {
        self.last_drawn = Some(date);
        self
    }

    /// Reject meals without a title or with unusable quantities
    pub fn validate(&self) -> PlannerResult<()> {
        let invalid = |reason: &str| PlannerError::Invalid {
            kind: "meal",
            reason: reason.to_string(),
        };

        if self.title.trim().is_empty() {
            return Err(invalid("title is required"));
        }
        for ingredient in &self.ingredients {
            if ingredient.name.trim().is_empty() {
                return Err(invalid("ingredient name is required"));
            }
            if let Some(q) = ingredient.quantity {
                if !q.is_finite() || q < 0.0 {
                    return Err(PlannerError::InvalidQuantity(q));
                }
            }
        }
        Ok(())
    }

    /// A meal is eligible on `today` if it was never drawn, or was last drawn
    /// at least `frequency_days` days before `today`.
    pub fn is_eligible_on(&self, today: NaiveDate) -> bool {
        match self.last_drawn {
            None => true,
            Some(last) => (today - last).num_days() >= i64::from(self.frequency_days),
        }
    }
}

/// A meal scheduled onto a calendar date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrawnMeal {
    #[serde(default)]
    pub id: String,
    pub meal_id: String,
    pub assigned_date: NaiveDate,
}

impl DrawnMeal {
    pub fn new(id: impl Into<String>, meal_id: impl Into<String>, assigned_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            meal_id: meal_id.into(),
            assigned_date,
        }
    }
}

/// A canonical grocery item, independent of any meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroceryCatalogItem {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_aisle: Option<u32>,
}

/// Where a shopping list entry came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    /// Derived from an ingredient of a drawn meal
    Meal,
    /// Added by hand on the grocery page
    Manual,
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySource::Meal => write!(f, "meal"),
            EntrySource::Manual => write!(f, "manual"),
        }
    }
}

/// One line of the shopping list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListEntry {
    #[serde(default)]
    pub id: String,
    pub grocery_id: String,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aisle: Option<u32>,
    pub source: EntrySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawn_meal_id: Option<String>,
    #[serde(default)]
    pub purchased: bool,
}

fn default_quantity() -> f64 {
    1.0
}

impl ShoppingListEntry {
    /// A manual entry for a catalog item
    pub fn manual(item: &GroceryCatalogItem, quantity: f64) -> Self {
        Self {
            id: String::new(),
            grocery_id: item.id.clone(),
            name: item.name.clone(),
            quantity,
            units: item.default_units.clone(),
            aisle: item.default_aisle,
            source: EntrySource::Manual,
            meal_id: None,
            drawn_meal_id: None,
            purchased: false,
        }
    }

    /// Aisle used for ordering; missing aisles sort after every numbered one
    pub fn sort_aisle(&self) -> u32 {
        self.aisle.unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_meal_json_shape() {
        let meal = Meal::new("1", "Tacos", 7)
            .ingredient(Ingredient::new("beef").quantity(1.0).units("lb").aisle(4))
            .last_drawn(date("2024-01-01"));

        let value = serde_json::to_value(&meal).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "1",
                "title": "Tacos",
                "frequencyDays": 7,
                "ingredients": [{"name": "beef", "quantity": 1.0, "units": "lb", "aisle": 4}],
                "lastDrawn": "2024-01-01"
            })
        );
    }

    #[test]
    fn test_meal_parses_sparse_record() {
        let meal: Meal = serde_json::from_value(json!({"title": "Soup"})).unwrap();
        assert_eq!(meal.frequency_days, 0);
        assert!(meal.ingredients.is_empty());
        assert!(meal.last_drawn.is_none());
    }

    #[test]
    fn test_eligibility_boundary() {
        let meal = Meal::new("1", "Tacos", 7).last_drawn(date("2024-01-01"));
        assert!(!meal.is_eligible_on(date("2024-01-07")));
        assert!(meal.is_eligible_on(date("2024-01-08")));

        let never = Meal::new("2", "Soup", 30);
        assert!(never.is_eligible_on(date("2024-01-01")));
    }

    #[test]
    fn test_validate() {
        assert!(Meal::new("1", "Tacos", 7).validate().is_ok());
        assert!(Meal::new("1", "  ", 7).validate().is_err());
        assert_eq!(
            Meal::new("1", "Tacos", 7)
                .ingredient(Ingredient::new("beef").quantity(-1.0))
                .validate(),
            Err(PlannerError::InvalidQuantity(-1.0))
        );
    }

    #[test]
    fn test_entry_source_serialization() {
        assert_eq!(serde_json::to_value(EntrySource::Meal).unwrap(), json!("meal"));
        assert_eq!(EntrySource::Manual.to_string(), "manual");
    }

    #[test]
    fn test_missing_aisle_sorts_last() {
        let item = GroceryCatalogItem {
            id: "g".to_string(),
            name: "milk".to_string(),
            default_units: None,
            default_aisle: None,
        };
        assert_eq!(ShoppingListEntry::manual(&item, 1.0).sort_aisle(), u32::MAX);
    }
}
