//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::SessionState;
use crate::household::{HouseholdKey, MealHat, ScheduledMeal};
use crate::planner::{ConsolidatedItem, DrawnMeal, GroceryCatalogItem, Ingredient, Meal, ShoppingListEntry};

// ============================================
// AUTH DTOs
// ============================================

/// Login with a credential from the identity provider
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub credential: String,
}

/// Resume a stored email/household pair; `credential` must belong to `email`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub credential: String,
    pub email: String,
    pub household_key: String,
}

/// Issued session
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    #[serde(flatten)]
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

// ============================================
// MEAL DTOs
// ============================================

/// Create or update a meal
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRequest {
    pub title: String,
    #[serde(default)]
    pub frequency_days: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub last_drawn: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MealRequest {
    pub fn into_meal(self) -> Meal {
        Meal {
            id: String::new(),
            title: self.title.trim().to_string(),
            frequency_days: self.frequency_days,
            ingredients: self.ingredients,
            last_drawn: self.last_drawn,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealListResponse {
    pub meals: Vec<Meal>,
    pub total: usize,
}

// ============================================
// DRAW DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct DrawRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct DrawResponse {
    pub drawn: Vec<ScheduledMeal>,
    /// Dates that already had a meal
    pub skipped: Vec<NaiveDate>,
    /// Dates nothing was eligible for
    pub unfilled: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RedrawRequest {
    pub date: NaiveDate,
}

/// Which slice of the drawn meals to return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawnMealView {
    #[default]
    Future,
    History,
}

#[derive(Debug, Deserialize)]
pub struct DrawnMealsParams {
    #[serde(default)]
    pub view: DrawnMealView,
}

#[derive(Debug, Serialize)]
pub struct DrawnMealsResponse {
    pub view: DrawnMealView,
    pub meals: Vec<ScheduledMeal>,
}

#[derive(Debug, Serialize)]
pub struct RedrawResponse {
    #[serde(flatten)]
    pub drawn: DrawnMeal,
    pub title: Option<String>,
}

// ============================================
// SHOPPING LIST DTOs
// ============================================

/// Query parameters for the shopping list; the window defaults to the
/// coming week
#[derive(Debug, Deserialize)]
pub struct ShoppingListParams {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub include_purchased: bool,
}

#[derive(Debug, Serialize)]
pub struct ShoppingListResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub entries: Vec<ShoppingListEntry>,
    /// Same grocery in the same units, summed
    pub consolidated: Vec<ConsolidatedItem>,
    pub unpurchased: usize,
}

/// Add a manual shopping list entry
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub aisle: Option<u32>,
}

fn default_quantity() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub delta: f64,
}

#[derive(Debug, Serialize)]
pub struct QuantityResponse {
    /// `None` when the quantity reached zero and the entry was removed
    pub entry: Option<ShoppingListEntry>,
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct AisleRequest {
    #[serde(default)]
    pub aisle: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ClearPurchasedResponse {
    pub removed: usize,
}

// ============================================
// GROCERY DTOs
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryRequest {
    pub name: String,
    #[serde(default)]
    pub default_units: Option<String>,
    #[serde(default)]
    pub default_aisle: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_suggest_limit")]
    pub limit: usize,
}

fn default_suggest_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct GroceryListResponse {
    pub items: Vec<GroceryCatalogItem>,
    pub total: usize,
}

// ============================================
// MEAL HAT DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct CreateHatRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchHatRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct HatListResponse {
    /// Household the session has open
    pub active: Option<HouseholdKey>,
    pub hats: Vec<MealHat>,
}

#[derive(Debug, Serialize)]
pub struct SwitchHatResponse {
    pub household: HouseholdKey,
    /// False when the household was already open
    pub switched: bool,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded, unhealthy
    pub status: String,
    /// Store status
    pub storage: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Live sessions
    pub sessions: usize,
    /// Open WebSocket connections
    pub ws_connections: usize,
    /// Server version
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_request_defaults() {
        let req: MealRequest = serde_json::from_str(
            r#"{"title": " Tacos ", "ingredients": [{"name": "beef", "quantity": 2}], "notes": " "}"#,
        )
        .unwrap();
        let meal = req.into_meal();

        assert_eq!(meal.title, "Tacos");
        assert_eq!(meal.frequency_days, 0);
        assert_eq!(meal.ingredients[0].quantity, Some(2.0));
        assert!(meal.notes.is_none());
    }

    #[test]
    fn test_drawn_meal_view_parsing() {
        let params: DrawnMealsParams = serde_json::from_str(r#"{"view": "history"}"#).unwrap();
        assert_eq!(params.view, DrawnMealView::History);
        let params: DrawnMealsParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.view, DrawnMealView::Future);
    }

    #[test]
    fn test_login_response_shape() {
        let response = LoginResponse {
            token: "t".to_string(),
            state: SessionState::Authenticated {
                email: "a@b.com".to_string(),
                household: HouseholdKey::parse("a-b-com").unwrap(),
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["token"], "t");
        assert_eq!(value["state"], "authenticated");
        assert_eq!(value["household"], "a-b-com");
    }
}
