//! Grocery catalog
//!
//! Canonical grocery items, looked up by normalized name. Ingredients and
//! manual shopping entries both resolve to catalog items so the shopping
//! list can carry default units and aisles.

use crate::planner::types::GroceryCatalogItem;

/// Normalize a grocery name for lookup: trimmed, lowercase, single spaces
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of resolving a name against the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// The catalog already knows this grocery
    Existing(&'a GroceryCatalogItem),
    /// A new item to add (id is assigned when stored)
    New(GroceryCatalogItem),
}

/// In-memory view of a household's grocery catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroceryCatalog {
    items: Vec<GroceryCatalogItem>,
}

impl GroceryCatalog {
    pub fn new(mut items: Vec<GroceryCatalogItem>) -> Self {
        items.sort_by(|a, b| normalize_name(&a.name).cmp(&normalize_name(&b.name)));
        Self { items }
    }

    pub fn items(&self) -> &[GroceryCatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GroceryCatalogItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&GroceryCatalogItem> {
        let wanted = normalize_name(name);
        self.items.iter().find(|i| normalize_name(&i.name) == wanted)
    }

    /// Resolve `name` to a catalog item, describing a new one when unknown
    pub fn resolve(&self, name: &str, units: Option<&str>, aisle: Option<u32>) -> Resolution<'_> {
        match self.find_by_name(name) {
            Some(item) => Resolution::Existing(item),
            None => Resolution::New(GroceryCatalogItem {
                id: String::new(),
                name: name.trim().to_string(),
                default_units: units.map(str::to_string).filter(|u| !u.trim().is_empty()),
                default_aisle: aisle,
            }),
        }
    }

    /// Autocomplete: names starting with `query` first, then names containing it
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<&GroceryCatalogItem> {
        let query = normalize_name(query);
        if query.is_empty() {
            return Vec::new();
        }

        let (mut prefix, mut contains): (Vec<_>, Vec<_>) = self
            .items
            .iter()
            .filter(|i| normalize_name(&i.name).contains(&query))
            .partition(|i| normalize_name(&i.name).starts_with(&query));

        prefix.append(&mut contains);
        prefix.truncate(limit);
        prefix
    }

    /// Id used for an ingredient with no catalog entry
    pub fn fallback_id(name: &str) -> String {
        format!("name:{}", normalize_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str, aisle: Option<u32>) -> GroceryCatalogItem {
        GroceryCatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            default_units: None,
            default_aisle: aisle,
        }
    }

    fn catalog() -> GroceryCatalog {
        GroceryCatalog::new(vec![
            item("1", "Milk", Some(3)),
            item("2", "Almond milk", Some(3)),
            item("3", "Millet", None),
            item("4", "Eggs", Some(2)),
        ])
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Green   Onions "), "green onions");
    }

    #[test]
    fn test_find_by_name_is_case_insensitive() {
        assert_eq!(catalog().find_by_name(" milk").unwrap().id, "1");
        assert!(catalog().find_by_name("bread").is_none());
    }

    #[test]
    fn test_resolve() {
        let catalog = catalog();
        assert!(matches!(catalog.resolve("EGGS", None, None), Resolution::Existing(i) if i.id == "4"));

        match catalog.resolve(" Bread ", Some("loaf"), Some(7)) {
            Resolution::New(item) => {
                assert_eq!(item.name, "Bread");
                assert_eq!(item.default_units.as_deref(), Some("loaf"));
                assert_eq!(item.default_aisle, Some(7));
            }
            other => panic!("expected new item, got {:?}", other),
        }
    }

    #[test]
    fn test_suggest_orders_prefix_matches_first() {
        let catalog = catalog();
        let names: Vec<&str> = catalog
            .suggest("mil", 10)
            .into_iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["Milk", "Millet", "Almond milk"]);

        assert_eq!(catalog.suggest("mil", 1).len(), 1);
        assert!(catalog.suggest("  ", 10).is_empty());
    }
}
