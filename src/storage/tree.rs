//! In-memory JSON tree
//!
//! Holds the whole database as one `serde_json::Value`. Writes replace a
//! subtree wholesale; writing `null` removes it and prunes parents left empty.
//!
//! Every payload passes through [`sanitize`] before it reaches the tree:
//! `null` leaves (which is what NaN, infinities and missing optionals
//! serialize to) are stripped recursively.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::path::DbPath;
use serde::Serialize;
use serde_json::{Map, Value};

/// The database tree
#[derive(Debug, Clone)]
pub struct Tree {
    root: Value,
}

impl Default for Tree {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a previously snapshotted root
    pub fn from_value(root: Value) -> Self {
        match sanitize(root) {
            Some(root @ Value::Object(_)) => Self { root },
            _ => Self::default(),
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Read the subtree at `path`
    pub fn get(&self, path: &DbPath) -> Option<&Value> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    /// Replace the subtree at `path`. A `None` payload removes it.
    pub fn set(&mut self, path: &DbPath, value: Option<Value>) -> StorageResult<()> {
        let Some((last, parents)) = path.segments().split_last() else {
            self.root = match value {
                Some(Value::Object(map)) => Value::Object(map),
                Some(_) => return Err(StorageError::InvalidPayload(path.to_string())),
                None => Value::Object(Map::new()),
            };
            return Ok(());
        };

        match value {
            Some(value) => {
                let mut node = &mut self.root;
                for segment in parents {
                    let map = ensure_object(node);
                    node = map
                        .entry(segment.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                }
                ensure_object(node).insert(last.clone(), value);
            }
            None => {
                remove_and_prune(&mut self.root, path.segments());
            }
        }
        Ok(())
    }

    /// Number of top-level keys (one per household or user partition)
    pub fn top_level_keys(&self) -> usize {
        self.root.as_object().map(Map::len).unwrap_or(0)
    }
}

/// Coerce a node to an object, replacing leaves written where a branch is
/// now needed.
fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

/// Remove the node at `segments`; returns true if `node` itself became empty.
fn remove_and_prune(node: &mut Value, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    let Some(map) = node.as_object_mut() else {
        return false;
    };

    if rest.is_empty() {
        map.remove(first);
    } else if let Some(child) = map.get_mut(first) {
        if remove_and_prune(child, rest) {
            map.remove(first);
        }
    }

    map.is_empty()
}

/// Strip `null` leaves recursively, along with containers emptied by it.
///
/// Returns `None` when nothing storable is left.
pub fn sanitize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| sanitize(v).map(|v| (k, v)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        Value::Array(items) => {
            let cleaned: Vec<Value> = items.into_iter().filter_map(sanitize).collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Array(cleaned))
            }
        }
        other => Some(other),
    }
}

/// Serialize a typed record into a sanitized payload
pub fn to_payload<T: Serialize>(record: &T) -> StorageResult<Option<Value>> {
    let value = serde_json::to_value(record)?;
    Ok(sanitize(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> DbPath {
        DbPath::parse(raw).unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let mut tree = Tree::new();
        tree.set(&path("k/meals/1"), Some(json!({"title": "Tacos"})))
            .unwrap();

        assert_eq!(tree.get(&path("k/meals/1/title")), Some(&json!("Tacos")));
        assert_eq!(
            tree.get(&path("k/meals")),
            Some(&json!({"1": {"title": "Tacos"}}))
        );
        assert!(tree.get(&path("k/drawnMeals")).is_none());
    }

    #[test]
    fn test_set_replaces_whole_subtree() {
        let mut tree = Tree::new();
        tree.set(&path("k/meals/1"), Some(json!({"title": "Tacos", "frequencyDays": 7})))
            .unwrap();
        tree.set(&path("k/meals/1"), Some(json!({"title": "Soup"})))
            .unwrap();

        assert_eq!(tree.get(&path("k/meals/1")), Some(&json!({"title": "Soup"})));
    }

    #[test]
    fn test_remove_prunes_empty_parents() {
        let mut tree = Tree::new();
        tree.set(&path("k/meals/1"), Some(json!({"title": "Tacos"})))
            .unwrap();
        tree.set(&path("k/meals/1"), None).unwrap();

        assert!(tree.get(&path("k")).is_none());
        assert_eq!(tree.top_level_keys(), 0);
    }

    #[test]
    fn test_write_below_leaf_replaces_leaf() {
        let mut tree = Tree::new();
        tree.set(&path("k/schemaVersion"), Some(json!(2))).unwrap();
        tree.set(&path("k/schemaVersion/x"), Some(json!(1))).unwrap();

        assert_eq!(tree.get(&path("k/schemaVersion")), Some(&json!({"x": 1})));
    }

    #[test]
    fn test_root_requires_object() {
        let mut tree = Tree::new();
        assert!(tree.set(&DbPath::root(), Some(json!(5))).is_err());
    }

    #[test]
    fn test_sanitize_strips_null_leaves() {
        let payload = json!({
            "title": "Tacos",
            "lastDrawn": null,
            "ingredients": [
                {"name": "beef", "quantity": null},
                null,
                {"aisle": null}
            ]
        });

        let cleaned = sanitize(payload).unwrap();
        assert_eq!(
            cleaned,
            json!({"title": "Tacos", "ingredients": [{"name": "beef"}]})
        );
    }

    #[test]
    fn test_to_payload_drops_nan() {
        #[derive(Serialize)]
        struct Item {
            name: &'static str,
            quantity: f64,
        }

        let payload = to_payload(&Item {
            name: "milk",
            quantity: f64::NAN,
        })
        .unwrap()
        .unwrap();

        assert_eq!(payload, json!({"name": "milk"}));
    }

    #[test]
    fn test_sanitize_all_null_is_none() {
        assert!(sanitize(json!({"a": null, "b": [null]})).is_none());
    }
}
