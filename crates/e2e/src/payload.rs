//! Normalization of loosely shaped API payloads
//!
//! List endpoints answer with a bare array, a `{ "data": [...] }` page or a
//! `{ "products": [...] }` wrapper depending on the route. `normalize` folds
//! all of them into one tagged value so steps branch on the tag.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{E2eError, E2eResult};

const LIST_KEYS: [&str; 2] = ["data", "products"];
const SINGLE_KEYS: [&str; 2] = ["data", "product"];

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    List(Vec<Value>),
    Single(Value),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    List,
    Single,
    Empty,
}

pub fn normalize(value: Value) -> Payload {
    match value {
        Value::Null => Payload::Empty,
        Value::Array(items) => list(items),
        Value::Object(mut map) => {
            for key in LIST_KEYS {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return list(items);
                    }
                }
            }
            for key in SINGLE_KEYS {
                if matches!(map.get(key), Some(Value::Object(_))) {
                    if let Some(inner) = map.remove(key) {
                        return Payload::Single(inner);
                    }
                }
            }
            if map.is_empty() {
                Payload::Empty
            } else {
                Payload::Single(Value::Object(map))
            }
        }
        other => Payload::Single(other),
    }
}

fn list(items: Vec<Value>) -> Payload {
    if items.is_empty() {
        Payload::Empty
    } else {
        Payload::List(items)
    }
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::List(_) => PayloadKind::List,
            Payload::Single(_) => PayloadKind::Single,
            Payload::Empty => PayloadKind::Empty,
        }
    }

    /// Items of a list; a single value counts as one item
    pub fn items(&self) -> Vec<&Value> {
        match self {
            Payload::List(items) => items.iter().collect(),
            Payload::Single(value) => vec![value],
            Payload::Empty => Vec::new(),
        }
    }

    pub fn into_list<T: DeserializeOwned>(self) -> E2eResult<Vec<T>> {
        match self {
            Payload::List(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(E2eError::from))
                .collect(),
            Payload::Single(value) => Ok(vec![serde_json::from_value(value)?]),
            Payload::Empty => Ok(Vec::new()),
        }
    }

    pub fn into_single<T: DeserializeOwned>(self) -> E2eResult<T> {
        match self {
            Payload::Single(value) => Ok(serde_json::from_value(value)?),
            Payload::List(_) => Err(E2eError::AssertionFailed(
                "expected a single entity, got a list".to_string(),
            )),
            Payload::Empty => Err(E2eError::AssertionFailed(
                "expected a single entity, got an empty payload".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_array_is_list() {
        let payload = normalize(json!([{ "id": "1" }, { "id": "2" }]));
        assert_eq!(payload.kind(), PayloadKind::List);
        assert_eq!(payload.items().len(), 2);
    }

    #[test]
    fn test_paginated_wrapper_is_list() {
        let payload = normalize(json!({ "current_page": 1, "data": [{ "id": "1" }], "total": 1 }));
        assert_eq!(payload, Payload::List(vec![json!({ "id": "1" })]));
    }

    #[test]
    fn test_named_wrappers() {
        let payload = normalize(json!({ "products": [{ "id": "7" }] }));
        assert_eq!(payload.kind(), PayloadKind::List);

        let payload = normalize(json!({ "product": { "id": "7", "name": "Claw Hammer" } }));
        assert_eq!(payload, Payload::Single(json!({ "id": "7", "name": "Claw Hammer" })));

        let payload = normalize(json!({ "data": { "id": "8" } }));
        assert_eq!(payload, Payload::Single(json!({ "id": "8" })));
    }

    #[test]
    fn test_plain_object_is_single() {
        let payload = normalize(json!({ "id": "9", "name": "Pliers" }));
        assert_eq!(payload.kind(), PayloadKind::Single);
        assert_eq!(payload.items().len(), 1);
    }

    #[test]
    fn test_empty_shapes() {
        assert_eq!(normalize(Value::Null), Payload::Empty);
        assert_eq!(normalize(json!([])), Payload::Empty);
        assert_eq!(normalize(json!({ "data": [] })), Payload::Empty);
        assert_eq!(normalize(json!({})), Payload::Empty);
    }

    #[test]
    fn test_typed_extraction() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: String,
        }

        let items: Vec<Item> = normalize(json!({ "data": [{ "id": "a" }, { "id": "b" }] }))
            .into_list()
            .unwrap();
        assert_eq!(items.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        let item: Item = normalize(json!({ "id": "c" })).into_single().unwrap();
        assert_eq!(item.id, "c");

        assert!(normalize(json!([{ "id": "d" }])).into_single::<Item>().is_err());
    }
}
