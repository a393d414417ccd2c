//! Core types shared by the backend stores
//!
//! - `Collection`: the named record collections the portal uses
//! - `Query`: collection plus optional ordering
//! - `Record` / `QuerySnapshot`: what a subscription delivers

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

use super::error::{StoreError, StoreResult};

/// Named record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Investors,
    Messages,
    Documents,
    Admins,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Investors => "investors",
            Collection::Messages => "messages",
            Collection::Documents => "documents",
            Collection::Admins => "admins",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering clause of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A standing query over one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: Collection,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            order_by: None,
        }
    }

    /// Builder method: order results by a field
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Sort records in place according to this query's ordering.
    ///
    /// Records without the field sort first, then numbers, then strings.
    /// Ties fall back to the record id so the order is total.
    pub fn sort(&self, records: &mut [Record]) {
        match &self.order_by {
            Some(order) => {
                records.sort_by(|a, b| {
                    let ord = compare_values(a.data.get(&order.field), b.data.get(&order.field))
                        .then_with(|| a.id.cmp(&b.id));
                    match order.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                });
            }
            None => records.sort_by(|a, b| a.id.cmp(&b.id)),
        }
    }
}

fn value_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => value_rank(a).cmp(&value_rank(b)),
    }
}

/// A stored record: id plus JSON fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decode into a typed entity. The record id is injected as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|e| {
            StoreError::internal(format!("record {} is malformed: {}", self.id, e))
        })
    }
}

/// Full ordered result set of a query at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    pub records: Vec<Record>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}

/// Turn a serializable entity into record fields, dropping its `id` field
pub fn to_fields<T: Serialize>(entity: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(entity)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::internal(format!(
            "expected an object, got {}",
            other
        ))),
    }
}
