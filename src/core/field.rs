//! Field value types carried by compiled criteria

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

/// A polymorphic criteria value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    /// Structured value matched as a whole (nested object or array)
    Json(Value),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null and empty-string values never constrain a query
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::Json(Value::Null) => true,
            _ => false,
        }
    }

    /// Whether this value is a date (compiled to an open-ended lower bound)
    pub fn is_date(&self) -> bool {
        matches!(self, FieldValue::DateTime(_))
    }

    /// The JSON representation stored for this value
    ///
    /// Dates are rendered as RFC 3339 with a `Z` suffix so that they compare
    /// equal to timestamps rendered by the storage layer.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::DateTime(dt) => Value::String(format_timestamp(dt)),
            FieldValue::Json(v) => v.clone(),
            FieldValue::Null => Value::Null,
        }
    }

    /// Compare this value with a stored JSON value
    ///
    /// Returns `None` when the two are not comparable (different kinds).
    /// Stored date strings are parsed before comparing with a `DateTime`.
    pub fn compare_json(&self, stored: &Value) -> Option<Ordering> {
        match (self, stored) {
            (FieldValue::Integer(a), Value::Number(n)) => match n.as_i64() {
                Some(b) => Some(a.cmp(&b)),
                None => (*a as f64).partial_cmp(&n.as_f64()?),
            },
            (FieldValue::Float(a), Value::Number(n)) => a.partial_cmp(&n.as_f64()?),
            (FieldValue::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (FieldValue::Boolean(a), Value::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), Value::String(b)) => {
                Uuid::parse_str(b).ok().map(|b| a.cmp(&b))
            }
            (FieldValue::DateTime(a), Value::String(b)) => DateTime::parse_from_rfc3339(b)
                .ok()
                .map(|b| a.cmp(&b.with_timezone(&Utc))),
            (FieldValue::Json(a), b) => (a == b).then_some(Ordering::Equal),
            (FieldValue::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

/// Canonical text form of a timestamp
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::String(s) => FieldValue::String(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            other => FieldValue::Json(other),
        }
    }
}
