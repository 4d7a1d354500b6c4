//! Write preparation and result formatting
//!
//! Records travel between the repository and the storage engine as JSON
//! objects. On the way in, identity and timestamps are owned by the
//! repository; on the way out, the backend's native key is renamed to the
//! normalized `id` string field.

use crate::core::error::{RepositoryError, Result};
use crate::core::field::format_timestamp;
use crate::core::filter::ID_FIELD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Field stamped once at creation
pub const CREATED_AT: &str = "createdAt";

/// Field stamped on every write
pub const UPDATED_AT: &str = "updatedAt";

/// A record as exchanged with a backend
pub type Record = Map<String, Value>;

/// Serialize a DTO into a record
pub fn to_record<T: Serialize>(dto: &T) -> Result<Record> {
    match serde_json::to_value(dto)? {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::serialization(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Deserialize a record into a DTO
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Payload for an insert
///
/// Caller-supplied `id` and nulls are dropped; `createdAt` and `updatedAt`
/// are both set to `now`.
pub fn prepare_insert<T: Serialize>(dto: &T, now: DateTime<Utc>) -> Result<Record> {
    let mut record = to_record(dto)?;
    strip_nulls(&mut record);
    record.remove(ID_FIELD);

    let stamp = Value::String(format_timestamp(&now));
    record.insert(CREATED_AT.to_string(), stamp.clone());
    record.insert(UPDATED_AT.to_string(), stamp);
    Ok(record)
}

/// Payload for an update
///
/// `id` and `createdAt` are immutable once created; `updatedAt` is always
/// overwritten. Null fields are left untouched in storage.
pub fn prepare_update<T: Serialize>(dto: &T, now: DateTime<Utc>) -> Result<Record> {
    let mut record = to_record(dto)?;
    strip_nulls(&mut record);
    record.remove(ID_FIELD);
    record.remove(CREATED_AT);

    record.insert(
        UPDATED_AT.to_string(),
        Value::String(format_timestamp(&now)),
    );
    Ok(record)
}

/// Rename the native key to `id`, rendered as a string
pub fn normalize_identity(mut record: Record, native_key: &str) -> Record {
    if native_key != ID_FIELD
        && let Some(key) = record.remove(native_key)
    {
        record.insert(ID_FIELD.to_string(), key);
    }

    if let Some(id) = record.get_mut(ID_FIELD)
        && !matches!(id, Value::String(_) | Value::Null)
    {
        *id = Value::String(id.to_string());
    }
    record
}

fn strip_nulls(record: &mut Record) {
    record.retain(|_, value| !value.is_null());
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
