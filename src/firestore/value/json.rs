//! Conversion between plain JSON records and Firestore values.
//!
//! Integers that fit in `i64` stay integers, other numbers become doubles.
//! Timestamps and references have no JSON counterpart and are rendered as
//! RFC 3339 strings and slash-separated paths respectively.

use serde_json::{Map, Number, Value};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::{DocumentData, FirestoreValue, ValueKind};

impl FirestoreValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FirestoreValue::null(),
            Value::Bool(flag) => FirestoreValue::from_bool(flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => FirestoreValue::from_integer(integer),
                None => FirestoreValue::from_double(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => FirestoreValue::from_string(text),
            Value::Array(items) => {
                FirestoreValue::from_array(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(fields) => FirestoreValue::from_map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self.kind() {
            ValueKind::Null => Value::Null,
            ValueKind::Boolean(flag) => Value::Bool(*flag),
            ValueKind::Integer(integer) => Value::Number((*integer).into()),
            ValueKind::Double(double) => Number::from_f64(*double)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ValueKind::Timestamp(timestamp) => Value::String(timestamp.to_rfc3339()),
            ValueKind::String(text) => Value::String(text.clone()),
            ValueKind::Reference(path) => Value::String(path.clone()),
            ValueKind::Array(array) => {
                Value::Array(array.values().iter().map(FirestoreValue::to_json).collect())
            }
            ValueKind::Map(map) => Value::Object(data_to_json_map(map.fields())),
        }
    }
}

/// Converts a JSON object into document fields; any other JSON kind is rejected.
pub fn data_from_json(value: Value) -> FirestoreResult<DocumentData> {
    match value {
        Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(key, value)| (key, FirestoreValue::from_json(value)))
            .collect()),
        other => Err(invalid_argument(format!(
            "Document data must be a JSON object, got {other}"
        ))),
    }
}

pub fn data_to_json(data: &DocumentData) -> Value {
    Value::Object(data_to_json_map(data))
}

fn data_to_json_map(data: &DocumentData) -> Map<String, Value> {
    data.iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}
