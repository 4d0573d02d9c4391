use crate::errors::{Error, Result};
use crate::model::{NewReading, ReadingPayload};
use serde::de::Error as _;
use serde_json::Value;

/// Decodes a broker payload into a reading.
///
/// Only structure is checked: the payload must be a JSON object with a string
/// `timestamp` and numeric `temp` and `humidity`. Values are not range checked
/// and the timestamp is not parsed. A repeated key keeps its last value.
pub fn decode(payload: &[u8]) -> Result<NewReading> {
    decode_object(payload)
        .map(NewReading::from)
        .map_err(|source| Error::Decode {
            source,
            payload: String::from_utf8_lossy(payload).into_owned(),
        })
}

fn decode_object(payload: &[u8]) -> serde_json::Result<ReadingPayload> {
    // Field names are required, so a positional array must not reach the derived deserializer
    match serde_json::from_slice::<Value>(payload)? {
        object @ Value::Object(_) => serde_json::from_value(object),
        other => Err(serde_json::Error::custom(format!(
            "expected a JSON object, found {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
