//! Lenient deserializers for portal payloads.
//!
//! The portal encodes identifiers and codes as strings in some responses
//! and as numbers in others.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts a string, number or bool as text. `null` and missing become `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_text))
}

/// Like [`lenient_string`] but the field must be present and non-null.
pub fn required_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected a string or number, found null"))
}

/// Accepts an integer encoded as a number or a numeric string.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("not an integer: {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not an integer: {:?}", s))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected an integer, found {}",
            other
        ))),
    }
}

/// Treats `null` as the default value (e.g. an empty list).
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
