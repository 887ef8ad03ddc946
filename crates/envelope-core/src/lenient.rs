//! Tolerant deserializers for externally supplied JSON.
//!
//! Extension metadata and form values come from services and browsers we do
//! not control. A key that should hold text may be missing, `null`, a bool or
//! a number; all of those collapse to a string instead of failing the whole
//! payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Deserialize any scalar (or `null`) into a `String`.
///
/// Strings pass through, numbers and booleans use their JSON text, `null`
/// becomes the empty string. Arrays and objects are rendered as compact JSON
/// so nothing is silently dropped.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

pub(crate) fn scalar_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
