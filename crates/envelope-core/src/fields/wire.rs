//! Serializers for the signing platform's stringly-typed tab attributes.
//!
//! The platform expects offsets, ids and flags as JSON strings
//! (`"anchorXOffset": "-5"`, `"required": "true"`).

use serde::Serializer;
use std::fmt::Display;

pub fn display<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display,
{
    serializer.collect_str(value)
}

pub fn opt_display<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display,
{
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

pub fn flag<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(if *value { "true" } else { "false" })
}

pub fn is_false(value: &bool) -> bool {
    !*value
}
