//! Property extraction helpers
//!
//! Each helper reports failures nested under the property it was asked for,
//! so callers can combine several of them with [`zip`](super::zip) and get a
//! precise location for every issue.

use super::{JsonError, JsonKind, JsonResult, JsonResultExt};
use serde_json::{Map, Value};

/// JSON object alias
pub type JsonObject = Map<String, Value>;

fn type_mismatch(expected: JsonKind, value: &Value) -> JsonError {
    JsonError::new(format!(
        "Expected {} but found {}.",
        expected,
        JsonKind::of(value)
    ))
}

pub fn as_object(value: &Value) -> JsonResult<&JsonObject> {
    value
        .as_object()
        .ok_or_else(|| type_mismatch(JsonKind::Object, value))
}

pub fn as_array(value: &Value) -> JsonResult<&[Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| type_mismatch(JsonKind::Array, value))
}

pub fn as_str(value: &Value) -> JsonResult<&str> {
    value
        .as_str()
        .ok_or_else(|| type_mismatch(JsonKind::String, value))
}

/// String that is neither empty nor whitespace
pub fn as_non_empty_str(value: &Value) -> JsonResult<&str> {
    let s = as_str(value)?;
    if s.trim().is_empty() {
        Err(JsonError::new("Value cannot be empty or whitespace."))
    } else {
        Ok(s)
    }
}

/// Look up a property, treating `null` as missing
pub fn optional_property<'a>(object: &'a JsonObject, name: &str) -> Option<&'a Value> {
    object.get(name).filter(|v| !v.is_null())
}

/// Look up a required property
pub fn property<'a>(object: &'a JsonObject, name: &str) -> JsonResult<&'a Value> {
    optional_property(object, name)
        .ok_or_else(|| JsonError::new(format!("Property '{}' is required.", name)))
        .at_property(name)
}

pub fn string_property<'a>(object: &'a JsonObject, name: &str) -> JsonResult<&'a str> {
    property(object, name).and_then(|v| as_str(v).at_property(name))
}

pub fn non_empty_string_property<'a>(object: &'a JsonObject, name: &str) -> JsonResult<&'a str> {
    property(object, name).and_then(|v| as_non_empty_str(v).at_property(name))
}

pub fn object_property<'a>(object: &'a JsonObject, name: &str) -> JsonResult<&'a JsonObject> {
    property(object, name).and_then(|v| as_object(v).at_property(name))
}

pub fn array_property<'a>(object: &'a JsonObject, name: &str) -> JsonResult<&'a [Value]> {
    property(object, name).and_then(|v| as_array(v).at_property(name))
}

/// Enumerations read from JSON strings
///
/// Matching is case-insensitive against the closed set in [`VARIANTS`](JsonEnum::VARIANTS).
pub trait JsonEnum: Sized + Copy + 'static {
    /// Every accepted value
    const VARIANTS: &'static [Self];

    /// Human-readable name of the field, used in error messages
    const LABEL: &'static str;

    /// Canonical spelling
    fn as_str(&self) -> &'static str;

    fn from_json(value: &Value) -> JsonResult<Self> {
        let raw = as_str(value)?;
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| {
                let expected: Vec<&str> = Self::VARIANTS.iter().map(|v| v.as_str()).collect();
                JsonError::new(format!(
                    "'{}' is not a valid {}. Expected one of: {}.",
                    raw,
                    Self::LABEL,
                    expected.join(", ")
                ))
            })
    }
}

pub fn enum_property<T: JsonEnum>(object: &JsonObject, name: &str) -> JsonResult<T> {
    property(object, name).and_then(|v| T::from_json(v).at_property(name))
}
