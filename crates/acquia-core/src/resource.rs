//! Read-only typed projections over decoded server records.
//!
//! A [`ResourceWrapper`] owns one [`RawRecord`] and never mutates it. Its
//! accessors look a field up and convert it, failing with
//! [`Error::MissingField`] when the field is absent and
//! [`Error::InvalidField`] when it has the wrong shape. Accessors are pure:
//! no accessor ever performs I/O.
//!
//! Concrete resources are declared with [`resource_type!`](crate::resource_type),
//! which wraps a `ResourceWrapper` and wires up [`Resource`], `Display`,
//! serde and conversions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A decoded JSON object.
pub type RawRecord = Map<String, Value>;

/// Owner of exactly one [`RawRecord`], with typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceWrapper {
    record: RawRecord,
}

impl ResourceWrapper {
    /// Wrap a record.
    #[must_use]
    pub const fn new(record: RawRecord) -> Self {
        Self { record }
    }

    /// Wrap a decoded value, which must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] for any non-object value.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(record) => Ok(Self::new(record)),
            other => Err(Error::DecodeError(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// The underlying record.
    #[must_use]
    pub const fn record(&self) -> &RawRecord {
        &self.record
    }

    /// Consume the wrapper, returning the record.
    #[must_use]
    pub fn into_record(self) -> RawRecord {
        self.record
    }

    /// Returns true if the record carries `field` (even if it is `null`).
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.record.contains_key(field)
    }

    /// Raw field lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the field is absent.
    pub fn get(&self, field: &str) -> Result<&Value> {
        self.record
            .get(field)
            .ok_or_else(|| Error::missing_field(field))
    }

    /// String field.
    ///
    /// # Errors
    ///
    /// Missing field, or a value that is not a string.
    pub fn string(&self, field: &str) -> Result<&str> {
        self.get(field)?
            .as_str()
            .ok_or_else(|| Error::invalid_field(field, "a string"))
    }

    /// String field that may be absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] if the value is present but not a string.
    pub fn opt_string(&self, field: &str) -> Result<Option<&str>> {
        match self.record.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(_) => Err(Error::invalid_field(field, "a string")),
        }
    }

    /// Identifier-like field: strings are returned as-is, numbers are
    /// rendered in decimal.
    ///
    /// # Errors
    ///
    /// Missing field, or a value that is neither a string nor a number.
    pub fn scalar(&self, field: &str) -> Result<String> {
        match self.get(field)? {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            _ => Err(Error::invalid_field(field, "a string or number")),
        }
    }

    /// Boolean field. Accepts JSON booleans, numbers (non-zero is true) and
    /// the strings `"0"`, `"1"`, `"true"`, `"false"` and `""`.
    ///
    /// # Errors
    ///
    /// Missing field, or a value that cannot be read as a boolean.
    pub fn bool(&self, field: &str) -> Result<bool> {
        match self.get(field)? {
            Value::Bool(flag) => Ok(*flag),
            Value::Number(number) => Ok(number.as_f64().is_some_and(|n| n != 0.0)),
            Value::String(text) => match text.as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" | "" => Ok(false),
                _ => Err(Error::invalid_field(field, "a boolean")),
            },
            _ => Err(Error::invalid_field(field, "a boolean")),
        }
    }

    /// Unsigned integer field; numeric strings are accepted.
    ///
    /// # Errors
    ///
    /// Missing field, or a value that is not a non-negative integer.
    pub fn u64(&self, field: &str) -> Result<u64> {
        let value = self.get(field)?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
            .ok_or_else(|| Error::invalid_field(field, "a non-negative integer"))
    }

    /// Array field.
    ///
    /// # Errors
    ///
    /// Missing field, or a value that is not an array.
    pub fn array(&self, field: &str) -> Result<&Vec<Value>> {
        self.get(field)?
            .as_array()
            .ok_or_else(|| Error::invalid_field(field, "an array"))
    }

    /// Object field.
    ///
    /// # Errors
    ///
    /// Missing field, or a value that is not an object.
    pub fn object(&self, field: &str) -> Result<&RawRecord> {
        self.get(field)?
            .as_object()
            .ok_or_else(|| Error::invalid_field(field, "an object"))
    }

    /// Unix timestamp field (seconds, as a number or numeric string).
    ///
    /// # Errors
    ///
    /// Missing field, or a value that is not a valid timestamp.
    pub fn timestamp(&self, field: &str) -> Result<DateTime<Utc>> {
        self.opt_timestamp(field)?
            .ok_or_else(|| Error::missing_field(field))
    }

    /// Unix timestamp field that may be absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] if the value is present but not a
    /// valid timestamp.
    pub fn opt_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>> {
        let seconds = match self.record.get(field) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(number)) => number.as_i64(),
            Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
            Some(_) => None,
        };
        seconds
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(Some)
            .ok_or_else(|| Error::invalid_field(field, "a unix timestamp"))
    }

    /// Fields not listed in `known`, in the record's iteration order.
    #[must_use]
    pub fn extra_fields<'a>(&'a self, known: &[&str]) -> Vec<(&'a str, &'a Value)> {
        self.record
            .iter()
            .filter(|(name, _)| !known.contains(&name.as_str()))
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }

    /// Display form of `field`: strings verbatim, numbers in decimal,
    /// anything else (including absence) as an empty string.
    #[must_use]
    pub fn display_value(&self, field: &str) -> String {
        match self.record.get(field) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => String::new(),
        }
    }
}

impl From<RawRecord> for ResourceWrapper {
    fn from(record: RawRecord) -> Self {
        Self::new(record)
    }
}

/// Common behaviour of concrete resource types.
pub trait Resource: Sized {
    /// Human-readable resource kind, used in error messages.
    const KIND: &'static str;

    /// Fields the type models explicitly.
    const FIELDS: &'static [&'static str];

    /// Field used for `Display`.
    const DISPLAY_FIELD: &'static str;

    /// Build from a wrapper. Never fails.
    fn from_wrapper(wrapper: ResourceWrapper) -> Self;

    /// The wrapped record.
    fn wrapper(&self) -> &ResourceWrapper;

    /// Build from one decoded value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] if `value` is not a JSON object.
    fn from_value(value: Value) -> Result<Self> {
        ResourceWrapper::from_value(value).map(Self::from_wrapper)
    }

    /// Build a list from a decoded JSON array of objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] if `value` is not an array of objects.
    fn from_values(value: Value) -> Result<Vec<Self>> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            other => Err(Error::DecodeError(format!(
                "expected a JSON array of {} records, got {}",
                Self::KIND,
                kind_of(&other)
            ))),
        }
    }

    /// Server fields not yet modeled by this type.
    fn extra_fields(&self) -> Vec<(&str, &Value)> {
        self.wrapper().extra_fields(Self::FIELDS)
    }
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

/// Declare a resource type wrapping a [`ResourceWrapper`].
///
/// ```
/// acquia_core::resource_type!(
///     /// A widget record.
///     Widget, "widget", display = "name", fields = ["name", "size"]
/// );
///
/// let widget: Widget = serde_json::from_str(r#"{"name":"w1","size":3}"#).unwrap();
/// assert_eq!(widget.to_string(), "w1");
/// ```
#[macro_export]
macro_rules! resource_type {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, display = $display:literal, fields = [$($field:literal),* $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name {
            inner: $crate::resource::ResourceWrapper,
        }

        impl $name {
            /// Wrap a decoded record.
            #[must_use]
            pub const fn new(record: $crate::resource::RawRecord) -> Self {
                Self {
                    inner: $crate::resource::ResourceWrapper::new(record),
                }
            }

            /// The underlying record.
            #[must_use]
            pub const fn record(&self) -> &$crate::resource::RawRecord {
                self.inner.record()
            }
        }

        impl $crate::resource::Resource for $name {
            const KIND: &'static str = $kind;
            const FIELDS: &'static [&'static str] = &[$($field),*];
            const DISPLAY_FIELD: &'static str = $display;

            fn from_wrapper(wrapper: $crate::resource::ResourceWrapper) -> Self {
                Self { inner: wrapper }
            }

            fn wrapper(&self) -> &$crate::resource::ResourceWrapper {
                &self.inner
            }
        }

        impl From<$crate::resource::RawRecord> for $name {
            fn from(record: $crate::resource::RawRecord) -> Self {
                Self::new(record)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&self.inner.display_value($display))
            }
        }
    };
}
