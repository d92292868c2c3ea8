#![allow(missing_docs)]

use std::collections::BTreeMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{Error, Identifier, Result};

/// Record fields. Ordered, so that evaluation output is byte-identical between runs.
pub type Record = BTreeMap<Identifier, Value>;

/// Runtime value computed by the engine.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `i64`, `bool`, arrays and
/// records.
///
/// JSON representation is untagged: `null` maps to [`Value::None`], objects map to
/// [`Value::Record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum Value {
    /// Absent or unset value. This is a normal value, not an error.
    None,
    Boolean(bool),
    Integer(i64),
    String(String),
    Array(Vec<Value>),
    Record(Record),
    /// Resolved endpoint. Only produced by endpoint rules.
    #[serde(skip_deserializing)]
    Endpoint(Endpoint),
}

/// Tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    None,
    Boolean,
    Integer,
    String,
    Array,
    Record,
    Endpoint,
}

impl ValueType {
    /// All value types. Used by functions that accept anything.
    pub const ANY: &'static [ValueType] = &[
        ValueType::None,
        ValueType::Boolean,
        ValueType::Integer,
        ValueType::String,
        ValueType::Array,
        ValueType::Record,
        ValueType::Endpoint,
    ];

    /// Human-readable list of types, e.g., "String or Boolean".
    pub(crate) fn describe(types: &[ValueType]) -> String {
        let names = types.iter().map(ValueType::to_string).collect::<Vec<_>>();
        names.join(" or ")
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueType::None => "None",
            ValueType::Boolean => "Boolean",
            ValueType::Integer => "Integer",
            ValueType::String => "String",
            ValueType::Array => "Array",
            ValueType::Record => "Record",
            ValueType::Endpoint => "Endpoint",
        })
    }
}

impl Value {
    /// Tag of the value.
    pub fn ty(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Record(_) => ValueType::Record,
            Value::Endpoint(_) => ValueType::Endpoint,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Return `false` for `None` and `Boolean(false)`, `true` for every other value.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Boolean(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_endpoint(&self) -> Option<&Endpoint> {
        match self {
            Value::Endpoint(e) => Some(e),
            _ => None,
        }
    }

    /// Return string payload or fail with [`Error::TypeMismatch`].
    pub fn expect_string(&self) -> Result<&str> {
        self.as_str()
            .ok_or_else(|| Error::type_mismatch(&[ValueType::String], self.ty()))
    }

    /// Return boolean payload or fail with [`Error::TypeMismatch`].
    pub fn expect_bool(&self) -> Result<bool> {
        self.as_bool()
            .ok_or_else(|| Error::type_mismatch(&[ValueType::Boolean], self.ty()))
    }

    /// Return integer payload or fail with [`Error::TypeMismatch`].
    pub fn expect_integer(&self) -> Result<i64> {
        self.as_integer()
            .ok_or_else(|| Error::type_mismatch(&[ValueType::Integer], self.ty()))
    }

    /// Return array payload or fail with [`Error::TypeMismatch`].
    pub fn expect_array(&self) -> Result<&[Value]> {
        self.as_array()
            .ok_or_else(|| Error::type_mismatch(&[ValueType::Array], self.ty()))
    }

    /// Return record payload or fail with [`Error::TypeMismatch`].
    pub fn expect_record(&self) -> Result<&Record> {
        self.as_record()
            .ok_or_else(|| Error::type_mismatch(&[ValueType::Record], self.ty()))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

/// Endpoint resolved by a rule set.
///
/// `properties` carry extra information for downstream consumers, e.g., signing region overrides
/// under `authSchemes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Fully-qualified URL.
    pub url: String,
    /// Header overrides. Each header may have multiple values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    /// Named properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<Identifier, Value>,
}

impl Endpoint {
    /// Create an endpoint with no headers and properties.
    pub fn new(url: impl Into<String>) -> Endpoint {
        Endpoint {
            url: url.into(),
            headers: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get values of the header `name`, if any.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers.get(name).map(Vec::as_slice)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}
