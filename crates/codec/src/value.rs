//! Runtime value tree
//!
//! The tagged value representation the codecs read and write. Generated
//! code builds these from typed inputs and pattern-matches them back out;
//! the schema gives each node its wire interpretation.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// A tagged runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Enum(String),
    IntEnum(i32),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Struct(IndexMap<String, Value>),
    Union(String, Box<Value>),
}

impl Value {
    pub fn structure<I, K>(fields: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn map<I, K>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::List(items.into_iter().collect())
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn union(variant: impl Into<String>, inner: Value) -> Value {
        Value::Union(variant.into(), Box::new(inner))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Struct field lookup; absent and explicit-null both read as `None`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.get(name).filter(|v| !v.is_null()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::IntEnum(i) => Some(i64::from(*i)),
            _ => None,
        }
    }
}
