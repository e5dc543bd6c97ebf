//! Native values flowing through the pipeline
//!
//! [`Value`] is the tagged recursive type used for caller arguments
//! (filters, selections, data) and for hydrated results. Values without a
//! JSON representation get their own variants so that the codec can tag
//! them explicitly on the wire.

use core::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};

use crate::result::ExtendedRecord;

/// Ordered key/value object
pub type Object = IndexMap<String, Value>;

/// Arbitrary-precision decimal that is not a [`rust_decimal::Decimal`]
///
/// Any type able to render itself as a fixed-point string (no exponent)
/// is accepted as a decimal argument.
pub trait DecimalLike: fmt::Debug + Send + Sync {
    fn to_fixed(&self) -> String;
}

/// Value that knows how to convert itself to JSON
pub trait ToJson: fmt::Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Value;
}

/// Sentinel values distinguishing database `NULL` from JSON `null`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullEnum {
    DbNull,
    JsonNull,
    AnyNull,
}

impl NullEnum {
    pub const fn name(&self) -> &'static str {
        match self {
            NullEnum::DbNull => "DbNull",
            NullEnum::JsonNull => "JsonNull",
            NullEnum::AnyNull => "AnyNull",
        }
    }
}

/// Reference to another column of a model, usable as a filter operand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub model_name: String,
    pub name: String,
    pub type_name: String,
    pub is_list: bool,
}

impl FieldRef {
    pub fn new(model_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            name: name.into(),
            type_name: String::new(),
            is_list: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; dropped from objects, rejected inside lists
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    BigInt(num_bigint::BigInt),
    DateTime(DateTime<Utc>),
    /// Temporal input that failed to parse; rejected by the serializer
    InvalidDateTime(String),
    Bytes(Bytes),
    Decimal(Decimal),
    DecimalLike(Arc<dyn DecimalLike>),
    Enum(NullEnum),
    FieldRef(FieldRef),
    /// Engine-native parameters passed through verbatim
    RawParameters(serde_json::Value),
    Convertible(Arc<dyn ToJson>),
    List(Vec<Value>),
    Object(Object),
    /// Result record with computed fields and masked dependencies
    Extended(ExtendedRecord),
}

impl Value {
    /// Builds an object from key/value pairs
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parses an RFC 3339 timestamp, keeping malformed input around as
    /// [`Value::InvalidDateTime`]
    pub fn parse_datetime(input: &str) -> Self {
        match DateTime::parse_from_rfc3339(input) {
            Ok(dt) => Value::DateTime(dt.with_timezone(&Utc)),
            Err(_) => Value::InvalidDateTime(input.to_string()),
        }
    }

    /// JavaScript-style truthiness, used for selection flags
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::BigInt(n) => n.sign() != num_bigint::Sign::NoSign,
            _ => true,
        }
    }

    /// `true` for `Undefined` and `Null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Plain-object member lookup; `None` for anything but [`Value::Object`]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?.get(key)
    }

    /// Truthy object member; absent, `Undefined`, `null` and `false` read as `None`
    pub(crate) fn get_truthy(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| v.is_truthy())
    }

    /// Mutable slot of a stored member, looking through result overlays
    pub(crate) fn member_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Object(map) => map.get_mut(key),
            Value::Extended(record) => record.base_mut().get_mut(key),
            _ => None,
        }
    }

    /// Resolves an extended record into a plain object, evaluating every
    /// computed field; other values are returned as they are
    pub fn materialize(self) -> crate::Result<Value> {
        match self {
            Value::Extended(record) => Ok(Value::Object(record.to_object()?)),
            other => Ok(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::BigInt(b)) | (Value::BigInt(b), Value::Int(a)) => {
                num_bigint::BigInt::from(*a) == *b
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::InvalidDateTime(a), Value::InvalidDateTime(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::DecimalLike(a), Value::DecimalLike(b)) => a.to_fixed() == b.to_fixed(),
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::FieldRef(a), Value::FieldRef(b)) => a == b,
            (Value::RawParameters(a), Value::RawParameters(b)) => a == b,
            (Value::Convertible(a), Value::Convertible(b)) => a.to_json() == b.to_json(),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Extended(record), other) | (other, Value::Extended(record)) => {
                match record.to_object() {
                    Ok(map) => Value::Object(map) == *other,
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }
}

/// Plain JSON rendering for callers; computed fields are evaluated
impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) | Value::InvalidDateTime(s) => serializer.serialize_str(s),
            Value::BigInt(n) => serializer.collect_str(n),
            Value::DateTime(dt) => serializer.serialize_str(&crate::codec::format_datetime(dt)),
            Value::Bytes(bytes) => serializer.serialize_str(&crate::codec::encode_base64(bytes)),
            Value::Decimal(d) => serializer.collect_str(d),
            Value::DecimalLike(d) => serializer.serialize_str(&d.to_fixed()),
            Value::Enum(e) => serializer.serialize_str(e.name()),
            Value::FieldRef(field) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("name", &field.name)?;
                map.serialize_entry("modelName", &field.model_name)?;
                map.end()
            }
            Value::RawParameters(raw) => raw.serialize(serializer),
            Value::Convertible(c) => c.to_json().serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => serialize_entries(entries, serializer),
            Value::Extended(record) => {
                let entries = record.to_object().map_err(S::Error::custom)?;
                serialize_entries(&entries, serializer)
            }
        }
    }
}

fn serialize_entries<S: serde::Serializer>(entries: &Object, serializer: S) -> Result<S::Ok, S::Error> {
    let present = entries.iter().filter(|(_, v)| !matches!(v, Value::Undefined));
    let mut map = serializer.serialize_map(None)?;
    for (key, value) in present {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

/// Plain conversion, without interpreting `$type` envelopes
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => number_to_value(&n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

pub(crate) fn number_to_value(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(i)
    } else if let Some(u) = n.as_u64() {
        Value::BigInt(u.into())
    } else {
        Value::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f64 => Float,
    String => String,
    &str => String,
    num_bigint::BigInt => BigInt,
    DateTime<Utc> => DateTime,
    Bytes => Bytes,
    Decimal => Decimal,
    NullEnum => Enum,
    FieldRef => FieldRef,
    Vec<Value> => List,
    Object => Object,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Object(Object::new()).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }

    #[test]
    fn test_int_equals_bigint() {
        let big = num_bigint::BigInt::from(9_007_199_254_740_993_i64);
        assert_eq!(Value::Int(9_007_199_254_740_993), Value::BigInt(big));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_from_json_keeps_order_and_numbers() {
        let value = Value::from(json!({ "b": 1, "a": 1.5, "c": [null, "x"] }));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(value.get("b"), Some(&Value::Int(1)));
        assert_eq!(value.get("a"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_serialize_plain_json() {
        let value = Value::object([
            ("id", Value::from(1)),
            ("skipped", Value::Undefined),
            ("kind", Value::Enum(NullEnum::DbNull)),
            ("price", Value::Decimal(Decimal::new(1050, 2))),
        ]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({ "id": 1, "kind": "DbNull", "price": "10.50" })
        );
    }

    #[test]
    fn test_parse_datetime() {
        assert!(matches!(
            Value::parse_datetime("2024-02-29T12:00:00Z"),
            Value::DateTime(_)
        ));
        assert_eq!(
            Value::parse_datetime("yesterday"),
            Value::InvalidDateTime("yesterday".to_string())
        );
    }
}
