//! Wire value codec
//!
//! Values without a JSON representation travel as `{ "$type", "value" }`
//! envelopes ([`TaggedValue`]). [`encode`] turns caller arguments into
//! wire JSON, [`decode`] turns engine results back into [`Value`]s.

use core::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError, ValidationErrorKind};
use crate::value::{Object, Value, number_to_value};

/// Largest integer a JSON number carries without precision loss
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Tagged wire envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", content = "value")]
pub enum TaggedValue {
    BigInt(String),
    DateTime(String),
    Bytes(String),
    Decimal(String),
    /// JSON column payload, as JSON text
    Json(String),
    Enum(String),
    FieldRef(FieldRefPayload),
    /// Caller object that already carried a `$type` key
    Raw(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRefPayload {
    #[serde(rename = "_ref")]
    pub name: String,
    #[serde(rename = "_container")]
    pub model_name: String,
}

/// Location of the value being encoded, reported on errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentContext {
    pub selection_path: Vec<String>,
    pub argument_path: Vec<String>,
}

impl ArgumentContext {
    pub fn new(selection_path: Vec<String>) -> Self {
        Self {
            selection_path,
            argument_path: Vec::new(),
        }
    }

    /// Context for a member of the current argument
    pub fn nested(&self, key: &str) -> Self {
        let mut argument_path = self.argument_path.clone();
        argument_path.push(key.to_string());
        Self {
            selection_path: self.selection_path.clone(),
            argument_path,
        }
    }

    fn argument_name(&self) -> String {
        self.argument_path.last().cloned().unwrap_or_default()
    }

    fn invalid_value(&self, type_names: &[&str], underlying_error: &str) -> ValidationError {
        ValidationError::new(ValidationErrorKind::InvalidArgumentValue {
            argument_name: self.argument_name(),
            type_names: type_names.iter().map(|t| t.to_string()).collect(),
            underlying_error: underlying_error.to_string(),
        })
        .with_selection_path(self.selection_path.clone())
        .with_argument_path(self.argument_path.clone())
    }
}

/// Encodes one argument value for the wire
pub fn encode(value: &Value, ctx: &ArgumentContext) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    let json = match value {
        Value::Undefined | Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::String(s) => Json::String(s.clone()),
        Value::Int(n) if n.unsigned_abs() > MAX_SAFE_INTEGER as u64 => {
            tagged(TaggedValue::BigInt(n.to_string()))?
        }
        Value::Int(n) => Json::from(*n),
        Value::Float(f) => match serde_json::Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None => {
                return Err(ctx
                    .invalid_value(&["Float"], "Provided number is not finite")
                    .into());
            }
        },
        Value::BigInt(n) => tagged(TaggedValue::BigInt(n.to_string()))?,
        Value::DateTime(dt) => tagged(TaggedValue::DateTime(format_datetime(dt)))?,
        Value::InvalidDateTime(_) => {
            return Err(ctx
                .invalid_value(&["Date"], "Provided Date object is invalid")
                .into());
        }
        Value::FieldRef(field) => tagged(TaggedValue::FieldRef(FieldRefPayload {
            name: field.name.clone(),
            model_name: field.model_name.clone(),
        }))?,
        Value::List(items) => encode_list(items, ctx)?,
        Value::Bytes(bytes) => tagged(TaggedValue::Bytes(encode_base64(bytes)))?,
        Value::RawParameters(raw) => raw.clone(),
        Value::Decimal(d) => tagged(TaggedValue::Decimal(d.to_string()))?,
        Value::DecimalLike(d) => tagged(TaggedValue::Decimal(d.to_fixed()))?,
        Value::Enum(e) => tagged(TaggedValue::Enum(e.name().to_string()))?,
        Value::Convertible(c) => c.to_json(),
        Value::Object(entries) => encode_object(entries, ctx)?,
        Value::Extended(record) => encode_object(&record.to_object()?, ctx)?,
    };
    Ok(json)
}

fn encode_list(items: &[Value], ctx: &ArgumentContext) -> Result<serde_json::Value> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_ctx = ctx.nested(&i.to_string());
        if matches!(item, Value::Undefined) {
            return Err(ctx
                .invalid_value(
                    &[],
                    "Can not use `undefined` value within array. Use `null` or filter out `undefined` values",
                )
                .with_argument_path(item_ctx.argument_path)
                .into());
        }
        out.push(encode(item, &item_ctx)?);
    }
    Ok(serde_json::Value::Array(out))
}

fn encode_object(entries: &Object, ctx: &ArgumentContext) -> Result<serde_json::Value> {
    if entries.get("$type").is_some_and(Value::is_truthy) {
        let raw = serde_json::to_value(entries)?;
        return tagged(TaggedValue::Raw(raw));
    }

    let mut out = serde_json::Map::with_capacity(entries.len());
    for (key, value) in entries {
        if matches!(value, Value::Undefined) {
            continue;
        }
        out.insert(key.clone(), encode(value, &ctx.nested(key))?);
    }
    Ok(serde_json::Value::Object(out))
}

fn tagged(value: TaggedValue) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Decodes an engine result into native values
///
/// Recognises `BigInt`, `Bytes`, `DateTime`, `Decimal` and `Json`
/// envelopes. Anything else, including envelopes whose payload does not
/// parse, comes back as a plain object.
pub fn decode(json: serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number_to_value(&n),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::List(items.into_iter().map(decode).collect()),
        Json::Object(map) => {
            if map.get("$type").is_some_and(Json::is_string)
                && let Some(value) = decode_tagged(&map)
            {
                return value;
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, decode(v))).collect())
        }
    }
}

fn decode_tagged(map: &serde_json::Map<String, serde_json::Value>) -> Option<Value> {
    let tagged: TaggedValue = serde_json::from_value(serde_json::Value::Object(map.clone())).ok()?;
    match tagged {
        TaggedValue::BigInt(s) => num_bigint::BigInt::from_str(&s).ok().map(Value::BigInt),
        TaggedValue::Bytes(s) => STANDARD.decode(s).ok().map(|b| Value::Bytes(b.into())),
        TaggedValue::DateTime(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
        TaggedValue::Decimal(s) => Decimal::from_str(&s)
            .or_else(|_| Decimal::from_scientific(&s))
            .ok()
            .map(Value::Decimal),
        TaggedValue::Json(s) => serde_json::from_str::<serde_json::Value>(&s)
            .ok()
            .map(Value::from),
        TaggedValue::Enum(_) | TaggedValue::FieldRef(_) | TaggedValue::Raw(_) => None,
    }
}

/// ISO-8601 in UTC, millisecond precision unless finer digits are set
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    let format = if dt.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    dt.to_rfc3339_opts(format, true)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
