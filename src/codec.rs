//! The `{type, payload}` value envelope.
//!
//! Results cross the wire as `{"type": "integer", "payload": "42"}`: the
//! payload is the JSON text of the value and the type tag says how to read
//! it back, so that e.g. the string `"42"` and the number `42` stay distinct.
//!
//! Decoding is tolerant. Anything that is not an envelope is a legacy bare
//! value and is returned as-is, see [`WireValue::Bare`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` tag of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    Null,
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// A tag this client does not know. Decoded like `object`.
    Other(String),
}

impl ValueType {
    /// The tag for a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ValueType::Null => "null",
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Other(tag) => tag,
        }
    }
}

impl From<String> for ValueType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "null" | "none" => ValueType::Null,
            "string" | "str" => ValueType::String,
            "integer" | "int" => ValueType::Integer,
            "number" | "float" => ValueType::Number,
            "boolean" | "bool" => ValueType::Boolean,
            "array" | "list" => ValueType::Array,
            "object" | "dict" => ValueType::Object,
            _ => ValueType::Other(tag),
        }
    }
}

impl From<ValueType> for String {
    fn from(tag: ValueType) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in its wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedValue {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// JSON text of the value.
    pub payload: String,
}

impl SerializedValue {
    /// Wrap `value` in an envelope.
    pub fn encode(value: &Value) -> Self {
        Self {
            value_type: ValueType::of(value),
            payload: value.to_string(),
        }
    }

    /// Read the value back, coercing to the tagged type.
    ///
    /// Never fails: a payload that cannot be read as its tag is returned as
    /// the raw payload string.
    pub fn decode(&self) -> Value {
        let raw = || Value::String(self.payload.clone());
        let parsed = serde_json::from_str::<Value>(&self.payload);

        match &self.value_type {
            ValueType::Null => Value::Null,
            ValueType::String => match parsed {
                Ok(Value::String(s)) => Value::String(s),
                Ok(other) => Value::String(other.to_string()),
                Err(_) => raw(),
            },
            ValueType::Integer => parsed.ok().and_then(coerce_integer).unwrap_or_else(raw),
            ValueType::Number => parsed.ok().and_then(coerce_number).unwrap_or_else(raw),
            ValueType::Boolean => parsed.ok().and_then(coerce_boolean).unwrap_or_else(raw),
            ValueType::Array | ValueType::Object | ValueType::Other(_) => match parsed {
                Ok(value) => unwrap_content(value),
                Err(_) => raw(),
            },
        }
    }
}

/// What arrived on the wire: an envelope, or a bare legacy value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Canonical `{type, payload}` shape.
    Enveloped(SerializedValue),
    /// Compatibility shim for servers and response shapes that send values
    /// without an envelope. Returned unchanged.
    Bare(Value),
}

impl WireValue {
    /// Classify a JSON value.
    ///
    /// An object is an envelope when it has a string `type` and a `payload`.
    /// A non-string payload is accepted and read as already-parsed JSON.
    pub fn classify(value: Value) -> Self {
        if let Value::Object(obj) = &value {
            if let (Some(Value::String(tag)), Some(payload)) = (obj.get("type"), obj.get("payload"))
            {
                let payload = match payload {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return WireValue::Enveloped(SerializedValue {
                    value_type: ValueType::from(tag.clone()),
                    payload,
                });
            }
        }
        WireValue::Bare(value)
    }

    pub fn into_value(self) -> Value {
        match self {
            WireValue::Enveloped(envelope) => envelope.decode(),
            WireValue::Bare(value) => value,
        }
    }
}

/// Wrap `value` in an envelope.
pub fn encode(value: &Value) -> SerializedValue {
    SerializedValue::encode(value)
}

/// Envelope `value` and render it as JSON text, the form used inside
/// string-typed `data` fields.
pub fn encode_to_string(value: &Value) -> String {
    serde_json::to_string(&SerializedValue::encode(value)).unwrap_or_else(|_| value.to_string())
}

/// Decode a JSON value that may or may not be an envelope.
pub fn decode(value: Value) -> Value {
    WireValue::classify(value).into_value()
}

/// Decode JSON text that may hold an envelope, a bare JSON value, or not be
/// JSON at all (returned as a string).
pub fn decode_str(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => decode(value),
        Err(_) => Value::String(text.to_string()),
    }
}

/// Decode a wire field: strings are read as serialized JSON text, anything
/// else as a JSON value.
pub fn decode_field(value: Value) -> Value {
    match value {
        Value::String(text) => decode_str(&text),
        other => decode(other),
    }
}

fn coerce_integer(value: Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(Value::Number(n)),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| Value::from(f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        Value::Bool(b) => Some(Value::from(i64::from(b))),
        _ => None,
    }
}

fn coerce_number(value: Value) -> Option<Value> {
    match value {
        Value::Number(n) => Some(Value::Number(n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

fn coerce_boolean(value: Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
        _ => None,
    }
}

/// Legacy nesting: some responses wrap the result as `{"content": ...}`.
/// Unwraps exactly one level.
fn unwrap_content(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.contains_key("content") => {
            obj.remove("content").unwrap_or(Value::Null)
        }
        other => other,
    }
}
