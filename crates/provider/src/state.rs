//! Resource state and configuration values
//!
//! Configuration, plans and state all travel as a [`DynamicValue`]
//! attribute bag. States are stored as MessagePack; JSON is accepted on
//! decode.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use iplb_common::{Error, Result};

/// Dynamic value that can be encoded/decoded from Terraform state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<DynamicValue>),
    Map(HashMap<String, DynamicValue>),
}

impl DynamicValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DynamicValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, DynamicValue>> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Attribute lookup; a key explicitly set to null reads as absent
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_map()?.get(key).filter(|v| !v.is_null())
    }

    /// Set an attribute, turning a null value into an empty map first
    pub fn set(&mut self, key: &str, value: DynamicValue) {
        if self.is_null() {
            *self = DynamicValue::Map(HashMap::new());
        }
        if let DynamicValue::Map(m) = self {
            m.insert(key.to_string(), value);
        }
    }
}

impl Default for DynamicValue {
    fn default() -> Self {
        DynamicValue::Null
    }
}

impl From<serde_json::Value> for DynamicValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DynamicValue::Null,
            serde_json::Value::Bool(b) => DynamicValue::Bool(b),
            serde_json::Value::Number(n) => DynamicValue::Number(n),
            serde_json::Value::String(s) => DynamicValue::String(s),
            serde_json::Value::Array(a) => {
                DynamicValue::List(a.into_iter().map(DynamicValue::from).collect())
            }
            serde_json::Value::Object(o) => DynamicValue::Map(
                o.into_iter().map(|(k, v)| (k, DynamicValue::from(v))).collect(),
            ),
        }
    }
}

/// Decode a state or configuration from JSON or MessagePack bytes
pub fn decode_dynamic_value(data: &[u8]) -> Result<DynamicValue> {
    if data.is_empty() {
        return Ok(DynamicValue::Null);
    }

    // JSON is tried first: a MessagePack decoder would read a leading '{'
    // as a positive fixint and stop there.
    if let Ok(value) = serde_json::from_slice::<DynamicValue>(data) {
        return Ok(value);
    }

    rmp_serde::from_slice(data)
        .map_err(|e| Error::Internal(format!("Failed to decode state: {}", e)))
}

/// Encode a value as MessagePack
pub fn encode_dynamic_value(value: &DynamicValue) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value)
        .map_err(|e| Error::Internal(format!("Failed to encode state: {}", e)))
}

/// Helper to extract a string attribute from a DynamicValue
pub fn get_string_attr(value: &DynamicValue, key: &str) -> String {
    value.get(key)
        .and_then(|v| v.as_string())
        .unwrap_or("")
        .to_string()
}

/// Helper to extract an optional string attribute from a DynamicValue
pub fn get_optional_string_attr(value: &DynamicValue, key: &str) -> Option<String> {
    value.get(key)
        .and_then(|v| match v {
            DynamicValue::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
}

/// Helper to extract an integer attribute from a DynamicValue
pub fn get_int_attr(value: &DynamicValue, key: &str, default: i64) -> i64 {
    get_optional_int_attr(value, key).unwrap_or(default)
}

/// Helper to extract an optional integer attribute from a DynamicValue
pub fn get_optional_int_attr(value: &DynamicValue, key: &str) -> Option<i64> {
    value.get(key).and_then(|v| v.as_i64())
}

/// Helper to extract a bool attribute from a DynamicValue
pub fn get_bool_attr(value: &DynamicValue, key: &str, default: bool) -> bool {
    get_optional_bool_attr(value, key).unwrap_or(default)
}

/// Helper to extract an optional bool attribute from a DynamicValue
pub fn get_optional_bool_attr(value: &DynamicValue, key: &str) -> Option<bool> {
    value.get(key).and_then(|v| v.as_bool())
}

/// Helper to extract a list (or set) attribute; absent reads as empty
pub fn get_list_attr<'a>(value: &'a DynamicValue, key: &str) -> &'a [DynamicValue] {
    value.get(key)
        .and_then(|v| v.as_list())
        .unwrap_or(&[])
}

/// Create a DynamicValue map with the given attributes
pub fn make_state(attrs: Vec<(&str, DynamicValue)>) -> DynamicValue {
    let mut map = HashMap::new();
    for (key, value) in attrs {
        map.insert(key.to_string(), value);
    }
    DynamicValue::Map(map)
}

/// Create a string DynamicValue
pub fn string_value(s: impl Into<String>) -> DynamicValue {
    DynamicValue::String(s.into())
}

/// Create a string DynamicValue, or null when absent
pub fn optional_string_value(s: Option<impl Into<String>>) -> DynamicValue {
    s.map(string_value).unwrap_or(DynamicValue::Null)
}

/// Create a number DynamicValue from i64
pub fn int_value(n: i64) -> DynamicValue {
    DynamicValue::Number(serde_json::Number::from(n))
}

/// Create a number DynamicValue, or null when absent
pub fn optional_int_value(n: Option<i64>) -> DynamicValue {
    n.map(int_value).unwrap_or(DynamicValue::Null)
}

/// Create a bool DynamicValue
pub fn bool_value(b: bool) -> DynamicValue {
    DynamicValue::Bool(b)
}

/// Create a bool DynamicValue, or null when absent
pub fn optional_bool_value(b: Option<bool>) -> DynamicValue {
    b.map(bool_value).unwrap_or(DynamicValue::Null)
}

/// Create a null DynamicValue
pub fn null_value() -> DynamicValue {
    DynamicValue::Null
}
