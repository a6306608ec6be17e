//! Normalized block-device attributes
//!
//! Values read from the block-device pseudo-filesystem are kept as text, except
//! for the derived size fields which are integers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel stored for any attribute whose source could not be read
pub const UNKNOWN: &str = "unknown";

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(u64),
    Text(String),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            AttributeValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            AttributeValue::Integer(value) => Some(*value),
            AttributeValue::Text(_) => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Integer(value)
    }
}

/// Attribute name → value mapping for one device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SysAttributes(BTreeMap<String, AttributeValue>);

impl SysAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    /// Text value of `key`, or [`UNKNOWN`] when absent or not text
    pub fn text(&self, key: &str) -> &str {
        self.get(key).and_then(AttributeValue::as_text).unwrap_or(UNKNOWN)
    }

    /// Integer value of `key`, or 0 when absent or not an integer
    pub fn integer(&self, key: &str) -> u64 {
        self.get(key).and_then(AttributeValue::as_integer).unwrap_or(0)
    }

    /// Device size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.integer("size")
    }

    pub fn is_rotational(&self) -> bool {
        self.text("rotational") == "1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_fall_back_to_defaults() {
        let mut attrs = SysAttributes::new();
        attrs.insert("size", 4096_u64);
        attrs.insert("model", "DISK");

        assert_eq!(attrs.size_bytes(), 4096);
        assert_eq!(attrs.text("model"), "DISK");
        assert_eq!(attrs.text("vendor"), UNKNOWN);
        assert_eq!(attrs.integer("model"), 0);
        assert!(!attrs.is_rotational());
    }

    #[test]
    fn serializes_as_flat_json_object() {
        let mut attrs = SysAttributes::new();
        attrs.insert("rotational", "1");
        attrs.insert("size", 512_u64);

        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json, serde_json::json!({"rotational": "1", "size": 512}));
    }
}
