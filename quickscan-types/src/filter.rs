//! Key/value filter over reportable objects
//!
//! A filter is a comma-separated list of `key=value` or `key/subkey=value`
//! clauses, e.g. `available=true,sys_api/rotational=0`. Evaluation is a
//! conjunction over the keys the object exposes; keys it does not expose are
//! ignored rather than treated as a mismatch.

use thiserror::Error;
use tracing::debug;

use crate::attributes::{AttributeValue, SysAttributes};
use crate::device::DeviceRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("filter clause '{0}' must contain exactly one '='")]
    MissingSeparator(String),
    #[error("filter clause '{0}' has an empty key")]
    EmptyKey(String),
    #[error("filter clause '{0}' has an empty value")]
    EmptyValue(String),
    #[error("filter clause '{0}' nests deeper than key/subkey")]
    NestedKey(String),
}

/// Right-hand side of a clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Bool(bool),
    Text(String),
}

impl FilterValue {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("true") {
            FilterValue::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            FilterValue::Bool(false)
        } else {
            FilterValue::Text(raw.to_string())
        }
    }
}

/// A comparable value resolved from an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar<'a> {
    Text(&'a str),
    Integer(u64),
    Bool(bool),
    Null,
}

impl Scalar<'_> {
    fn matches(&self, expected: &FilterValue) -> bool {
        match (self, expected) {
            (Scalar::Text(actual), FilterValue::Text(wanted)) => actual == wanted,
            (Scalar::Integer(actual), FilterValue::Text(wanted)) => {
                wanted.parse::<u64>().is_ok_and(|wanted| wanted == *actual)
            }
            (Scalar::Bool(actual), FilterValue::Bool(wanted)) => actual == wanted,
            _ => false,
        }
    }
}

impl<'a> From<&'a AttributeValue> for Scalar<'a> {
    fn from(value: &'a AttributeValue) -> Self {
        match value {
            AttributeValue::Integer(value) => Scalar::Integer(*value),
            AttributeValue::Text(text) => Scalar::Text(text),
        }
    }
}

impl<'a> From<Option<&'a str>> for Scalar<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(Scalar::Null, Scalar::Text)
    }
}

/// Nested mapping reachable through `key/subkey`
pub trait AttributeMap {
    fn lookup(&self, key: &str) -> Option<Scalar<'_>>;
}

impl AttributeMap for SysAttributes {
    fn lookup(&self, key: &str) -> Option<Scalar<'_>> {
        self.get(key).map(Scalar::from)
    }
}

/// Shape of a top-level field
pub enum FieldValue<'a> {
    Scalar(Scalar<'a>),
    /// Text derived on demand rather than stored on the object
    Derived(String),
    Mapping(&'a dyn AttributeMap),
    /// Lists never compare equal to a clause value
    Sequence,
}

/// Objects a [`DeviceFilter`] can be evaluated against
pub trait FilterTarget {
    /// Resolve a top-level field, `None` when the object has no such field
    fn field(&self, key: &str) -> Option<FieldValue<'_>>;
}

impl FilterTarget for DeviceRecord {
    fn field(&self, key: &str) -> Option<FieldValue<'_>> {
        let scalar = match key {
            "path" => Scalar::Text(self.path()),
            "dev_path" => Scalar::Text(&self.dev_path),
            "alt_path" => self.alt_path.as_deref().into(),
            "mpath_device" => self.mpath_device.as_deref().into(),
            "mpath_node" => self.mpath_node.as_deref().into(),
            "available" => Scalar::Bool(self.available()),
            "device_id" => return Some(FieldValue::Derived(self.identity().to_string())),
            "sys_api" => return Some(FieldValue::Mapping(&self.sys_api)),
            "lvs" | "reject_reasons" => return Some(FieldValue::Sequence),
            _ => return None,
        };
        Some(FieldValue::Scalar(scalar))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    raw_key: String,
    key: String,
    subkey: Option<String>,
    value: FilterValue,
}

impl Clause {
    fn parse(clause: &str) -> Result<Self, FilterError> {
        let mut parts = clause.split('=');
        let (Some(raw_key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(FilterError::MissingSeparator(clause.to_string()));
        };
        if raw_key.is_empty() {
            return Err(FilterError::EmptyKey(clause.to_string()));
        }
        if value.is_empty() {
            return Err(FilterError::EmptyValue(clause.to_string()));
        }

        let (key, subkey) = match raw_key.split_once('/') {
            Some((_, subkey)) if subkey.contains('/') => {
                return Err(FilterError::NestedKey(clause.to_string()));
            }
            Some((key, subkey)) if key.is_empty() || subkey.is_empty() => {
                return Err(FilterError::EmptyKey(clause.to_string()));
            }
            Some((key, subkey)) => (key.to_string(), Some(subkey.to_string())),
            None => (raw_key.to_string(), None),
        };

        Ok(Self {
            raw_key: raw_key.to_string(),
            key,
            subkey,
            value: FilterValue::parse(value),
        })
    }

    /// `Some(false)` on mismatch, `None` when the clause does not apply
    fn evaluate(&self, target: &dyn FilterTarget) -> Option<bool> {
        let Some(field) = target.field(&self.key) else {
            debug!("filter key ({}) not found in the object. Key ignored.", self.raw_key);
            return None;
        };

        let matched = match (field, &self.subkey) {
            (FieldValue::Mapping(map), Some(subkey)) => map
                .lookup(subkey)
                .is_some_and(|actual| actual.matches(&self.value)),
            (_, Some(_)) => {
                debug!("filter skipping {}: not a mapping", self.raw_key);
                return None;
            }
            (FieldValue::Scalar(actual), None) => actual.matches(&self.value),
            (FieldValue::Derived(actual), None) => Scalar::Text(&actual).matches(&self.value),
            (FieldValue::Mapping(_) | FieldValue::Sequence, None) => false,
        };

        if !matched {
            debug!("filter result - no match on {}", self.raw_key);
        }
        Some(matched)
    }
}

/// Parsed filter; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    clauses: Vec<Clause>,
}

impl DeviceFilter {
    /// Parse a filter string. Any malformed clause invalidates the whole filter.
    pub fn parse(filter: &str) -> Result<Self, FilterError> {
        let clauses = filter
            .split(',')
            .map(Clause::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { clauses })
    }

    /// Filter that restricts nothing
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, target: &dyn FilterTarget) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.evaluate(target) != Some(false))
    }
}
