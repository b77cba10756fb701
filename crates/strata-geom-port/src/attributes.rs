// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generic key to typed-value attribute maps.
//!
//! This is the host-facing representation of materials, reports and rule
//! attributes. Keys iterate in sorted order so output is deterministic.

use std::collections::BTreeMap;

/// A typed attribute value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "value", rename_all = "camelCase")
)]
pub enum AttrValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i32),
    /// Float.
    Float(f64),
    /// String.
    String(String),
    /// Boolean array.
    BoolArray(Vec<bool>),
    /// Integer array.
    IntArray(Vec<i32>),
    /// Float array.
    FloatArray(Vec<f64>),
    /// String array.
    StringArray(Vec<String>),
}

/// Ordered attribute map.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct AttributeMap {
    values: BTreeMap<String, AttrValue>,
}

impl AttributeMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn set(&mut self, key: impl Into<String>, value: AttrValue) {
        self.values.insert(key.into(), value);
    }

    /// Insert a boolean.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, AttrValue::Bool(value));
    }

    /// Insert an integer.
    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.set(key, AttrValue::Int(value));
    }

    /// Insert a float.
    pub fn set_float(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, AttrValue::Float(value));
    }

    /// Insert a string.
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, AttrValue::String(value.into()));
    }

    /// Value of `key`.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }

    /// Boolean value of `key`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value of `key`.
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float value of `key`.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String value of `key`.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, AttrValue)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_check_kind() {
        let mut map = AttributeMap::new();
        map.set_float("height", 12.5);
        map.set_string("name", "tower");
        assert_eq!(map.get_float("height"), Some(12.5));
        assert_eq!(map.get_int("height"), None);
        assert_eq!(map.get_string("name"), Some("tower"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["height", "name"]);
    }
}
