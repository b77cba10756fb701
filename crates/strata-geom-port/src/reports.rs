// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Aggregated report values.

/// Three parallel report tables in insertion order.
///
/// Keys may repeat: the append policy concatenates emissions instead of
/// reducing them. Lookups return the first entry.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Reports {
    /// Boolean entries.
    pub bools: Vec<(String, bool)>,
    /// Numeric entries.
    pub floats: Vec<(String, f64)>,
    /// String entries.
    pub strings: Vec<(String, String)>,
}

impl Reports {
    /// Returns `true` if no entry is present.
    pub fn is_empty(&self) -> bool {
        self.bools.is_empty() && self.floats.is_empty() && self.strings.is_empty()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.bools.len() + self.floats.len() + self.strings.len()
    }

    /// First boolean entry for `key`.
    pub fn bool(&self, key: &str) -> Option<bool> {
        first(&self.bools, key).copied()
    }

    /// First numeric entry for `key`.
    pub fn float(&self, key: &str) -> Option<f64> {
        first(&self.floats, key).copied()
    }

    /// First string entry for `key`.
    pub fn string(&self, key: &str) -> Option<&str> {
        first(&self.strings, key).map(String::as_str)
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: &Self) {
        self.bools.extend(other.bools.iter().cloned());
        self.floats.extend(other.floats.iter().cloned());
        self.strings.extend(other.strings.iter().cloned());
    }
}

fn first<'a, T>(entries: &'a [(String, T)], key: &str) -> Option<&'a T> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}
