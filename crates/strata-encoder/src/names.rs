// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Legal, unique asset file names.

use std::collections::HashSet;

/// Hands out file names that are filesystem-safe and unique per session.
///
/// Uniqueness is case-insensitive so names survive case-folding filesystems.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every character outside `[A-Za-z0-9._-]` with `_`.
    pub fn legalize(name: &str) -> String {
        let legal: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if legal.is_empty() || legal.chars().all(|c| c == '.') {
            format!("_{legal}")
        } else {
            legal
        }
    }

    /// Legalize `name` and make it unique by inserting `_1`, `_2`, ... before
    /// the extension.
    pub fn legalize_and_uniquify(&mut self, name: &str) -> String {
        let legal = Self::legalize(name);
        let (stem, ext) = match legal.rfind('.') {
            Some(dot) if dot > 0 => legal.split_at(dot),
            _ => (legal.as_str(), ""),
        };
        let mut candidate = legal.clone();
        let mut n = 0u32;
        while !self.taken.insert(candidate.to_ascii_lowercase()) {
            n += 1;
            candidate = format!("{stem}_{n}{ext}");
        }
        candidate
    }

    /// Forget every name.
    pub fn clear(&mut self) {
        self.taken.clear();
    }
}
