// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Encoder options.
//!
//! Options are plain serde data so hosts can keep them in any
//! [`ConfigStore`]; [`EncodeOptions::load`] reads them from the `"encoder"`
//! key and falls back to defaults for anything missing.

use serde::{Deserialize, Serialize};
use strata_app_core::config::{ConfigError, ConfigService, ConfigStore};

use crate::prepare::PreparationFlags;

/// Config key under which encoder options are stored.
pub const CONFIG_KEY: &str = "encoder";

/// Default prefix for generated asset names.
pub const DEFAULT_BASE_NAME: &str = "enc_default_name";

/// Target format for re-encoded textures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextureFormat {
    /// Pick from the URI extension and pixel format.
    #[default]
    Auto,
    /// JPEG.
    Jpg,
    /// PNG.
    Png,
    /// TIFF.
    Tiff,
}

/// Which shapes feed which report domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportingStrategy {
    /// Every shape of the tree, breadth first, into one domain.
    #[default]
    AllShapes,
    /// Each leaf and its ancestors, leaf first; one domain per leaf.
    LeafShapes,
    /// Each shape alone; one domain per shape.
    SingleShape,
}

impl ReportingStrategy {
    /// Returns `true` if the strategy yields one domain for the whole tree.
    pub const fn is_whole_tree(self) -> bool {
        matches!(self, Self::AllShapes)
    }
}

/// How values of one key within one domain are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccumulationPolicy {
    /// Keep every value in emission order.
    Append,
    /// One value per key: numeric sum, true-count for booleans, most frequent
    /// string.
    Sum,
    /// `_n`, `_avg`, `_sum`, `_min`, `_max` per key.
    #[default]
    Summarize,
    /// First value per key.
    WriteFirst,
}

/// Options recognized by [`Encoder`](crate::Encoder).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodeOptions {
    /// Prefix for generated asset names.
    pub base_name: String,
    /// Re-encode the unprocessed initial shape when traversal fails.
    pub error_fallback: bool,
    /// Emit `add_geometry` calls.
    pub emit_geometry: bool,
    /// Emit reports.
    pub emit_report: bool,
    /// Emit materials and UV channels.
    pub emit_materials: bool,
    /// Target format for re-encoded textures.
    pub texture_format: TextureFormat,
    /// Report domain strategy.
    pub reporting: ReportingStrategy,
    /// Report value policy.
    pub accumulation: AccumulationPolicy,
    /// Instance finalization flags.
    pub preparation: PreparationFlags,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_BASE_NAME.to_owned(),
            error_fallback: true,
            emit_geometry: true,
            emit_report: true,
            emit_materials: true,
            texture_format: TextureFormat::Auto,
            reporting: ReportingStrategy::AllShapes,
            accumulation: AccumulationPolicy::Summarize,
            preparation: PreparationFlags::default(),
        }
    }
}

impl EncodeOptions {
    /// Load options from `config`, defaulting when the key is absent.
    pub fn load<S: ConfigStore>(config: &ConfigService<S>) -> Result<Self, ConfigError> {
        config.load_or_default(CONFIG_KEY)
    }

    /// Persist options to `config`.
    pub fn save<S: ConfigStore>(&self, config: &ConfigService<S>) -> Result<(), ConfigError> {
        config.save(CONFIG_KEY, self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strata_app_core::config::MemoryConfigStore;

    #[test]
    fn defaults_match_encoder_contract() {
        let opts = EncodeOptions::default();
        assert_eq!(opts.base_name, "enc_default_name");
        assert!(opts.error_fallback && opts.emit_geometry && opts.emit_report && opts.emit_materials);
        assert!(!opts.preparation.instancing);
        assert!(opts.preparation.merge_by_material);
    }

    #[test]
    fn missing_key_loads_defaults() {
        let config = ConfigService::new(MemoryConfigStore::new());
        assert_eq!(EncodeOptions::load(&config).unwrap(), EncodeOptions::default());
    }

    #[test]
    fn camel_case_keys_round_trip() {
        let config = ConfigService::new(MemoryConfigStore::new());
        let opts = EncodeOptions {
            emit_materials: false,
            reporting: ReportingStrategy::LeafShapes,
            ..EncodeOptions::default()
        };
        opts.save(&config).unwrap();
        let raw = String::from_utf8(config.store().load_raw(CONFIG_KEY).unwrap().unwrap()).unwrap();
        assert!(raw.contains("\"emitMaterials\": false"));
        assert!(raw.contains("\"leafShapes\""));
        assert_eq!(EncodeOptions::load(&config).unwrap(), opts);
    }
}
