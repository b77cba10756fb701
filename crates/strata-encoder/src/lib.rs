// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Geometry finalization and flattening for generated shape trees.
//!
//! This crate provides:
//! - [`InstancePreparator`]: pooled, deduplicated instance finalization
//! - [`GeometryFlattener`]: packing of instances into flat host buffers
//! - [`MaterialMarshaler`] and [`TextureResolver`]: materials to attribute maps
//! - [`ReportAggregator`]: per-domain report reduction
//! - [`Encoder`]: the per-initial-shape driver
//! - [`RecordingSink`]: an in-memory host for tests and tooling
//!
//! # Design
//!
//! The encoder only borrows shapes and talks to its host through the
//! `strata-geom-port` traits. Buffers handed to the host are borrowed from
//! the flattener and valid for one callback.
#![forbid(unsafe_code)]

mod driver;
mod flatten;
mod marshal;
mod names;
mod options;
pub mod prepare;
mod recording;
mod reports;
mod texture;
mod tree;

pub use driver::{EncodeError, EncodeSummary, Encoder};
pub use flatten::GeometryFlattener;
pub use marshal::{
    convert_reports, is_blacklisted, scan_valid_textures, MaterialMarshaler, TexturePaths,
    TextureUvMapping, BLACKLIST, TEXTURE_UV_MAPPINGS,
};
pub use names::NameRegistry;
pub use options::{
    AccumulationPolicy, EncodeOptions, ReportingStrategy, TextureFormat, CONFIG_KEY,
    DEFAULT_BASE_NAME,
};
pub use prepare::{Instance, InstancePreparator, PrepareError, PreparationFlags};
pub use recording::{RecordedAsset, RecordedBatch, RecordedReport, RecordingSink};
pub use reports::{CollectedReports, ReportAggregator, ReportError};
pub use texture::{
    encode_image, texture_file_name, ImageKind, TextureError, TextureResolver, TextureStrategy,
};
pub use tree::ShapeTree;
