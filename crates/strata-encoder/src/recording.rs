// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory encoder host.
//!
//! [`RecordingSink`] copies everything the encoder hands it, so tests and the
//! CLI can inspect or serialize a full encode. Assets are kept in memory and
//! addressed as `assets/<file_name>`.

use serde::Serialize;
use strata_geom_port::{
    AssetRegistrar, AttributeMap, Callbacks, EncoderSink, GeometryBatch, ShapeId, Transform,
};

/// Owned copy of one [`GeometryBatch`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedBatch {
    /// Initial shape the batch belongs to.
    pub initial_shape_index: usize,
    /// Instance number within its encode call.
    pub instance_index: usize,
    /// Originating shape.
    pub shape_id: Option<ShapeId>,
    /// Local-to-world transform.
    pub transform: Transform,
    /// Flat positions.
    pub vertex_coords: Vec<f64>,
    /// Flat normals.
    pub normals: Vec<f64>,
    /// Vertex count per face.
    pub face_counts: Vec<u32>,
    /// Concatenated face indices.
    pub face_indices: Vec<u32>,
    /// UV coordinates per channel.
    pub uv_coords: Vec<Vec<f64>>,
    /// UV counts per channel.
    pub uv_counts: Vec<Vec<u32>>,
    /// UV indices per channel.
    pub uv_indices: Vec<Vec<u32>>,
    /// Mesh start faces plus total.
    pub face_ranges: Vec<u32>,
    /// Material maps, one per mesh.
    pub materials: Vec<AttributeMap>,
    /// Attached per-shape reports.
    pub reports: Option<AttributeMap>,
}

impl RecordedBatch {
    /// Copy `batch`.
    pub fn from_batch(batch: &GeometryBatch<'_>) -> Self {
        Self {
            initial_shape_index: batch.initial_shape_index,
            instance_index: batch.instance_index,
            shape_id: batch.shape_id,
            transform: *batch.transform,
            vertex_coords: batch.vertex_coords.to_vec(),
            normals: batch.normals.to_vec(),
            face_counts: batch.face_counts.to_vec(),
            face_indices: batch.face_indices.to_vec(),
            uv_coords: batch.uv_coords.to_vec(),
            uv_counts: batch.uv_counts.to_vec(),
            uv_indices: batch.uv_indices.to_vec(),
            face_ranges: batch.face_ranges.to_vec(),
            materials: batch.materials.to_vec(),
            reports: batch.reports.cloned(),
        }
    }

    /// Number of UV channels.
    pub fn uv_set_count(&self) -> usize {
        self.uv_coords.len()
    }

    /// Number of meshes.
    pub fn mesh_count(&self) -> usize {
        self.face_ranges.len().saturating_sub(1)
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_coords.len() / 3
    }
}

/// Whole-tree reports of one initial shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedReport {
    /// Initial shape the reports belong to.
    pub initial_shape_index: usize,
    /// Marshaled reports.
    pub reports: AttributeMap,
}

/// Asset stored through [`AssetRegistrar::register_asset`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAsset {
    /// URI the asset was produced from.
    pub source_uri: String,
    /// File name requested by the encoder.
    pub file_name: String,
    /// Path handed back to the encoder.
    pub path: String,
    /// Asset payload.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Payload size.
    pub byte_len: usize,
}

/// Encoder host that records every callback.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RecordingSink {
    /// Geometry callbacks in call order.
    pub batches: Vec<RecordedBatch>,
    /// Report callbacks in call order.
    pub reports: Vec<RecordedReport>,
    /// Registered assets in call order.
    pub assets: Vec<RecordedAsset>,
    #[serde(skip)]
    refuse_assets: bool,
}

impl RecordingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose registrar refuses every asset.
    pub fn refusing_assets() -> Self {
        Self {
            refuse_assets: true,
            ..Self::default()
        }
    }

    /// Batches of `initial_shape_index`.
    pub fn batches_of(&self, initial_shape_index: usize) -> impl Iterator<Item = &RecordedBatch> {
        self.batches
            .iter()
            .filter(move |b| b.initial_shape_index == initial_shape_index)
    }

    /// Asset registered under `path`.
    pub fn asset(&self, path: &str) -> Option<&RecordedAsset> {
        self.assets.iter().find(|a| a.path == path)
    }
}

impl AssetRegistrar for RecordingSink {
    fn register_asset(&mut self, source_uri: &str, file_name: &str, bytes: &[u8]) -> Option<String> {
        if self.refuse_assets {
            return None;
        }
        let path = format!("assets/{file_name}");
        self.assets.push(RecordedAsset {
            source_uri: source_uri.to_owned(),
            file_name: file_name.to_owned(),
            path: path.clone(),
            bytes: bytes.to_vec(),
            byte_len: bytes.len(),
        });
        Some(path)
    }
}

impl EncoderSink for RecordingSink {
    fn add_geometry(&mut self, batch: &GeometryBatch<'_>) {
        self.batches.push(RecordedBatch::from_batch(batch));
    }

    fn add_report(&mut self, initial_shape_index: usize, reports: &AttributeMap) {
        self.reports.push(RecordedReport {
            initial_shape_index,
            reports: reports.clone(),
        });
    }
}

impl Callbacks for RecordingSink {
    fn encoder_sink(&mut self) -> Option<&mut dyn EncoderSink> {
        Some(self)
    }
}
