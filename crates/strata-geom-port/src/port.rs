// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port traits defining the generator and host contracts.

use thiserror::Error;

use crate::{AttributeMap, InitialShape, Shape, ShapeId, Transform};

/// Flattened geometry of one finalized instance.
///
/// Every slice is borrowed from encoder-owned scratch buffers and is only
/// valid for the duration of [`EncoderSink::add_geometry`]. Sinks copy what
/// they keep.
#[derive(Clone, Copy, Debug)]
pub struct GeometryBatch<'a> {
    /// Index of the initial shape being encoded.
    pub initial_shape_index: usize,
    /// Running instance number within this encode call.
    pub instance_index: usize,
    /// Shape the instance originated from; `None` for the unprocessed
    /// initial shape.
    pub shape_id: Option<ShapeId>,
    /// Local-to-world transform.
    pub transform: &'a Transform,
    /// Flat `(x, y, z)` triplets.
    pub vertex_coords: &'a [f64],
    /// Flat normal triplets; empty or one per vertex.
    pub normals: &'a [f64],
    /// Vertex count per face.
    pub face_counts: &'a [u32],
    /// Concatenated per-face vertex indices, valid against `vertex_coords`.
    pub face_indices: &'a [u32],
    /// Flat `(u, v)` pairs per UV channel.
    pub uv_coords: &'a [Vec<f64>],
    /// Per-face UV counts per UV channel; each has one entry per face.
    pub uv_counts: &'a [Vec<u32>],
    /// Concatenated per-face UV indices per UV channel.
    pub uv_indices: &'a [Vec<u32>],
    /// Starting face of each mesh plus the total face count.
    pub face_ranges: &'a [u32],
    /// One marshaled material per mesh; empty when materials are off.
    pub materials: &'a [AttributeMap],
    /// Reports attached to this instance, if any.
    pub reports: Option<&'a AttributeMap>,
}

impl GeometryBatch<'_> {
    /// Number of UV channels.
    pub fn uv_set_count(&self) -> usize {
        self.uv_coords.len()
    }

    /// Number of meshes that contributed to the batch.
    pub fn mesh_count(&self) -> usize {
        self.face_ranges.len().saturating_sub(1)
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_coords.len() / 3
    }
}

/// Host facility that stores asset bytes and returns a usable reference.
pub trait AssetRegistrar {
    /// Store `bytes` under a name derived from `file_name`.
    ///
    /// Returns the assigned path, or `None` if the host refused the asset.
    /// Not assumed idempotent: identical inputs may be stored twice.
    fn register_asset(&mut self, source_uri: &str, file_name: &str, bytes: &[u8])
        -> Option<String>;
}

/// Host sink receiving flattened output.
///
/// Both calls are synchronous and fire-and-forget.
pub trait EncoderSink: AssetRegistrar {
    /// Receive one flattened instance.
    fn add_geometry(&mut self, batch: &GeometryBatch<'_>);

    /// Receive the aggregated reports of an initial shape.
    fn add_report(&mut self, initial_shape_index: usize, reports: &AttributeMap);
}

/// Callback object handed to the encoder by the generator.
///
/// Objects that cannot receive encoder output return `None`, which the
/// encoder reports as a configuration error before doing any work.
pub trait Callbacks {
    /// The encoder-facing sink, if this object provides one.
    fn encoder_sink(&mut self) -> Option<&mut dyn EncoderSink> {
        None
    }
}

/// Failure while walking a generated shape tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shape traversal failed: {message}")]
pub struct TraversalError {
    /// Shape being visited when the failure occurred.
    pub shape: Option<ShapeId>,
    /// Generator message.
    pub message: String,
}

impl TraversalError {
    /// Failure not tied to a specific shape.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            shape: None,
            message: message.into(),
        }
    }

    /// Failure while visiting `shape`.
    pub fn at(shape: ShapeId, message: impl Into<String>) -> Self {
        Self {
            shape: Some(shape),
            message: message.into(),
        }
    }
}

/// Lazily produced shapes of one generated tree.
pub type ShapeStream<'a> = Box<dyn Iterator<Item = Result<&'a Shape, TraversalError>> + 'a>;

/// Producer of generated shape trees, one per initial shape.
pub trait ShapeSource {
    /// Number of initial shapes.
    fn initial_shape_count(&self) -> usize;

    /// Initial shape at `index`.
    fn initial_shape(&self, index: usize) -> Option<&InitialShape>;

    /// Walk the tree generated from initial shape `index`.
    ///
    /// Restartable: each call begins a fresh walk. Shapes are yielded parents
    /// before children. An `Err` item ends the walk.
    fn traverse(&self, index: usize) -> ShapeStream<'_>;
}
