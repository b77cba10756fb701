// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Geometry port contract for Strata encoders.
//!
//! This crate defines the domain contract between the procedural generator,
//! the encoder pipeline and the host that receives flattened geometry.
//! It contains no pipeline logic; that lives in `strata-encoder`.
//!
//! # Design Principles
//!
//! - **Shapes are read-only**: The generator owns them; encoders only borrow.
//! - **Hosts are dumb**: They receive flat buffers and copy what they keep.
//! - **Closed value kinds**: Material and attribute values are sum types.
//!
//! # Crate Features
//!
//! - `serde`: Derives `Serialize`/`Deserialize` for the data model so scene
//!   descriptions and recorded output can round-trip through JSON.

use thiserror::Error;

/// Error type for malformed mesh data.
///
/// These are upstream programming errors: the generator produced a mesh whose
/// index or count invariants do not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    /// A flat coordinate buffer does not hold whole tuples.
    #[error("coordinate buffer length {len} is not a multiple of {arity}")]
    CoordinateArity {
        /// Buffer length.
        len: usize,
        /// Expected tuple size.
        arity: usize,
    },
    /// Normals are present but not one per vertex.
    #[error("normal buffer length {normals} does not match vertex buffer length {coords}")]
    NormalCount {
        /// Normal buffer length.
        normals: usize,
        /// Vertex coordinate buffer length.
        coords: usize,
    },
    /// Face vertex counts do not add up to the index buffer length.
    #[error("face counts sum to {declared} but {actual} indices are present")]
    IndexCount {
        /// Sum of face vertex counts.
        declared: usize,
        /// Actual index buffer length.
        actual: usize,
    },
    /// A face references a vertex past the end of the vertex buffer.
    #[error("face {face} references vertex {index} but only {vertex_count} vertices exist")]
    VertexIndexOutOfRange {
        /// Face index.
        face: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices.
        vertex_count: usize,
    },
    /// A UV set does not carry one count per face.
    #[error("uv set {set} has {counts} face counts for {faces} faces")]
    UvFaceCount {
        /// UV set index.
        set: usize,
        /// Number of per-face UV counts.
        counts: usize,
        /// Number of faces.
        faces: usize,
    },
    /// A face has a UV count that is neither zero nor its vertex count.
    #[error("uv set {set} face {face} has {uvs} uv indices for {vertices} vertices")]
    UvCornerCount {
        /// UV set index.
        set: usize,
        /// Face index.
        face: usize,
        /// UV index count of the face.
        uvs: u32,
        /// Vertex count of the face.
        vertices: u32,
    },
    /// UV face counts do not add up to the UV index buffer length.
    #[error("uv set {set} face counts sum to {declared} but {actual} indices are present")]
    UvIndexCount {
        /// UV set index.
        set: usize,
        /// Sum of UV face counts.
        declared: usize,
        /// Actual UV index buffer length.
        actual: usize,
    },
    /// A face references a UV coordinate past the end of its set.
    #[error("uv set {set} face {face} references uv {index} but only {coord_count} exist")]
    UvIndexOutOfRange {
        /// UV set index.
        set: usize,
        /// Face index.
        face: usize,
        /// Offending UV index.
        index: u32,
        /// Number of UV coordinates in the set.
        coord_count: usize,
    },
    /// Per-face material indices are present but not one per face.
    #[error("{len} face material indices for {faces} faces")]
    FaceMaterialCount {
        /// Number of material indices.
        len: usize,
        /// Number of faces.
        faces: usize,
    },
    /// A hole relation is present but not one entry per face.
    #[error("{len} hole lists for {faces} faces")]
    HoleCount {
        /// Number of hole lists.
        len: usize,
        /// Number of faces.
        faces: usize,
    },
    /// The hole relation is malformed.
    #[error("face {face} lists invalid hole {hole}")]
    HoleRelation {
        /// Encircling face.
        face: usize,
        /// Offending hole face index.
        hole: u32,
    },
}

mod attributes;
mod canon;
mod material;
mod port;
mod reports;
mod scene;
mod transform;
mod types;
mod uri;

pub use attributes::{AttrValue, AttributeMap};
pub use canon::{canonical_bits, weld_cell};
pub use material::{Material, MaterialValue, PixelFormat, Texture, TextureImage};
pub use port::{
    AssetRegistrar, Callbacks, EncoderSink, GeometryBatch, ShapeSource, ShapeStream,
    TraversalError,
};
pub use reports::Reports;
pub use scene::{GeneratedScene, GeneratedTree, GenerationFailure};
pub use transform::Transform;
pub use types::{
    FaceRuns, Geometry, InitialShape, Mesh, ReportEmission, ReportValue, Shape, ShapeId, UvSet,
};
pub use uri::{Uri, UriError, UriScheme};
