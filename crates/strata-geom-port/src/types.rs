// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core geometry types for the encoder port contract.
//!
//! These types are pure domain objects. Meshes are polygon soups stored as
//! flat buffers; faces are runs in a shared index buffer delimited by
//! per-face counts.

use crate::{AttributeMap, Material, MeshError, Transform};

/// Identifier of a shape inside one generated shape tree.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeId(pub u32);

/// One independent layer of texture coordinates.
///
/// `face_counts[f]` is either `0` (face has no UVs in this set) or the face's
/// vertex count. `indices` holds the per-face runs into `coords` (pairs).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct UvSet {
    /// Flat `(u, v)` pairs.
    pub coords: Vec<f64>,
    /// UV index count per face.
    pub face_counts: Vec<u32>,
    /// Concatenated per-face UV index runs.
    pub indices: Vec<u32>,
}

impl UvSet {
    /// Number of `(u, v)` pairs.
    pub fn coord_count(&self) -> usize {
        self.coords.len() / 2
    }

    /// Iterate the per-face UV index runs.
    pub fn faces(&self) -> FaceRuns<'_> {
        FaceRuns::new(&self.face_counts, &self.indices)
    }
}

/// Read-only polygon soup.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct Mesh {
    /// Flat `(x, y, z)` triplets.
    pub vertex_coords: Vec<f64>,
    /// Flat normal triplets, one per vertex, or empty.
    pub vertex_normals: Vec<f64>,
    /// Vertex count per face.
    pub face_vertex_counts: Vec<u32>,
    /// Concatenated per-face vertex index runs.
    pub face_vertex_indices: Vec<u32>,
    /// UV channels; channel `i` is independent of channel `j`.
    pub uv_sets: Vec<UvSet>,
    /// Material index per face (into the owning shape's material list), or
    /// empty when every face uses material `0`.
    pub face_materials: Vec<u32>,
    /// For each face, the faces that are holes inside it. Empty when the mesh
    /// carries no hole relation.
    pub face_holes: Vec<Vec<u32>>,
}

impl Mesh {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_coords.len() / 3
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// Total number of face-vertex indices.
    pub fn index_count(&self) -> usize {
        self.face_vertex_indices.len()
    }

    /// Returns `true` if per-vertex normals are present.
    pub fn has_normals(&self) -> bool {
        !self.vertex_normals.is_empty()
    }

    /// Number of UV channels.
    pub fn uv_set_count(&self) -> usize {
        self.uv_sets.len()
    }

    /// Iterate the per-face vertex index runs.
    pub fn faces(&self) -> FaceRuns<'_> {
        FaceRuns::new(&self.face_vertex_counts, &self.face_vertex_indices)
    }

    /// Start offset of every face in the index buffer, plus the total.
    pub fn face_offsets(&self) -> Vec<usize> {
        prefix_offsets(&self.face_vertex_counts)
    }

    /// Material index of `face`.
    pub fn face_material(&self, face: usize) -> u32 {
        self.face_materials.get(face).copied().unwrap_or(0)
    }

    /// Holes encircled by `face`.
    pub fn holes_of(&self, face: usize) -> &[u32] {
        self.face_holes.get(face).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if any face encircles a hole.
    pub fn has_holes(&self) -> bool {
        self.face_holes.iter().any(|h| !h.is_empty())
    }

    /// Check every index and count invariant.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertex_coords.len() % 3 != 0 {
            return Err(MeshError::CoordinateArity {
                len: self.vertex_coords.len(),
                arity: 3,
            });
        }
        if self.has_normals() && self.vertex_normals.len() != self.vertex_coords.len() {
            return Err(MeshError::NormalCount {
                normals: self.vertex_normals.len(),
                coords: self.vertex_coords.len(),
            });
        }
        let declared = sum_counts(&self.face_vertex_counts);
        if declared != self.face_vertex_indices.len() {
            return Err(MeshError::IndexCount {
                declared,
                actual: self.face_vertex_indices.len(),
            });
        }
        let vertex_count = self.vertex_count();
        for (face, run) in self.faces().enumerate() {
            if let Some(&index) = run.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::VertexIndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        for (set, uv) in self.uv_sets.iter().enumerate() {
            self.validate_uv_set(set, uv)?;
        }
        let faces = self.face_count();
        if !self.face_materials.is_empty() && self.face_materials.len() != faces {
            return Err(MeshError::FaceMaterialCount {
                len: self.face_materials.len(),
                faces,
            });
        }
        if !self.face_holes.is_empty() && self.face_holes.len() != faces {
            return Err(MeshError::HoleCount {
                len: self.face_holes.len(),
                faces,
            });
        }
        for (face, holes) in self.face_holes.iter().enumerate() {
            if let Some(&hole) = holes
                .iter()
                .find(|&&h| h as usize >= faces || h as usize == face)
            {
                return Err(MeshError::HoleRelation { face, hole });
            }
        }
        Ok(())
    }

    fn validate_uv_set(&self, set: usize, uv: &UvSet) -> Result<(), MeshError> {
        if uv.coords.len() % 2 != 0 {
            return Err(MeshError::CoordinateArity {
                len: uv.coords.len(),
                arity: 2,
            });
        }
        if uv.face_counts.len() != self.face_count() {
            return Err(MeshError::UvFaceCount {
                set,
                counts: uv.face_counts.len(),
                faces: self.face_count(),
            });
        }
        for (face, (&uvs, &vertices)) in uv
            .face_counts
            .iter()
            .zip(&self.face_vertex_counts)
            .enumerate()
        {
            if uvs != 0 && uvs != vertices {
                return Err(MeshError::UvCornerCount {
                    set,
                    face,
                    uvs,
                    vertices,
                });
            }
        }
        let declared = sum_counts(&uv.face_counts);
        if declared != uv.indices.len() {
            return Err(MeshError::UvIndexCount {
                set,
                declared,
                actual: uv.indices.len(),
            });
        }
        let coord_count = uv.coord_count();
        for (face, run) in uv.faces().enumerate() {
            if let Some(&index) = run.iter().find(|&&i| i as usize >= coord_count) {
                return Err(MeshError::UvIndexOutOfRange {
                    set,
                    face,
                    index,
                    coord_count,
                });
            }
        }
        Ok(())
    }
}

/// Iterator over per-face runs of a counts/indices buffer pair.
#[derive(Clone, Debug)]
pub struct FaceRuns<'a> {
    counts: core::slice::Iter<'a, u32>,
    rest: &'a [u32],
}

impl<'a> FaceRuns<'a> {
    fn new(counts: &'a [u32], indices: &'a [u32]) -> Self {
        Self {
            counts: counts.iter(),
            rest: indices,
        }
    }
}

impl<'a> Iterator for FaceRuns<'a> {
    type Item = &'a [u32];

    fn next(&mut self) -> Option<Self::Item> {
        let count = (*self.counts.next()? as usize).min(self.rest.len());
        let (run, rest) = self.rest.split_at(count);
        self.rest = rest;
        Some(run)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.counts.size_hint()
    }
}

fn sum_counts(counts: &[u32]) -> usize {
    counts.iter().map(|&c| c as usize).sum()
}

fn prefix_offsets(counts: &[u32]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut acc = 0usize;
    offsets.push(acc);
    for &c in counts {
        acc += c as usize;
        offsets.push(acc);
    }
    offsets
}

/// An ordered list of meshes.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Geometry {
    /// Meshes in emission order.
    pub meshes: Vec<Mesh>,
}

impl Geometry {
    /// Wrap a mesh list.
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self { meshes }
    }

    /// Total face count over all meshes.
    pub fn face_count(&self) -> usize {
        self.meshes.iter().map(Mesh::face_count).sum()
    }

    /// Total vertex count over all meshes.
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    /// Validate every mesh.
    pub fn validate(&self) -> Result<(), MeshError> {
        self.meshes.iter().try_for_each(Mesh::validate)
    }
}

/// A single report value emitted by a shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum ReportValue {
    /// Boolean report.
    Bool(bool),
    /// Numeric report.
    Float(f64),
    /// String report.
    String(String),
}

/// A keyed report value, in emission order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportEmission {
    /// Report name.
    pub key: String,
    /// Emitted value.
    pub value: ReportValue,
}

impl ReportEmission {
    /// Create an emission.
    pub fn new(key: impl Into<String>, value: ReportValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Node of a generated shape tree.
///
/// The tree is a parent-pointer graph: shapes know their parent, never their
/// children.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Shape {
    /// Unique id within the tree.
    pub id: ShapeId,
    /// Parent id; `None` for the root.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parent: Option<ShapeId>,
    /// Shape geometry.
    #[cfg_attr(feature = "serde", serde(default))]
    pub geometry: Geometry,
    /// Materials referenced by the meshes' per-face material indices.
    #[cfg_attr(feature = "serde", serde(default))]
    pub materials: Vec<Material>,
    /// Local-to-world transform.
    #[cfg_attr(feature = "serde", serde(default))]
    pub transform: Transform,
    /// Report emissions in generation order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reports: Vec<ReportEmission>,
    /// Errors raised while generating this shape.
    #[cfg_attr(feature = "serde", serde(default))]
    pub errors: Vec<String>,
}

impl Shape {
    /// Create an empty shape.
    pub fn new(id: ShapeId, parent: Option<ShapeId>) -> Self {
        Self {
            id,
            parent,
            geometry: Geometry::default(),
            materials: Vec::new(),
            transform: Transform::IDENTITY,
            reports: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Material at `index`, if present.
    pub fn material(&self, index: u32) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    /// Returns `true` for the tree root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The root input geometry of one generate call.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct InitialShape {
    /// Display name.
    pub name: String,
    /// Unprocessed input geometry.
    pub geometry: Geometry,
    /// Rule attributes the shape was generated with.
    pub attributes: AttributeMap,
}
