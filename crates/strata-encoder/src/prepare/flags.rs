// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Preparation flags controlling instance finalization.

use serde::{Deserialize, Serialize};

/// What to do with per-vertex normals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VertexNormals {
    /// Keep whatever the generator produced.
    Pass,
    /// Faces without normals get their face normal on every corner.
    #[default]
    SetMissingToFaceNormals,
    /// Every corner gets its face normal.
    SetAllToFaceNormals,
}

/// What to do with faces that encircle holes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HoleProcessing {
    /// Triangulate the encircling face around its holes.
    #[default]
    TriangulateFacesWithHoles,
    /// Drop the holes and keep the encircling face.
    DeleteHoles,
    /// Emit holes as regular faces without a hole relation.
    ConvertHolesToFaces,
    /// Keep holes as faces and keep the hole relation.
    Pass,
}

/// How vertex attributes are indexed in finalized meshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexSharing {
    /// One index addresses position, normal and every UV set.
    #[default]
    SameForAllVertexAttributes,
    /// UV sets carry their own indices.
    Separate,
}

/// Finalization knobs. Defaults are the encoder's standard preparation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreparationFlags {
    /// Keep geometry in local space and share it between identical shapes.
    /// When off, shape transforms are baked into positions and normals.
    pub instancing: bool,
    /// Triangulate every face.
    pub triangulate: bool,
    /// Weld vertices closer than `merge_tolerance`.
    pub merge_vertices: bool,
    /// Weld distance for `merge_vertices`.
    pub merge_tolerance: f64,
    /// Weld UV coordinates closer than `uv_tolerance`.
    pub cleanup_uvs: bool,
    /// Weld distance for `cleanup_uvs`.
    pub uv_tolerance: f64,
    /// Normalize normals and weld ones closer than `normal_tolerance`.
    pub cleanup_vertex_normals: bool,
    /// Weld distance for `cleanup_vertex_normals`.
    pub normal_tolerance: f64,
    /// Normal generation policy.
    pub vertex_normals: VertexNormals,
    /// Hole policy.
    pub hole_processing: HoleProcessing,
    /// Index layout.
    pub index_sharing: IndexSharing,
    /// Merge meshes of a shape that share a material.
    pub merge_by_material: bool,
}

impl Default for PreparationFlags {
    fn default() -> Self {
        Self {
            instancing: false,
            triangulate: true,
            merge_vertices: false,
            merge_tolerance: 1e-4,
            cleanup_uvs: true,
            uv_tolerance: 1e-6,
            cleanup_vertex_normals: true,
            normal_tolerance: 1e-4,
            vertex_normals: VertexNormals::SetMissingToFaceNormals,
            hole_processing: HoleProcessing::TriangulateFacesWithHoles,
            index_sharing: IndexSharing::SameForAllVertexAttributes,
            merge_by_material: true,
        }
    }
}
