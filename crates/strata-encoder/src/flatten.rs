// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Flattening of finalized instances into host buffers.
//!
//! One [`GeometryBatch`] per instance. Meshes are concatenated: face indices
//! are offset by the running vertex count, UV indices by the running
//! per-channel coordinate count, and `face_ranges` records where each mesh
//! starts. Buffers are owned by the flattener and reused between instances.

use strata_geom_port::{AttributeMap, GeometryBatch, Mesh, UvSet};
use tracing::debug;

use crate::marshal::{convert_reports, scan_valid_textures, MaterialMarshaler, TexturePaths};
use crate::prepare::Instance;

/// Reusable scratch buffers backing emitted batches.
#[derive(Debug, Default)]
pub struct GeometryFlattener {
    coords: Vec<f64>,
    normals: Vec<f64>,
    face_counts: Vec<u32>,
    face_indices: Vec<u32>,
    uv_coords: Vec<Vec<f64>>,
    uv_counts: Vec<Vec<u32>>,
    uv_indices: Vec<Vec<u32>>,
    face_ranges: Vec<u32>,
    materials: Vec<AttributeMap>,
    reports: Option<AttributeMap>,
}

impl GeometryFlattener {
    /// Empty flattener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten `instance` into a batch borrowing the flattener's buffers.
    ///
    /// With `emit_materials` off the batch carries no UV channels and no
    /// material maps. Textures are resolved through `textures`.
    pub fn convert<'s>(
        &'s mut self,
        instance: &'s Instance,
        instance_index: usize,
        emit_materials: bool,
        textures: &mut dyn TexturePaths,
    ) -> GeometryBatch<'s> {
        let meshes = &instance.geometry.meshes;
        self.reset();

        // scan
        let mut vertex_total = 0;
        let mut face_total = 0;
        let mut index_total = 0;
        let mut any_normals = false;
        let mut uv_sets = 0;
        for (mesh, material) in meshes.iter().zip(&instance.materials) {
            vertex_total += mesh.vertex_count();
            face_total += mesh.face_count();
            index_total += mesh.index_count();
            any_normals |= mesh.has_normals();
            if emit_materials {
                uv_sets = uv_sets
                    .max(mesh.uv_set_count())
                    .max(scan_valid_textures(material) as usize);
            }
        }
        self.coords.reserve(vertex_total * 3);
        if any_normals {
            self.normals.reserve(vertex_total * 3);
        }
        self.face_counts.reserve(face_total);
        self.face_indices.reserve(index_total);
        self.face_ranges.reserve(meshes.len() + 1);
        self.uv_coords.resize_with(uv_sets, Vec::new);
        self.uv_counts.resize_with(uv_sets, || Vec::with_capacity(face_total));
        self.uv_indices.resize_with(uv_sets, Vec::new);

        // fill
        let mut vertex_base = 0u32;
        let mut uv_bases = vec![0u32; uv_sets];
        for mesh in meshes {
            self.face_ranges.push(self.face_counts.len() as u32);
            self.coords.extend_from_slice(&mesh.vertex_coords);
            if any_normals {
                if mesh.has_normals() {
                    self.normals.extend_from_slice(&mesh.vertex_normals);
                } else {
                    self.normals
                        .resize(self.normals.len() + mesh.vertex_coords.len(), 0.0);
                }
            }
            self.face_counts.extend_from_slice(&mesh.face_vertex_counts);
            self.face_indices
                .extend(mesh.face_vertex_indices.iter().map(|&i| i + vertex_base));

            for (channel, base) in uv_bases.iter_mut().enumerate() {
                match channel_source(mesh, channel) {
                    Some(set) => {
                        self.uv_coords[channel].extend_from_slice(&set.coords);
                        self.uv_counts[channel].extend_from_slice(&set.face_counts);
                        self.uv_indices[channel]
                            .extend(set.indices.iter().map(|&i| i + *base));
                        *base += set.coord_count() as u32;
                    }
                    None => {
                        let counts = &mut self.uv_counts[channel];
                        counts.resize(counts.len() + mesh.face_count(), 0);
                    }
                }
            }
            vertex_base += mesh.vertex_count() as u32;
        }
        self.face_ranges.push(self.face_counts.len() as u32);

        if emit_materials {
            let mut marshaler = MaterialMarshaler::new(textures);
            self.materials
                .extend(instance.materials.iter().map(|m| marshaler.convert_all(m)));
        }
        self.reports = instance.reports.as_ref().map(convert_reports);

        debug!(
            instance = instance_index,
            meshes = meshes.len(),
            vertices = vertex_total,
            faces = face_total,
            uv_sets,
            "flattened instance"
        );

        GeometryBatch {
            initial_shape_index: instance.initial_shape_index,
            instance_index,
            shape_id: instance.shape_id,
            transform: &instance.transform,
            vertex_coords: &self.coords,
            normals: &self.normals,
            face_counts: &self.face_counts,
            face_indices: &self.face_indices,
            uv_coords: &self.uv_coords,
            uv_counts: &self.uv_counts,
            uv_indices: &self.uv_indices,
            face_ranges: &self.face_ranges,
            materials: &self.materials,
            reports: self.reports.as_ref(),
        }
    }

    fn reset(&mut self) {
        self.coords.clear();
        self.normals.clear();
        self.face_counts.clear();
        self.face_indices.clear();
        self.uv_coords.clear();
        self.uv_counts.clear();
        self.uv_indices.clear();
        self.face_ranges.clear();
        self.materials.clear();
        self.reports = None;
    }
}

/// UV set feeding `channel` of `mesh`: its own, else its channel 0.
fn channel_source(mesh: &Mesh, channel: usize) -> Option<&UvSet> {
    mesh.uv_sets.get(channel).or_else(|| mesh.uv_sets.first())
}
