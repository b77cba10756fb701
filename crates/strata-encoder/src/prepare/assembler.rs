// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Re-indexing of finalized polygons into a compact [`Mesh`].
//!
//! Corners are welded through hash keys. Positions weld by source vertex, or
//! by quantized position when vertex merging is on; normals and UVs weld by
//! quantized value when their cleanup is on and by exact bits otherwise.

use std::collections::HashMap;

use strata_geom_port::{weld_cell, Mesh, UvSet};

use super::cleanup::face_normal;
use super::flags::{IndexSharing, PreparationFlags};
use super::polygon::{Corner, Polygon};

type Key3 = [i64; 3];
type Key2 = [i64; 2];

#[derive(Clone, PartialEq, Eq, Hash)]
enum PosKey {
    Source(usize),
    Welded(Key3),
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct VertexKey {
    pos: PosKey,
    normal: Option<Key3>,
    // shared indexing only
    uvs: Vec<Option<Key2>>,
}

/// Builds one mesh from polygons sharing a material.
pub(crate) struct MeshAssembler {
    sharing: IndexSharing,
    pos_tolerance: Option<f64>,
    normal_tolerance: Option<f64>,
    uv_tolerance: Option<f64>,
    sets: usize,
    mesh: Mesh,
    vertices: HashMap<VertexKey, u32>,
    uv_cells: Vec<HashMap<Key2, u32>>,
    any_normals: bool,
}

impl MeshAssembler {
    pub fn new(flags: &PreparationFlags, sets: usize) -> Self {
        let mesh = Mesh {
            uv_sets: vec![UvSet::default(); sets],
            ..Mesh::default()
        };
        Self {
            sharing: flags.index_sharing,
            pos_tolerance: flags.merge_vertices.then_some(flags.merge_tolerance),
            normal_tolerance: flags.cleanup_vertex_normals.then_some(flags.normal_tolerance),
            uv_tolerance: flags.cleanup_uvs.then_some(flags.uv_tolerance),
            sets,
            mesh,
            vertices: HashMap::new(),
            uv_cells: vec![HashMap::new(); sets],
            any_normals: false,
        }
    }

    /// Append a polygon; its holes become faces recorded in the hole relation.
    pub fn push_polygon(&mut self, poly: &Polygon) {
        let normal = face_normal(&poly.corners);
        let face = self.push_face(&poly.corners, normal);
        if poly.holes.is_empty() {
            return;
        }
        let mut holes = Vec::with_capacity(poly.holes.len());
        for ring in &poly.holes {
            holes.push(self.push_face(ring, normal));
        }
        self.mesh.face_holes.resize(self.mesh.face_count(), Vec::new());
        self.mesh.face_holes[face as usize] = holes;
    }

    fn push_face(&mut self, corners: &[Corner], face_normal: [f64; 3]) -> u32 {
        let face = self.mesh.face_count() as u32;
        let present: Vec<bool> = (0..self.sets)
            .map(|s| corners.iter().any(|c| c.uvs.get(s).is_some_and(Option::is_some)))
            .collect();
        let mut indices = Vec::with_capacity(corners.len());
        for c in corners {
            indices.push(self.vertex(c, face_normal, &present));
        }
        self.mesh.face_vertex_counts.push(corners.len() as u32);
        self.mesh.face_vertex_indices.extend_from_slice(&indices);

        for (s, &has) in present.iter().enumerate() {
            let count = if has { corners.len() as u32 } else { 0 };
            self.mesh.uv_sets[s].face_counts.push(count);
            if !has {
                continue;
            }
            match self.sharing {
                IndexSharing::SameForAllVertexAttributes => {
                    self.mesh.uv_sets[s].indices.extend_from_slice(&indices);
                }
                IndexSharing::Separate => {
                    for c in corners {
                        let uv = corner_uv(c, s);
                        let index = self.uv(s, uv);
                        self.mesh.uv_sets[s].indices.push(index);
                    }
                }
            }
        }
        // keep an existing hole relation aligned with the faces
        if !self.mesh.face_holes.is_empty() {
            self.mesh.face_holes.push(Vec::new());
        }
        face
    }

    fn vertex(&mut self, c: &Corner, face_normal: [f64; 3], present: &[bool]) -> u32 {
        let pos = match self.pos_tolerance {
            Some(t) => PosKey::Welded(c.pos.map(|x| weld_cell(x, Some(t)))),
            None => PosKey::Source(c.source),
        };
        let shared = self.sharing == IndexSharing::SameForAllVertexAttributes;
        let key = VertexKey {
            pos,
            normal: c.normal.map(|n| n.map(|x| weld_cell(x, self.normal_tolerance))),
            uvs: if shared {
                present
                    .iter()
                    .enumerate()
                    .map(|(s, &has)| {
                        has.then(|| corner_uv(c, s).map(|x| weld_cell(x, self.uv_tolerance)))
                    })
                    .collect()
            } else {
                Vec::new()
            },
        };
        if let Some(&index) = self.vertices.get(&key) {
            return index;
        }
        let index = self.mesh.vertex_count() as u32;
        self.mesh.vertex_coords.extend_from_slice(&c.pos);
        self.any_normals |= c.normal.is_some();
        self.mesh
            .vertex_normals
            .extend_from_slice(&c.normal.unwrap_or(face_normal));
        if shared {
            for (s, set) in self.mesh.uv_sets.iter_mut().enumerate() {
                set.coords.extend_from_slice(&corner_uv(c, s));
            }
        }
        self.vertices.insert(key, index);
        index
    }

    fn uv(&mut self, set: usize, uv: [f64; 2]) -> u32 {
        let key = uv.map(|x| weld_cell(x, self.uv_tolerance));
        let coords = &mut self.mesh.uv_sets[set].coords;
        *self.uv_cells[set].entry(key).or_insert_with(|| {
            let index = (coords.len() / 2) as u32;
            coords.extend_from_slice(&uv);
            index
        })
    }

    /// Finished mesh with unused attribute data pruned.
    pub fn finish(mut self) -> Mesh {
        let mesh = &mut self.mesh;
        if !self.any_normals {
            mesh.vertex_normals.clear();
        }
        for set in &mut mesh.uv_sets {
            if set.face_counts.iter().all(|&c| c == 0) {
                set.coords.clear();
                set.indices.clear();
            }
        }
        while mesh
            .uv_sets
            .last()
            .is_some_and(|s| s.face_counts.iter().all(|&c| c == 0))
        {
            mesh.uv_sets.pop();
        }
        if !mesh.has_holes() {
            mesh.face_holes.clear();
        }
        self.mesh
    }
}

fn corner_uv(c: &Corner, set: usize) -> [f64; 2] {
    c.uvs.get(set).copied().flatten().unwrap_or([0.0, 0.0])
}
