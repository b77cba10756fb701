// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-corner working representation used during finalization.
//!
//! Source meshes index shared buffers; finalization needs to split, reorder
//! and re-weld faces, so every face is first expanded into owned corners.

use strata_geom_port::{Mesh, Transform};

/// One face corner with every attribute resolved.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Corner {
    pub pos: [f64; 3],
    pub normal: Option<[f64; 3]>,
    /// One entry per UV set; `None` where the face has no UVs in that set.
    pub uvs: Vec<Option<[f64; 2]>>,
    /// Source vertex, offset so ids stay unique across meshes of a shape.
    pub source: usize,
}

/// A face ring plus the rings of the holes it encircles.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Polygon {
    pub corners: Vec<Corner>,
    pub holes: Vec<Vec<Corner>>,
    pub material: u32,
}

impl Polygon {
    pub fn rings(&self) -> impl Iterator<Item = &Corner> {
        self.corners.iter().chain(self.holes.iter().flatten())
    }

    pub fn rings_mut(&mut self) -> impl Iterator<Item = &mut Corner> {
        self.corners.iter_mut().chain(self.holes.iter_mut().flatten())
    }
}

/// Expand `mesh` into polygons.
///
/// Faces that are holes of another face are attached to it and do not appear
/// at the top level. With `bake`, positions and normals are moved to world
/// space and mirrored transforms flip the winding.
pub(crate) fn expand(mesh: &Mesh, bake: Option<&Transform>, source_offset: usize) -> Vec<Polygon> {
    let sets = mesh.uv_set_count();
    let uv_offsets: Vec<Vec<usize>> = mesh
        .uv_sets
        .iter()
        .map(|set| prefix(&set.face_counts))
        .collect();
    let faces: Vec<&[u32]> = mesh.faces().collect();

    let ring = |face: usize| -> Vec<Corner> {
        faces[face]
            .iter()
            .enumerate()
            .map(|(corner, &v)| {
                let v = v as usize;
                let p = &mesh.vertex_coords[v * 3..v * 3 + 3];
                let n = mesh
                    .has_normals()
                    .then(|| [0, 1, 2].map(|i| mesh.vertex_normals[v * 3 + i]));
                let uvs = (0..sets)
                    .map(|s| {
                        let set = &mesh.uv_sets[s];
                        (set.face_counts[face] != 0).then(|| {
                            let i = set.indices[uv_offsets[s][face] + corner] as usize;
                            [set.coords[i * 2], set.coords[i * 2 + 1]]
                        })
                    })
                    .collect();
                Corner {
                    pos: [p[0], p[1], p[2]],
                    normal: n,
                    uvs,
                    source: source_offset + v,
                }
            })
            .collect()
    };

    let mut is_hole = vec![false; faces.len()];
    for holes in &mesh.face_holes {
        for &h in holes {
            is_hole[h as usize] = true;
        }
    }

    let mut polygons: Vec<Polygon> = (0..faces.len())
        .filter(|&f| !is_hole[f])
        .map(|f| Polygon {
            corners: ring(f),
            holes: mesh.holes_of(f).iter().map(|&h| ring(h as usize)).collect(),
            material: mesh.face_material(f),
        })
        .collect();

    if let Some(t) = bake {
        let mirrored = t.determinant() < 0.0;
        for poly in &mut polygons {
            for c in poly.rings_mut() {
                c.pos = t.transform_point(c.pos);
                c.normal = c.normal.map(|n| t.transform_normal(n));
            }
            if mirrored {
                poly.corners.reverse();
                poly.holes.iter_mut().for_each(|h| h.reverse());
            }
        }
    }
    polygons
}

fn prefix(counts: &[u32]) -> Vec<usize> {
    let mut acc = 0;
    counts
        .iter()
        .map(|&c| {
            let start = acc;
            acc += c as usize;
            start
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_geom_port::UvSet;

    fn two_faces_with_hole() -> Mesh {
        Mesh {
            vertex_coords: vec![
                0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 4.0, 0.0, 4.0, 0.0, 0.0, 4.0, //
                1.0, 0.0, 1.0, 1.0, 0.0, 2.0, 2.0, 0.0, 2.0,
            ],
            face_vertex_counts: vec![4, 3],
            face_vertex_indices: vec![0, 3, 2, 1, 4, 5, 6],
            uv_sets: vec![UvSet {
                coords: vec![0.0, 0.0, 1.0, 1.0],
                face_counts: vec![4, 0],
                indices: vec![0, 1, 1, 0],
            }],
            face_holes: vec![vec![1], vec![]],
            ..Mesh::default()
        }
    }

    #[test]
    fn holes_attach_to_their_face() {
        let polys = expand(&two_faces_with_hole(), None, 10);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].holes.len(), 1);
        assert_eq!(polys[0].holes[0].len(), 3);
        assert_eq!(polys[0].corners[1].source, 13);
        assert_eq!(polys[0].corners[1].uvs, vec![Some([1.0, 1.0])]);
        assert_eq!(polys[0].holes[0][0].uvs, vec![None]);
    }

    #[test]
    fn mirrored_bake_flips_winding() {
        let mesh = two_faces_with_hole();
        let t = Transform::scale(-1.0, 1.0, 1.0);
        let polys = expand(&mesh, Some(&t), 0);
        let sources: Vec<usize> = polys[0].corners.iter().map(|c| c.source).collect();
        assert_eq!(sources, vec![1, 2, 3, 0]);
        assert_eq!(polys[0].corners[0].pos, [-4.0, 0.0, 0.0]);
    }
}
