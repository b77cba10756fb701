// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Instance preparation.
//!
//! [`InstancePreparator`] pools shape geometry and materials by content
//! identity, then turns everything added since the last fetch into
//! renderer-ready [`Instance`]s:
//!
//! 1. expand faces into corners, baking the transform unless instancing
//! 2. apply the vertex normal policy and normalize normals
//! 3. triangulate faces without holes
//! 4. apply the hole policy
//! 5. group faces by material, across meshes when merging by material
//! 6. weld and re-index each group, pruning unused attribute data
//!
//! Finalized geometry is cached by source identity, materials, flags and
//! baked transform, so repeated shapes share one `Arc<Geometry>`. The pools
//! persist across fetches until [`InstancePreparator::clear`].

mod assembler;
mod cleanup;
mod flags;
mod holes;
mod identity;
mod polygon;
mod triangulate;

use std::collections::HashMap;
use std::sync::Arc;

use strata_cas::BlobHash;
use strata_geom_port::{
    AttributeMap, Geometry, InitialShape, Material, MeshError, Reports, Shape, ShapeId, Transform,
};
use thiserror::Error;
use tracing::{debug, instrument};

pub use flags::{HoleProcessing, IndexSharing, PreparationFlags, VertexNormals};

use assembler::MeshAssembler;
use polygon::Polygon;

/// Malformed shape data. These are generator bugs and abort the encode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    /// A mesh violates its index or count invariants.
    #[error("shape {shape:?} mesh {mesh}: {source}")]
    Mesh {
        /// Offending shape; `None` for an initial shape.
        shape: Option<ShapeId>,
        /// Mesh index within the shape geometry.
        mesh: usize,
        /// Violated invariant.
        #[source]
        source: MeshError,
    },
    /// A face references a material the shape does not have.
    #[error("shape {shape:?} mesh {mesh} face {face} uses material {index} of {count}")]
    MaterialIndex {
        /// Offending shape; `None` for an initial shape.
        shape: Option<ShapeId>,
        /// Mesh index within the shape geometry.
        mesh: usize,
        /// Face index within the mesh.
        face: usize,
        /// Referenced material.
        index: u32,
        /// Materials available.
        count: usize,
    },
}

/// Finalized, encode-ready geometry with its materials and transform.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    /// Initial shape the instance was generated from.
    pub initial_shape_index: usize,
    /// Originating shape; `None` for the unprocessed initial shape.
    pub shape_id: Option<ShapeId>,
    /// Finalized meshes, each with exactly one material.
    pub geometry: Arc<Geometry>,
    /// One material per mesh of `geometry`.
    pub materials: Vec<Arc<Material>>,
    /// Local-to-world transform; identity when the transform was baked.
    pub transform: Transform,
    /// Attributes of the initial shape.
    pub attributes: Arc<AttributeMap>,
    /// Per-shape reports, when the reporting strategy yields them.
    pub reports: Option<Reports>,
}

#[derive(Debug)]
struct Pending {
    initial_shape_index: usize,
    shape_id: Option<ShapeId>,
    geometry: Arc<Geometry>,
    geometry_hash: BlobHash,
    materials: Vec<Arc<Material>>,
    material_hashes: Vec<BlobHash>,
    transform: Transform,
    attributes: Arc<AttributeMap>,
    reports: Option<Reports>,
}

#[derive(Debug)]
struct Finalized {
    geometry: Arc<Geometry>,
    materials: Vec<Arc<Material>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum GroupKey {
    Material(BlobHash),
    MeshMaterial(usize, usize),
}

/// Accumulates shapes and emits finalized instances.
///
/// One preparator serves one encoder; it is not internally synchronized.
#[derive(Debug, Default)]
pub struct InstancePreparator {
    geometries: HashMap<BlobHash, Arc<Geometry>>,
    materials: HashMap<BlobHash, Arc<Material>>,
    finalized: HashMap<BlobHash, Arc<Finalized>>,
    pending: Vec<Pending>,
}

impl InstancePreparator {
    /// Empty preparator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a generated shape.
    ///
    /// Shapes without materials use one empty default material.
    pub fn add(
        &mut self,
        initial_shape_index: usize,
        shape: &Shape,
        attributes: &Arc<AttributeMap>,
        reports: Option<Reports>,
    ) -> Result<(), PrepareError> {
        self.push(
            initial_shape_index,
            Some(shape.id),
            &shape.geometry,
            &shape.materials,
            shape.transform,
            Arc::clone(attributes),
            reports,
        )
    }

    /// Queue the unprocessed geometry of an initial shape.
    ///
    /// Used when generation failed; every mesh gets the default material.
    pub fn add_initial_shape(
        &mut self,
        initial_shape_index: usize,
        initial: &InitialShape,
    ) -> Result<(), PrepareError> {
        self.push(
            initial_shape_index,
            None,
            &initial.geometry,
            &[],
            Transform::IDENTITY,
            Arc::new(initial.attributes.clone()),
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        initial_shape_index: usize,
        shape_id: Option<ShapeId>,
        geometry: &Geometry,
        materials: &[Material],
        transform: Transform,
        attributes: Arc<AttributeMap>,
        reports: Option<Reports>,
    ) -> Result<(), PrepareError> {
        validate(shape_id, geometry, materials.len().max(1))?;

        let geometry_hash = identity::geometry_hash(geometry);
        let geometry = Arc::clone(
            self.geometries
                .entry(geometry_hash)
                .or_insert_with(|| Arc::new(geometry.clone())),
        );
        let default_material = [Material::default()];
        let materials = if materials.is_empty() {
            &default_material[..]
        } else {
            materials
        };
        let (materials, material_hashes) = materials
            .iter()
            .map(|m| {
                let hash = identity::material_hash(m);
                let pooled = self
                    .materials
                    .entry(hash)
                    .or_insert_with(|| Arc::new(m.clone()));
                (Arc::clone(pooled), hash)
            })
            .unzip();

        self.pending.push(Pending {
            initial_shape_index,
            shape_id,
            geometry,
            geometry_hash,
            materials,
            material_hashes,
            transform,
            attributes,
            reports,
        });
        Ok(())
    }

    /// Finalize everything queued since the last fetch.
    ///
    /// Instances keep queue order. Instances without faces are dropped.
    #[instrument(skip_all, fields(pending = self.pending.len()))]
    pub fn fetch_finalized_instances(&mut self, flags: &PreparationFlags) -> Vec<Instance> {
        let pending = std::mem::take(&mut self.pending);
        let mut instances = Vec::with_capacity(pending.len());
        for entry in pending {
            let bake = (!flags.instancing && !entry.transform.is_identity())
                .then_some(entry.transform);
            let key = identity::finalize_key(
                &entry.geometry_hash,
                &entry.material_hashes,
                flags,
                bake.as_ref(),
            );
            let finalized = match self.finalized.get(&key) {
                Some(hit) => Arc::clone(hit),
                None => {
                    let built = Arc::new(finalize(&entry, flags, bake.as_ref()));
                    self.finalized.insert(key, Arc::clone(&built));
                    built
                }
            };
            if finalized.geometry.face_count() == 0 {
                debug!(shape = ?entry.shape_id, "dropping instance without faces");
                continue;
            }
            instances.push(Instance {
                initial_shape_index: entry.initial_shape_index,
                shape_id: entry.shape_id,
                geometry: Arc::clone(&finalized.geometry),
                materials: finalized.materials.clone(),
                transform: if flags.instancing {
                    entry.transform
                } else {
                    Transform::IDENTITY
                },
                attributes: entry.attributes,
                reports: entry.reports,
            });
        }
        instances
    }

    /// Drop queued shapes without finalizing them.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Drop queued shapes and every pool.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.geometries.clear();
        self.materials.clear();
        self.finalized.clear();
    }

    /// Shapes queued since the last fetch.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Distinct source geometries pooled.
    pub fn geometry_pool_len(&self) -> usize {
        self.geometries.len()
    }

    /// Distinct materials pooled.
    pub fn material_pool_len(&self) -> usize {
        self.materials.len()
    }

    /// Distinct finalized geometries cached.
    pub fn finalized_len(&self) -> usize {
        self.finalized.len()
    }
}

fn validate(shape: Option<ShapeId>, geometry: &Geometry, count: usize) -> Result<(), PrepareError> {
    for (mesh, m) in geometry.meshes.iter().enumerate() {
        m.validate()
            .map_err(|source| PrepareError::Mesh { shape, mesh, source })?;
        if let Some((face, &index)) = m
            .face_materials
            .iter()
            .enumerate()
            .find(|&(_, &i)| i as usize >= count)
        {
            return Err(PrepareError::MaterialIndex {
                shape,
                mesh,
                face,
                index,
                count,
            });
        }
    }
    Ok(())
}

fn finalize(entry: &Pending, flags: &PreparationFlags, bake: Option<&Transform>) -> Finalized {
    let mut groups: Vec<(GroupKey, usize, Vec<Polygon>)> = Vec::new();
    let mut source_offset = 0;
    for (m, mesh) in entry.geometry.meshes.iter().enumerate() {
        let mut polygons = polygon::expand(mesh, bake, source_offset);
        source_offset += mesh.vertex_count();

        cleanup::process_normals(&mut polygons, flags.vertex_normals);
        if flags.cleanup_vertex_normals {
            cleanup::normalize_normals(&mut polygons);
        }
        if flags.triangulate {
            polygons = polygons
                .into_iter()
                .flat_map(|p| {
                    if p.holes.is_empty() {
                        triangulate::triangulate(&p)
                    } else {
                        vec![p]
                    }
                })
                .collect();
        }
        polygons = holes::process(polygons, flags.hole_processing);

        for poly in polygons {
            let material = poly.material as usize;
            let key = if flags.merge_by_material {
                GroupKey::Material(entry.material_hashes[material])
            } else {
                GroupKey::MeshMaterial(m, material)
            };
            let sets = mesh.uv_set_count();
            match groups.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, group_sets, polys)) => {
                    *group_sets = (*group_sets).max(sets);
                    polys.push(poly);
                }
                None => groups.push((key, sets, vec![poly])),
            }
        }
    }

    let mut meshes = Vec::with_capacity(groups.len());
    let mut materials = Vec::with_capacity(groups.len());
    for (key, sets, polys) in groups {
        let mut asm = MeshAssembler::new(flags, sets);
        polys.iter().for_each(|p| asm.push_polygon(p));
        let mesh = asm.finish();
        if mesh.face_count() == 0 {
            continue;
        }
        let material = match key {
            GroupKey::Material(hash) => entry
                .material_hashes
                .iter()
                .position(|h| *h == hash)
                .unwrap_or(0),
            GroupKey::MeshMaterial(_, index) => index,
        };
        meshes.push(mesh);
        materials.push(Arc::clone(&entry.materials[material]));
    }
    Finalized {
        geometry: Arc::new(Geometry::new(meshes)),
        materials,
    }
}
