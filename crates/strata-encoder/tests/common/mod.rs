// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code, clippy::unwrap_used)]

use strata_encoder::{EncodeOptions, Encoder, RecordedBatch, RecordingSink};
use strata_geom_port::{
    AttributeMap, Geometry, GeneratedScene, GeneratedTree, InitialShape, Material, Mesh, Shape,
    ShapeId, UvSet,
};

/// Unit quad in the z = 0 plane starting at `x`.
pub fn quad(x: f64) -> Mesh {
    Mesh {
        vertex_coords: vec![x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x + 1.0, 1.0, 0.0, x, 1.0, 0.0],
        face_vertex_counts: vec![4],
        face_vertex_indices: vec![0, 1, 2, 3],
        ..Mesh::default()
    }
}

/// [`quad`] with one UV set covering the unit square.
pub fn textured_quad(x: f64) -> Mesh {
    let mut mesh = quad(x);
    mesh.uv_sets.push(UvSet {
        coords: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        face_counts: vec![4],
        indices: vec![0, 1, 2, 3],
    });
    mesh
}

pub fn shape(id: u32, parent: Option<u32>, meshes: Vec<Mesh>, materials: Vec<Material>) -> Shape {
    let mut s = Shape::new(ShapeId(id), parent.map(ShapeId));
    s.geometry = Geometry::new(meshes);
    s.materials = materials;
    s
}

pub fn initial(meshes: Vec<Mesh>) -> InitialShape {
    InitialShape {
        name: "lot".into(),
        geometry: Geometry::new(meshes),
        attributes: AttributeMap::new(),
    }
}

pub fn scene(shapes: Vec<Shape>) -> GeneratedScene {
    GeneratedScene::new(vec![GeneratedTree::new(initial(vec![quad(0.0)]), shapes)])
}

/// Encode every initial shape of `scene` into a fresh recording.
pub fn record(options: EncodeOptions, scene: &GeneratedScene) -> RecordingSink {
    let mut encoder = Encoder::new(options);
    let mut sink = RecordingSink::new();
    encoder.encode_all(scene, &mut sink, None).unwrap();
    sink
}

/// Structural invariants every emitted batch must satisfy.
pub fn assert_batch_invariants(batch: &RecordedBatch) {
    let faces = batch.face_counts.len();
    let vertices = batch.vertex_count();
    assert_eq!(batch.vertex_coords.len() % 3, 0);
    assert!(batch.normals.is_empty() || batch.normals.len() == batch.vertex_coords.len());

    let index_total: u32 = batch.face_counts.iter().sum();
    assert_eq!(index_total as usize, batch.face_indices.len());
    assert!(batch.face_indices.iter().all(|&i| (i as usize) < vertices));

    assert_eq!(batch.face_ranges.len(), batch.mesh_count() + 1);
    assert_eq!(batch.face_ranges.first().copied(), Some(0));
    assert!(batch.face_ranges.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(batch.face_ranges.last().copied(), Some(faces as u32));

    for channel in 0..batch.uv_set_count() {
        let counts = &batch.uv_counts[channel];
        assert_eq!(counts.len(), faces);
        assert!(counts
            .iter()
            .zip(&batch.face_counts)
            .all(|(&uv, &face)| uv == 0 || uv == face));
        let uv_total: u32 = counts.iter().sum();
        assert_eq!(uv_total as usize, batch.uv_indices[channel].len());
        let coords = batch.uv_coords[channel].len() / 2;
        assert!(batch.uv_indices[channel].iter().all(|&i| (i as usize) < coords));
    }
}
