// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{assert_batch_invariants, initial, quad, record, scene, shape, textured_quad};
use strata_cas::{ArchiveCache, MemoryArchive};
use strata_encoder::{
    is_blacklisted, scan_valid_textures, AccumulationPolicy, EncodeOptions, Encoder,
    PreparationFlags, RecordingSink, ReportingStrategy,
};
use strata_geom_port::{
    AttrValue, GeneratedScene, GeneratedTree, Material, MaterialValue, Mesh, PixelFormat,
    ReportEmission, ReportValue, ShapeId, Texture, TextureImage, Transform, Uri, UriScheme,
};

fn with_texture(key: &str, texture: Texture) -> Material {
    Material::new("textured").with(key, MaterialValue::Texture(texture))
}

#[test]
fn materials_off_emits_no_uvs_and_no_maps() {
    let options = EncodeOptions {
        emit_materials: false,
        ..EncodeOptions::default()
    };
    let material = with_texture("diffuseMap", Texture::new(Uri::file("/tex/a.jpg")));
    let sink = record(
        options,
        &scene(vec![shape(0, None, vec![textured_quad(0.0)], vec![material])]),
    );
    assert_eq!(sink.batches.len(), 1);
    assert_eq!(sink.batches[0].uv_set_count(), 0);
    assert!(sink.batches[0].materials.is_empty());
    assert_batch_invariants(&sink.batches[0]);
}

#[test]
fn extra_channels_copy_channel_zero() {
    let material = Material::new("bumpy")
        .with("diffuseMap", MaterialValue::Texture(Texture::new(Uri::file("/tex/a.jpg"))))
        .with("bumpMap", MaterialValue::Texture(Texture::new(Uri::file("/tex/b.jpg"))));
    let sink = record(
        EncodeOptions::default(),
        &scene(vec![shape(0, None, vec![textured_quad(0.0)], vec![material])]),
    );
    let batch = &sink.batches[0];
    assert_eq!(batch.uv_set_count(), 2);
    assert_eq!(batch.uv_coords[1], batch.uv_coords[0]);
    assert_eq!(batch.uv_counts[1], batch.uv_counts[0]);
    assert_eq!(batch.uv_indices[1], batch.uv_indices[0]);
    assert_batch_invariants(batch);
}

#[test]
fn meshes_without_uvs_get_zero_counts() {
    let material = with_texture("diffuseMap", Texture::new(Uri::file("/tex/a.jpg")));
    let options = EncodeOptions {
        preparation: PreparationFlags {
            merge_by_material: false,
            ..PreparationFlags::default()
        },
        ..EncodeOptions::default()
    };
    let sink = record(
        options,
        &scene(vec![shape(
            0,
            None,
            vec![textured_quad(0.0), quad(2.0)],
            vec![material],
        )]),
    );
    let batch = &sink.batches[0];
    assert_eq!(batch.mesh_count(), 2);
    assert_eq!(batch.uv_set_count(), 1);
    assert_eq!(batch.uv_counts[0], vec![3, 3, 0, 0]);
    assert_batch_invariants(batch);
}

#[test]
fn face_range_table_tracks_meshes() {
    let red = Material::new("red").with("diffuseColor", MaterialValue::FloatArray(vec![1.0, 0.0, 0.0]));
    let blue = Material::new("blue").with("diffuseColor", MaterialValue::FloatArray(vec![0.0, 0.0, 1.0]));
    let mut mesh = quad(0.0);
    mesh.vertex_coords.extend([3.0, 0.0, 0.0, 4.0, 0.0, 0.0, 4.0, 1.0, 0.0]);
    mesh.face_vertex_counts.push(3);
    mesh.face_vertex_indices.extend([4, 5, 6]);
    mesh.face_materials = vec![1, 0];
    let sink = record(
        EncodeOptions::default(),
        &scene(vec![shape(0, None, vec![mesh], vec![red, blue])]),
    );
    let batch = &sink.batches[0];
    assert_eq!(batch.face_ranges, vec![0, 2, 3]);
    assert_eq!(batch.materials.len(), 2);
    assert_eq!(
        batch.materials[0].get("diffuseColor"),
        Some(&AttrValue::FloatArray(vec![0.0, 0.0, 1.0]))
    );
    assert_batch_invariants(batch);
}

#[test]
fn blacklisted_keys_never_reach_the_host() {
    let material = Material::new("cga")
        .with("color.r", MaterialValue::Float(1.0))
        .with("colormap", MaterialValue::String("brick.jpg".into()))
        .with("opacitymap.mode", MaterialValue::String("blend".into()))
        .with("bumpmap.su", MaterialValue::Float(2.0))
        .with("diffuseColor", MaterialValue::FloatArray(vec![1.0, 1.0, 1.0]))
        .with("opacity", MaterialValue::Float(0.5));
    let sink = record(
        EncodeOptions::default(),
        &scene(vec![shape(0, None, vec![quad(0.0)], vec![material])]),
    );
    let map = &sink.batches[0].materials[0];
    assert!(map.keys().all(|k| !is_blacklisted(k)));
    assert!(map.contains("diffuseColor"));
    assert_eq!(map.get_float("opacity"), Some(0.5));
    assert_eq!(map.len(), 2);
}

#[test]
fn faceless_geometry_produces_no_instance() {
    let empty = Mesh {
        vertex_coords: vec![0.0; 6],
        ..Mesh::default()
    };
    let sink = record(
        EncodeOptions::default(),
        &scene(vec![
            shape(0, None, vec![], vec![]),
            shape(1, Some(0), vec![empty.clone()], vec![]),
            shape(2, Some(0), vec![empty, quad(0.0)], vec![]),
        ]),
    );
    assert_eq!(sink.batches.len(), 1);
    assert_eq!(sink.batches[0].shape_id, Some(ShapeId(2)));
    assert_eq!(sink.batches[0].mesh_count(), 1);
}

#[test]
fn first_valid_diffuse_layer_needs_one_uv_set() {
    let material = Material::new("layers")
        .with(
            "diffuseMap",
            MaterialValue::TextureArray(vec![
                Texture::new(Uri::file("/tex/color.jpg")),
                Texture::invalid(Uri::file("/tex/dirt.jpg")),
            ]),
        )
        .with("bumpMap", MaterialValue::Texture(Texture::invalid(Uri::file("/tex/bump.jpg"))))
        .with("normalMap", MaterialValue::Texture(Texture::invalid(Uri::file("/tex/n.jpg"))));
    assert_eq!(scan_valid_textures(&material), 1);
}

#[test]
fn local_textures_pass_through_without_assets() {
    let material = with_texture("diffuseMap", Texture::new(Uri::file("/textures/brick.jpg")));
    let sink = record(
        EncodeOptions::default(),
        &scene(vec![shape(0, None, vec![textured_quad(0.0)], vec![material])]),
    );
    assert_eq!(
        sink.batches[0].materials[0].get_string("diffuseMap"),
        Some("/textures/brick.jpg")
    );
    assert!(sink.assets.is_empty());
}

#[test]
fn memory_textures_are_reencoded_and_registered() {
    let image = TextureImage {
        width: 2,
        height: 2,
        format: PixelFormat::Rgba8,
        pixels: vec![200; 16],
    };
    let texture = Texture::with_image(Uri::memory("7", "/wall.png"), image);
    let sink = record(
        EncodeOptions::default(),
        &scene(vec![shape(
            0,
            None,
            vec![textured_quad(0.0)],
            vec![with_texture("diffuseMap", texture)],
        )]),
    );
    assert_eq!(sink.assets.len(), 1);
    let asset = &sink.assets[0];
    assert_eq!(asset.file_name, "enc_default_name_wall.png");
    assert!(asset.bytes.starts_with(b"\x89PNG"));
    assert_eq!(
        sink.batches[0].materials[0].get_string("diffuseMap"),
        Some(asset.path.as_str())
    );
}

#[test]
fn reencoded_names_stay_unique_across_the_session() {
    let image = TextureImage {
        width: 1,
        height: 1,
        format: PixelFormat::Grey8,
        pixels: vec![1],
    };
    let first = Texture::with_image(Uri::memory("1", "/tile.jpg"), image.clone());
    let second = Texture::with_image(Uri::memory("2", "/tile.jpg"), TextureImage { pixels: vec![2], ..image });
    let scene = scene(vec![
        shape(0, None, vec![], vec![]),
        shape(1, Some(0), vec![quad(0.0)], vec![with_texture("diffuseMap", first)]),
        shape(2, Some(0), vec![quad(2.0)], vec![with_texture("diffuseMap", second)]),
    ]);
    let sink = record(EncodeOptions::default(), &scene);
    let names: Vec<&str> = sink.assets.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(names, vec!["enc_default_name_tile.jpg", "enc_default_name_tile_1.jpg"]);
}

#[test]
fn archive_textures_are_fetched_once_and_registered() {
    let uri = Uri::package(UriScheme::Zip, Uri::file("/pkg/assets.zip"), "/tex/roof.jpg");
    let mut archive = MemoryArchive::new();
    archive.insert(uri.to_string(), vec![0xFF, 0xD8, 0xFF, 0xE0]);
    let mut cache = ArchiveCache::new(archive);

    let material = with_texture("diffuseMap", Texture::new(uri));
    let scene = scene(vec![
        shape(0, None, vec![], vec![]),
        shape(1, Some(0), vec![textured_quad(0.0)], vec![material.clone()]),
        shape(2, Some(0), vec![textured_quad(0.0)], vec![material]),
    ]);
    let mut encoder = Encoder::new(EncodeOptions::default());
    let mut sink = RecordingSink::new();
    encoder.encode(&scene, 0, &mut sink, Some(&mut cache)).unwrap();

    assert_eq!(cache.fetch_count(), 1);
    assert_eq!(sink.assets.len(), 2);
    assert!(sink.assets.iter().all(|a| a.file_name == "roof.jpg" && a.byte_len == 4));
    assert_eq!(
        sink.batches[1].materials[0].get_string("diffuseMap"),
        Some("assets/roof.jpg")
    );
}

#[test]
fn extracted_texture_names_stay_inside_the_asset_directory() {
    let uri = Uri::package(UriScheme::Rpk, Uri::file("/rules.rpk"), "/tex/a.png")
        .with_query("textureName", "../../outside");
    let mut archive = MemoryArchive::new();
    archive.insert(uri.to_string(), vec![0x89, 0x50, 0x4E, 0x47]);
    let mut cache = ArchiveCache::new(archive);

    let material = with_texture("diffuseMap", Texture::new(uri));
    let scene = scene(vec![shape(0, None, vec![textured_quad(0.0)], vec![material])]);
    let mut encoder = Encoder::new(EncodeOptions::default());
    let mut sink = RecordingSink::new();
    encoder.encode(&scene, 0, &mut sink, Some(&mut cache)).unwrap();

    assert_eq!(sink.assets.len(), 1);
    let asset = &sink.assets[0];
    assert!(!asset.file_name.contains('/'));
    assert_eq!(asset.file_name, ".._.._outside.png");
    assert!(std::path::Path::new(&asset.path)
        .components()
        .all(|c| matches!(c, std::path::Component::Normal(_))));
}

#[test]
fn unresolvable_textures_are_omitted() {
    let packaged = Uri::package(UriScheme::Rpk, Uri::file("/rules.rpk"), "/tex/x.png");
    let material = Material::new("broken")
        .with("diffuseMap", MaterialValue::Texture(Texture::new(packaged)))
        .with("bumpMap", MaterialValue::Texture(Texture::invalid(Uri::file("/tex/b.jpg"))))
        .with("opacity", MaterialValue::Float(1.0));
    let sink = record(
        EncodeOptions::default(),
        &scene(vec![shape(0, None, vec![textured_quad(0.0)], vec![material])]),
    );
    let map = &sink.batches[0].materials[0];
    assert!(!map.contains("diffuseMap"));
    assert!(!map.contains("bumpMap"));
    assert!(map.contains("opacity"));
}

#[test]
fn traversal_failure_falls_back_to_the_initial_shape() {
    let options = EncodeOptions {
        preparation: PreparationFlags {
            triangulate: false,
            vertex_normals: strata_encoder::prepare::VertexNormals::Pass,
            ..PreparationFlags::default()
        },
        ..EncodeOptions::default()
    };
    let raw = quad(0.0);
    let tree = GeneratedTree::new(
        initial(vec![raw.clone()]),
        vec![shape(0, None, vec![quad(5.0)], vec![])],
    )
    .failing_after(0, "rule error");
    let scene = GeneratedScene::new(vec![tree]);

    let mut encoder = Encoder::new(options);
    let mut sink = RecordingSink::new();
    let summary = encoder.encode(&scene, 0, &mut sink, None).unwrap();

    assert!(summary.used_fallback);
    assert_eq!(sink.batches.len(), 1);
    let batch = &sink.batches[0];
    assert_eq!(batch.shape_id, None);
    assert_eq!(batch.vertex_coords, raw.vertex_coords);
    assert_eq!(batch.face_counts, raw.face_vertex_counts);
    assert_eq!(batch.face_indices, raw.face_vertex_indices);
    assert!(batch.normals.is_empty());
    assert!(batch.materials[0].is_empty());
    assert!(sink.reports.is_empty());
}

#[test]
fn malformed_leaf_falls_back_without_leaking_queued_leaves() {
    let options = EncodeOptions {
        preparation: PreparationFlags {
            triangulate: false,
            vertex_normals: strata_encoder::prepare::VertexNormals::Pass,
            ..PreparationFlags::default()
        },
        ..EncodeOptions::default()
    };
    let raw = quad(0.0);
    let mut broken = quad(9.0);
    broken.face_vertex_indices[0] = 42;
    let tree = GeneratedTree::new(
        initial(vec![raw.clone()]),
        vec![
            shape(0, None, vec![], vec![]),
            shape(1, Some(0), vec![quad(5.0)], vec![]),
            shape(2, Some(0), vec![broken], vec![]),
        ],
    );
    let scene = GeneratedScene::new(vec![tree]);

    let mut encoder = Encoder::new(options);
    let mut sink = RecordingSink::new();
    let summary = encoder.encode(&scene, 0, &mut sink, None).unwrap();

    assert!(summary.used_fallback);
    assert_eq!(summary.instances, 1);
    assert_eq!(sink.batches.len(), 1);
    let batch = &sink.batches[0];
    assert_eq!(batch.shape_id, None);
    assert_eq!(batch.vertex_coords, raw.vertex_coords);
    assert_eq!(batch.face_indices, raw.face_vertex_indices);
    assert_eq!(encoder.preparator().pending_count(), 0);
}

#[test]
fn summarized_bools_report_counts_and_extremes() {
    let mut root = shape(0, None, vec![], vec![]);
    root.reports
        .push(ReportEmission::new("visible", ReportValue::Bool(true)));
    let mut leaf = shape(1, Some(0), vec![quad(0.0)], vec![]);
    leaf.reports
        .push(ReportEmission::new("visible", ReportValue::Bool(false)));
    let sink = record(EncodeOptions::default(), &scene(vec![root, leaf]));

    assert_eq!(sink.reports.len(), 1);
    let report = &sink.reports[0].reports;
    assert_eq!(report.get_float("visible_n"), Some(2.0));
    assert_eq!(report.get_float("visible_sum"), Some(1.0));
    assert_eq!(report.get_float("visible_avg"), Some(0.5));
    assert_eq!(report.get_bool("visible_min"), Some(false));
    assert_eq!(report.get_bool("visible_max"), Some(true));
}

#[test]
fn leaf_reports_travel_with_their_instances() {
    let options = EncodeOptions {
        reporting: ReportingStrategy::LeafShapes,
        accumulation: AccumulationPolicy::Sum,
        ..EncodeOptions::default()
    };
    let mut root = shape(0, None, vec![], vec![]);
    root.reports
        .push(ReportEmission::new("height", ReportValue::Float(10.0)));
    let mut a = shape(1, Some(0), vec![quad(0.0)], vec![]);
    a.reports.push(ReportEmission::new("height", ReportValue::Float(1.0)));
    let b = shape(2, Some(0), vec![quad(2.0)], vec![]);
    let sink = record(options, &scene(vec![root, a, b]));

    assert!(sink.reports.is_empty());
    let heights: Vec<Option<f64>> = sink
        .batches
        .iter()
        .map(|batch| batch.reports.as_ref().and_then(|r| r.get_float("height")))
        .collect();
    assert_eq!(heights, vec![Some(11.0), Some(10.0)]);
}

#[test]
fn instancing_keeps_geometry_local_and_shared() {
    let options = EncodeOptions {
        preparation: PreparationFlags {
            instancing: true,
            ..PreparationFlags::default()
        },
        ..EncodeOptions::default()
    };
    let mut a = shape(1, Some(0), vec![quad(0.0)], vec![]);
    a.transform = Transform::translation(5.0, 0.0, 0.0);
    let mut b = shape(2, Some(0), vec![quad(0.0)], vec![]);
    b.transform = Transform::translation(-5.0, 0.0, 0.0);
    let scene = scene(vec![shape(0, None, vec![], vec![]), a.clone(), b.clone()]);

    let mut encoder = Encoder::new(options);
    let mut sink = RecordingSink::new();
    encoder.encode(&scene, 0, &mut sink, None).unwrap();

    assert_eq!(sink.batches.len(), 2);
    assert_eq!(sink.batches[0].vertex_coords, sink.batches[1].vertex_coords);
    assert_eq!(sink.batches[0].transform, a.transform);
    assert_eq!(sink.batches[1].transform, b.transform);
    assert_eq!(encoder.preparator().finalized_len(), 1);
}

#[test]
fn baked_transforms_move_vertices() {
    let mut moved = shape(0, None, vec![quad(0.0)], vec![]);
    moved.transform = Transform::translation(0.0, 0.0, 3.0);
    let sink = record(EncodeOptions::default(), &scene(vec![moved]));
    let batch = &sink.batches[0];
    assert!(batch.transform.is_identity());
    assert!(batch.vertex_coords.chunks(3).all(|p| p[2] == 3.0));
}

#[test]
fn geometry_off_still_emits_reports() {
    let options = EncodeOptions {
        emit_geometry: false,
        ..EncodeOptions::default()
    };
    let mut root = shape(0, None, vec![quad(0.0)], vec![]);
    root.reports
        .push(ReportEmission::new("lots", ReportValue::Float(1.0)));
    let mut encoder = Encoder::new(options);
    let mut sink = RecordingSink::new();
    let summary = encoder.encode(&scene(vec![root]), 0, &mut sink, None).unwrap();
    assert_eq!(summary.instances, 0);
    assert_eq!(summary.reports_emitted, 1);
    assert!(sink.batches.is_empty());
}

#[test]
fn every_initial_shape_is_encoded_in_order() {
    let trees = (0..3)
        .map(|i| {
            GeneratedTree::new(
                initial(vec![quad(0.0)]),
                vec![shape(0, None, vec![quad(f64::from(i))], vec![])],
            )
        })
        .collect();
    let sink = record(EncodeOptions::default(), &GeneratedScene::new(trees));
    let order: Vec<usize> = sink.batches.iter().map(|b| b.initial_shape_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    sink.batches.iter().for_each(assert_batch_invariants);
}
