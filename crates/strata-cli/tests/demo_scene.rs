// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]

use strata_encoder::{EncodeOptions, Encoder, RecordingSink};
use strata_geom_port::GeneratedScene;

const DEMO: &str = include_str!("../../../demos/two_lots.json");

#[test]
fn demo_scene_encodes_with_one_fallback() {
    let scene: GeneratedScene = serde_json::from_str(DEMO).unwrap();
    let mut encoder = Encoder::new(EncodeOptions::default());
    let mut sink = RecordingSink::new();
    let summaries = encoder.encode_all(&scene, &mut sink, None).unwrap();

    assert_eq!(summaries.len(), 2);
    assert!(!summaries[0].used_fallback);
    assert!(summaries[1].used_fallback);

    assert_eq!(sink.batches.len(), 2);
    let facade = &sink.batches[0];
    assert_eq!(facade.materials[0].get_string("diffuseMap"), Some("/textures/brick.jpg"));
    assert!(!facade.materials[0].contains("color.r"));
    assert_eq!(sink.batches[1].shape_id, None);

    assert_eq!(sink.reports.len(), 1);
    assert_eq!(sink.reports[0].reports.get_float("floors_sum"), Some(3.0));
    assert_eq!(sink.reports[0].reports.get_float("footprint_max"), Some(16.0));
}

#[test]
fn recording_serializes_to_json() {
    let scene: GeneratedScene = serde_json::from_str(DEMO).unwrap();
    let mut sink = RecordingSink::new();
    Encoder::new(EncodeOptions::default())
        .encode_all(&scene, &mut sink, None)
        .unwrap();
    let json = serde_json::to_value(&sink).unwrap();
    assert_eq!(json["batches"].as_array().unwrap().len(), 2);
    assert_eq!(json["batches"][0]["faceRanges"], serde_json::json!([0, 2]));
}
