// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hole policies.

use super::flags::HoleProcessing;
use super::polygon::Polygon;
use super::triangulate::triangulate;

/// Apply `mode` to every polygon that encircles holes.
pub(crate) fn process(polygons: Vec<Polygon>, mode: HoleProcessing) -> Vec<Polygon> {
    if polygons.iter().all(|p| p.holes.is_empty()) {
        return polygons;
    }
    match mode {
        HoleProcessing::Pass => polygons,
        HoleProcessing::TriangulateFacesWithHoles => polygons
            .into_iter()
            .flat_map(|p| {
                if p.holes.is_empty() {
                    vec![p]
                } else {
                    triangulate(&p)
                }
            })
            .collect(),
        HoleProcessing::DeleteHoles => polygons
            .into_iter()
            .map(|mut p| {
                p.holes.clear();
                p
            })
            .collect(),
        HoleProcessing::ConvertHolesToFaces => {
            let mut out = Vec::with_capacity(polygons.len());
            for mut p in polygons {
                let holes = std::mem::take(&mut p.holes);
                let material = p.material;
                out.push(p);
                out.extend(holes.into_iter().map(|corners| Polygon {
                    corners,
                    holes: Vec::new(),
                    material,
                }));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::polygon::Corner;
    use super::*;

    fn ring(points: &[[f64; 2]]) -> Vec<Corner> {
        points
            .iter()
            .map(|p| Corner {
                pos: [p[0], p[1], 0.0],
                normal: None,
                uvs: Vec::new(),
                source: 0,
            })
            .collect()
    }

    fn framed() -> Vec<Polygon> {
        vec![Polygon {
            corners: ring(&[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]),
            holes: vec![ring(&[[1.0, 1.0], [1.0, 2.0], [2.0, 2.0]])],
            material: 2,
        }]
    }

    #[test]
    fn delete_keeps_outer_face() {
        let out = process(framed(), HoleProcessing::DeleteHoles);
        assert_eq!(out.len(), 1);
        assert!(out[0].holes.is_empty());
        assert_eq!(out[0].corners.len(), 4);
    }

    #[test]
    fn convert_emits_hole_as_face() {
        let out = process(framed(), HoleProcessing::ConvertHolesToFaces);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].corners.len(), 3);
        assert_eq!(out[1].material, 2);
    }

    #[test]
    fn triangulate_fills_around_hole() {
        let out = process(framed(), HoleProcessing::TriangulateFacesWithHoles);
        assert!(out.iter().all(|p| p.corners.len() == 3 && p.holes.is_empty()));
        let area: f64 = out
            .iter()
            .map(|t| {
                let [a, b, c] = [0, 1, 2].map(|i| t.corners[i].pos);
                ((b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])).abs() * 0.5
            })
            .sum();
        assert!((area - 15.5).abs() < 1e-9);
    }

    #[test]
    fn pass_is_untouched() {
        assert_eq!(process(framed(), HoleProcessing::Pass), framed());
    }
}
