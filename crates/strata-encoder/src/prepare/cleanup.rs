// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Normal generation and cleanup.

use super::flags::VertexNormals;
use super::polygon::{Corner, Polygon};

/// Unnormalized Newell normal of a ring.
pub(crate) fn newell(corners: &[Corner]) -> [f64; 3] {
    let mut n = [0.0; 3];
    for (i, a) in corners.iter().enumerate() {
        let b = &corners[(i + 1) % corners.len()];
        let (a, b) = (a.pos, b.pos);
        n[0] += (a[1] - b[1]) * (a[2] + b[2]);
        n[1] += (a[2] - b[2]) * (a[0] + b[0]);
        n[2] += (a[0] - b[0]) * (a[1] + b[1]);
    }
    n
}

/// Unit length copy of `v`, or `v` itself when it has no length.
pub(crate) fn normalized(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 0.0 {
        v.map(|c| c / len)
    } else {
        v
    }
}

/// Unit face normal; zero for degenerate rings.
pub(crate) fn face_normal(corners: &[Corner]) -> [f64; 3] {
    normalized(newell(corners))
}

/// Apply the vertex normal policy to every polygon.
///
/// Hole corners take the normal of the face that encircles them.
pub(crate) fn process_normals(polygons: &mut [Polygon], mode: VertexNormals) {
    for poly in polygons {
        let replace = match mode {
            VertexNormals::Pass => false,
            VertexNormals::SetAllToFaceNormals => true,
            VertexNormals::SetMissingToFaceNormals => poly.rings().any(|c| c.normal.is_none()),
        };
        if replace {
            let n = face_normal(&poly.corners);
            poly.rings_mut().for_each(|c| c.normal = Some(n));
        }
    }
}

/// Scale every present normal to unit length.
pub(crate) fn normalize_normals(polygons: &mut [Polygon]) {
    for c in polygons.iter_mut().flat_map(Polygon::rings_mut) {
        c.normal = c.normal.map(normalized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner(pos: [f64; 3], normal: Option<[f64; 3]>) -> Corner {
        Corner {
            pos,
            normal,
            uvs: Vec::new(),
            source: 0,
        }
    }

    fn tri(normal: Option<[f64; 3]>) -> Polygon {
        Polygon {
            corners: vec![
                corner([0.0, 0.0, 0.0], normal),
                corner([1.0, 0.0, 0.0], normal),
                corner([0.0, 1.0, 0.0], None),
            ],
            holes: Vec::new(),
            material: 0,
        }
    }

    #[test]
    fn counter_clockwise_xy_points_up_z() {
        assert_eq!(face_normal(&tri(None).corners), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_normal_replaces_whole_face() {
        let mut polys = vec![tri(Some([1.0, 0.0, 0.0]))];
        process_normals(&mut polys, VertexNormals::SetMissingToFaceNormals);
        assert!(polys[0].corners.iter().all(|c| c.normal == Some([0.0, 0.0, 1.0])));
    }

    #[test]
    fn pass_keeps_gaps() {
        let mut polys = vec![tri(Some([0.0, 2.0, 0.0]))];
        process_normals(&mut polys, VertexNormals::Pass);
        assert_eq!(polys[0].corners[2].normal, None);
        normalize_normals(&mut polys);
        assert_eq!(polys[0].corners[0].normal, Some([0.0, 1.0, 0.0]));
    }
}
