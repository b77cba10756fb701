// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ear-clipping triangulation for planar polygons, with hole bridging.
//!
//! Rings are projected onto the plane of their dominant normal axis. Holes
//! are spliced into the outer ring through a bridge edge to the nearest
//! visible outer vertex, turning the polygon into one weakly simple ring.

use super::cleanup::{face_normal, newell};
use super::polygon::{Corner, Polygon};

const EPS: f64 = 1e-12;

type P2 = [f64; 2];

/// Split `poly` into triangles. Rings with fewer than three corners vanish.
pub(crate) fn triangulate(poly: &Polygon) -> Vec<Polygon> {
    if poly.corners.len() < 3 {
        return Vec::new();
    }
    if poly.corners.len() == 3 && poly.holes.is_empty() {
        return vec![poly.clone()];
    }
    let normal = newell(&poly.corners);
    let axis = dominant_axis(normal);
    let project = |c: &Corner| -> P2 {
        match axis {
            0 => [c.pos[1], c.pos[2]],
            1 => [c.pos[2], c.pos[0]],
            _ => [c.pos[0], c.pos[1]],
        }
    };

    let ring = if poly.holes.is_empty() {
        poly.corners.clone()
    } else {
        bridge_holes(poly, &project)
    };
    let points: Vec<P2> = ring.iter().map(project).collect();
    let orientation = signed_area(&points).signum();

    let triangles = if orientation == 0.0 {
        fan(ring.len())
    } else {
        ear_clip(&points, orientation)
    };
    triangles
        .into_iter()
        .map(|[a, b, c]| Polygon {
            corners: vec![ring[a].clone(), ring[b].clone(), ring[c].clone()],
            holes: Vec::new(),
            material: poly.material,
        })
        .collect()
}

fn dominant_axis(n: [f64; 3]) -> usize {
    let a = n.map(f64::abs);
    if a[0] >= a[1] && a[0] >= a[2] {
        0
    } else if a[1] >= a[2] {
        1
    } else {
        2
    }
}

fn signed_area(points: &[P2]) -> f64 {
    let mut area = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        area += a[0] * b[1] - b[0] * a[1];
    }
    area * 0.5
}

fn cross(o: P2, a: P2, b: P2) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn fan(n: usize) -> Vec<[usize; 3]> {
    (1..n - 1).map(|i| [0, i, i + 1]).collect()
}

// inside or on the boundary, given the triangle's winding sign
fn inside(p: P2, [a, b, c]: [P2; 3], sign: f64) -> bool {
    cross(a, b, p) * sign >= -EPS && cross(b, c, p) * sign >= -EPS && cross(c, a, p) * sign >= -EPS
}

fn ear_clip(points: &[P2], sign: f64) -> Vec<[usize; 3]> {
    let mut idx: Vec<usize> = (0..points.len()).collect();
    let mut out = Vec::with_capacity(points.len().saturating_sub(2));
    while idx.len() > 3 {
        let n = idx.len();
        let mut clipped = false;
        for i in 0..n {
            let (p, c, q) = (idx[(i + n - 1) % n], idx[i], idx[(i + 1) % n]);
            let tri = [points[p], points[c], points[q]];
            let turn = cross(tri[0], tri[1], tri[2]) * sign;
            if turn.abs() <= EPS {
                // collinear or spike: drop without emitting a sliver
                idx.remove(i);
                clipped = true;
                break;
            }
            if turn < 0.0 {
                continue;
            }
            let blocked = idx.iter().any(|&k| {
                k != p
                    && k != c
                    && k != q
                    && !tri.contains(&points[k])
                    && inside(points[k], tri, sign)
            });
            if !blocked {
                out.push([p, c, q]);
                idx.remove(i);
                clipped = true;
                break;
            }
        }
        if !clipped {
            // numerically hopeless remainder
            out.extend(fan(idx.len()).into_iter().map(|t| t.map(|k| idx[k])));
            return out;
        }
    }
    if idx.len() == 3 {
        let tri = [points[idx[0]], points[idx[1]], points[idx[2]]];
        if cross(tri[0], tri[1], tri[2]).abs() > EPS {
            out.push([idx[0], idx[1], idx[2]]);
        }
    }
    out
}

fn bridge_holes(poly: &Polygon, project: &impl Fn(&Corner) -> P2) -> Vec<Corner> {
    let outer_sign = signed_area(&poly.corners.iter().map(project).collect::<Vec<_>>()).signum();
    let normal = face_normal(&poly.corners);

    let mut holes: Vec<Vec<Corner>> = poly
        .holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(|h| {
            let mut h = h.clone();
            let sign = signed_area(&h.iter().map(project).collect::<Vec<_>>()).signum();
            if sign == outer_sign {
                h.reverse();
            }
            h
        })
        .collect();
    // rightmost holes first so earlier bridges cannot cross later ones
    holes.sort_by(|a, b| max_x(b, project).total_cmp(&max_x(a, project)));

    let hole_pts: Vec<Vec<P2>> = holes
        .iter()
        .map(|h| h.iter().map(project).collect())
        .collect();
    let mut ring = poly.corners.clone();
    for (j, hole) in holes.iter().enumerate() {
        let pts = &hole_pts[j];
        let m = (0..pts.len())
            .max_by(|&a, &b| pts[a][0].total_cmp(&pts[b][0]))
            .unwrap_or(0);
        let anchor = pts[m];
        let ring_pts: Vec<P2> = ring.iter().map(project).collect();
        let target = visible_vertex(anchor, &ring_pts, pts, &hole_pts[j + 1..])
            .unwrap_or_else(|| nearest(anchor, &ring_pts));

        let mut spliced = Vec::with_capacity(ring.len() + hole.len() + 2);
        spliced.extend_from_slice(&ring[..=target]);
        spliced.extend(hole[m..].iter().cloned());
        spliced.extend(hole[..=m].iter().cloned());
        spliced.extend_from_slice(&ring[target..]);
        ring = spliced;
    }

    // holes inherit the face's attribute layout
    let has_normals = poly.corners.iter().any(|c| c.normal.is_some());
    let sets = poly.corners.first().map_or(0, |c| c.uvs.len());
    let uv_present: Vec<bool> = (0..sets)
        .map(|s| poly.corners.iter().any(|c| c.uvs.get(s).is_some_and(Option::is_some)))
        .collect();
    for c in &mut ring {
        if has_normals && c.normal.is_none() {
            c.normal = Some(normal);
        }
        c.uvs.resize(sets, None);
        for (uv, &present) in c.uvs.iter_mut().zip(&uv_present) {
            if present && uv.is_none() {
                *uv = Some([0.0, 0.0]);
            }
        }
    }
    ring
}

fn max_x(ring: &[Corner], project: &impl Fn(&Corner) -> P2) -> f64 {
    ring.iter().map(|c| project(c)[0]).fold(f64::NEG_INFINITY, f64::max)
}

fn dist2(a: P2, b: P2) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn nearest(p: P2, ring: &[P2]) -> usize {
    (0..ring.len())
        .min_by(|&i, &j| dist2(p, ring[i]).total_cmp(&dist2(p, ring[j])))
        .unwrap_or(0)
}

// nearest ring vertex reachable from the hole anchor `p` without crossing
// any ring or hole edge and without passing through the hole itself
fn visible_vertex(p: P2, ring: &[P2], hole: &[P2], pending: &[Vec<P2>]) -> Option<usize> {
    let mut order: Vec<usize> = (0..ring.len()).collect();
    order.sort_by(|&i, &j| dist2(p, ring[i]).total_cmp(&dist2(p, ring[j])));
    order.into_iter().find(|&v| {
        let q = ring[v];
        let mid = [(p[0] + q[0]) * 0.5, (p[1] + q[1]) * 0.5];
        std::iter::once(ring)
            .chain(std::iter::once(hole))
            .chain(pending.iter().map(Vec::as_slice))
            .all(|r| segment_clear(p, q, r))
            && !contains(hole, mid)
    })
}

fn segment_clear(p: P2, q: P2, ring: &[P2]) -> bool {
    (0..ring.len()).all(|e| {
        let (a, b) = (ring[e], ring[(e + 1) % ring.len()]);
        !segments_cross(p, q, a, b) && !on_segment(a, p, q)
    })
}

// `r` lies on segment `pq`, endpoints excluded
fn on_segment(r: P2, p: P2, q: P2) -> bool {
    r != p
        && r != q
        && cross(p, q, r).abs() <= EPS
        && r[0] >= p[0].min(q[0])
        && r[0] <= p[0].max(q[0])
        && r[1] >= p[1].min(q[1])
        && r[1] <= p[1].max(q[1])
}

// even-odd point in polygon
fn contains(ring: &[P2], p: P2) -> bool {
    let mut inside = false;
    for (i, &a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        if (a[1] > p[1]) != (b[1] > p[1])
            && p[0] < (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0]
        {
            inside = !inside;
        }
    }
    inside
}

fn segments_cross(p1: P2, p2: P2, q1: P2, q2: P2) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}
