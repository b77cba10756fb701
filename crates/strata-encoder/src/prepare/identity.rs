// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content identities for pooled geometry and materials.
//!
//! Hashes are BLAKE3 over a canonical little-endian encoding. Floats go
//! through [`canonical_bits`] so `-0.0`/`0.0` and NaN payloads collapse.
//! Every variable-length section is length-prefixed.

use strata_cas::BlobHash;
use strata_geom_port::{canonical_bits, Geometry, Material, MaterialValue, Texture, Transform};

use super::flags::PreparationFlags;

struct Canon(blake3::Hasher);

impl Canon {
    fn new(domain: &str) -> Self {
        let mut h = Self(blake3::Hasher::new());
        h.str(domain);
        h
    }

    fn u8(&mut self, v: u8) {
        self.0.update(&[v]);
    }

    fn u64(&mut self, v: u64) {
        self.0.update(&v.to_le_bytes());
    }

    fn size(&mut self, n: usize) {
        self.u64(n as u64);
    }

    fn f64(&mut self, v: f64) {
        self.u64(canonical_bits(v));
    }

    fn f64s(&mut self, vs: &[f64]) {
        self.size(vs.len());
        vs.iter().for_each(|&v| self.f64(v));
    }

    fn u32s(&mut self, vs: &[u32]) {
        self.size(vs.len());
        for v in vs {
            self.0.update(&v.to_le_bytes());
        }
    }

    fn bytes(&mut self, b: &[u8]) {
        self.size(b.len());
        self.0.update(b);
    }

    fn str(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    fn finish(&self) -> BlobHash {
        self.0.finalize().into()
    }
}

/// Identity of a source geometry.
pub fn geometry_hash(geometry: &Geometry) -> BlobHash {
    let mut h = Canon::new("strata:geometry:v1");
    h.size(geometry.meshes.len());
    for mesh in &geometry.meshes {
        h.f64s(&mesh.vertex_coords);
        h.f64s(&mesh.vertex_normals);
        h.u32s(&mesh.face_vertex_counts);
        h.u32s(&mesh.face_vertex_indices);
        h.size(mesh.uv_sets.len());
        for set in &mesh.uv_sets {
            h.f64s(&set.coords);
            h.u32s(&set.face_counts);
            h.u32s(&set.indices);
        }
        h.u32s(&mesh.face_materials);
        h.size(mesh.face_holes.len());
        for holes in &mesh.face_holes {
            h.u32s(holes);
        }
    }
    h.finish()
}

/// Identity of a material, including the pixels of in-memory textures.
pub fn material_hash(material: &Material) -> BlobHash {
    let mut h = Canon::new("strata:material:v1");
    h.str(&material.name);
    h.size(material.values.len());
    for (key, value) in &material.values {
        h.str(key);
        match value {
            MaterialValue::Bool(b) => {
                h.u8(0);
                h.u8(u8::from(*b));
            }
            MaterialValue::Int(i) => {
                h.u8(1);
                h.0.update(&i.to_le_bytes());
            }
            MaterialValue::Float(f) => {
                h.u8(2);
                h.f64(f64::from(*f));
            }
            MaterialValue::String(s) => {
                h.u8(3);
                h.str(s);
            }
            MaterialValue::BoolArray(bs) => {
                h.u8(4);
                h.bytes(&bs.iter().map(|&b| u8::from(b)).collect::<Vec<_>>());
            }
            MaterialValue::IntArray(is) => {
                h.u8(5);
                h.size(is.len());
                is.iter().for_each(|i| {
                    h.0.update(&i.to_le_bytes());
                });
            }
            MaterialValue::FloatArray(fs) => {
                h.u8(6);
                h.f64s(fs);
            }
            MaterialValue::StringArray(ss) => {
                h.u8(7);
                h.size(ss.len());
                ss.iter().for_each(|s| h.str(s));
            }
            MaterialValue::Texture(t) => {
                h.u8(8);
                texture(&mut h, t);
            }
            MaterialValue::TextureArray(ts) => {
                h.u8(9);
                h.size(ts.len());
                ts.iter().for_each(|t| texture(&mut h, t));
            }
            MaterialValue::Undefined => h.u8(10),
        }
    }
    h.finish()
}

fn texture(h: &mut Canon, t: &Texture) {
    h.str(&t.uri.to_string());
    h.u8(u8::from(t.valid));
    match t.image.as_deref() {
        Some(img) => {
            h.u8(1);
            h.u64(u64::from(img.width));
            h.u64(u64::from(img.height));
            h.size(img.format.channels());
            h.bytes(&img.pixels);
        }
        None => h.u8(0),
    }
}

/// Cache key of finalized geometry: source identity, materials, flags and
/// the transform baked into it.
pub fn finalize_key(
    geometry: &BlobHash,
    materials: &[BlobHash],
    flags: &PreparationFlags,
    baked: Option<&Transform>,
) -> BlobHash {
    let mut h = Canon::new("strata:finalized:v1");
    h.0.update(geometry.as_bytes());
    h.size(materials.len());
    for m in materials {
        h.0.update(m.as_bytes());
    }
    for b in [
        flags.instancing,
        flags.triangulate,
        flags.merge_vertices,
        flags.cleanup_uvs,
        flags.cleanup_vertex_normals,
        flags.merge_by_material,
    ] {
        h.u8(u8::from(b));
    }
    for t in [flags.merge_tolerance, flags.uv_tolerance, flags.normal_tolerance] {
        h.f64(t);
    }
    h.u8(flags.vertex_normals as u8);
    h.u8(flags.hole_processing as u8);
    h.u8(flags.index_sharing as u8);
    match baked {
        Some(t) => {
            h.u8(1);
            t.0.iter().for_each(|&v| h.f64(v));
        }
        None => h.u8(0),
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_geom_port::{Mesh, Uri};

    fn tri(z: f64) -> Geometry {
        Geometry::new(vec![Mesh {
            vertex_coords: vec![0.0, 0.0, z, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            face_vertex_counts: vec![3],
            face_vertex_indices: vec![0, 1, 2],
            ..Mesh::default()
        }])
    }

    #[test]
    fn signed_zero_does_not_split_identity() {
        assert_eq!(geometry_hash(&tri(0.0)), geometry_hash(&tri(-0.0)));
        assert_ne!(geometry_hash(&tri(0.0)), geometry_hash(&tri(1.0)));
    }

    #[test]
    fn texture_pixels_affect_material_identity() {
        let img = |v| strata_geom_port::TextureImage {
            width: 1,
            height: 1,
            format: strata_geom_port::PixelFormat::Grey8,
            pixels: vec![v],
        };
        let mat = |v| {
            Material::new("m").with(
                "diffuseMap",
                MaterialValue::Texture(Texture::with_image(Uri::builtin("x"), img(v))),
            )
        };
        assert_eq!(material_hash(&mat(1)), material_hash(&mat(1)));
        assert_ne!(material_hash(&mat(1)), material_hash(&mat(2)));
    }

    #[test]
    fn baked_transform_changes_finalize_key() {
        let g = geometry_hash(&tri(0.0));
        let flags = PreparationFlags::default();
        let moved = Transform::translation(1.0, 0.0, 0.0);
        assert_ne!(
            finalize_key(&g, &[], &flags, None),
            finalize_key(&g, &[], &flags, Some(&moved))
        );
        let instanced = PreparationFlags {
            instancing: true,
            ..flags
        };
        assert_ne!(
            finalize_key(&g, &[], &flags, None),
            finalize_key(&g, &[], &instanced, None)
        );
    }
}
