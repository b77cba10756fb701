// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Material and report marshaling into host attribute maps.
//!
//! Materials carry two vocabularies: shader-facing keys (`diffuseMap`,
//! `opacity`, ...) and low-level rule-language keys (`colormap.su`,
//! `color.r`, ...). Only the shader-facing keys reach the host.

use strata_geom_port::{AttrValue, AttributeMap, Material, MaterialValue, Reports, Texture};
use tracing::trace;

/// Rule-language material keys that never reach the host. Sorted.
pub const BLACKLIST: &[&str] = &[
    "ambient.b",
    "ambient.g",
    "ambient.r",
    "bumpmap",
    "bumpmap.rw",
    "bumpmap.su",
    "bumpmap.sv",
    "bumpmap.tu",
    "bumpmap.tv",
    "color.a",
    "color.b",
    "color.g",
    "color.r",
    "color.rgb",
    "colormap",
    "colormap.rw",
    "colormap.su",
    "colormap.sv",
    "colormap.tu",
    "colormap.tv",
    "dirtmap",
    "dirtmap.rw",
    "dirtmap.su",
    "dirtmap.sv",
    "dirtmap.tu",
    "dirtmap.tv",
    "emissive.b",
    "emissive.g",
    "emissive.r",
    "emissivemap",
    "emissivemap.rw",
    "emissivemap.su",
    "emissivemap.sv",
    "emissivemap.tu",
    "emissivemap.tv",
    "metallicmap",
    "metallicmap.rw",
    "metallicmap.su",
    "metallicmap.sv",
    "metallicmap.tu",
    "metallicmap.tv",
    "normalmap",
    "normalmap.rw",
    "normalmap.su",
    "normalmap.sv",
    "normalmap.tu",
    "normalmap.tv",
    "occlusionmap",
    "occlusionmap.rw",
    "occlusionmap.su",
    "occlusionmap.sv",
    "occlusionmap.tu",
    "occlusionmap.tv",
    "opacitymap",
    "opacitymap.mode",
    "opacitymap.rw",
    "opacitymap.su",
    "opacitymap.sv",
    "opacitymap.tu",
    "opacitymap.tv",
    "roughnessmap",
    "roughnessmap.rw",
    "roughnessmap.su",
    "roughnessmap.sv",
    "roughnessmap.tu",
    "roughnessmap.tv",
    "specular.b",
    "specular.g",
    "specular.r",
    "specularmap",
    "specularmap.rw",
    "specularmap.su",
    "specularmap.sv",
    "specularmap.tu",
    "specularmap.tv",
];

/// Returns `true` if `key` is filtered from marshaled materials.
pub fn is_blacklisted(key: &str) -> bool {
    BLACKLIST.binary_search(&key).is_ok()
}

/// Resolves texture references to host-usable paths.
pub trait TexturePaths {
    /// Path for `texture`, or `None` if it cannot be resolved.
    fn texture_path(&mut self, texture: &Texture) -> Option<String>;
}

/// Converts typed materials into generic attribute maps.
///
/// Texture values are resolved through a [`TexturePaths`] implementation;
/// unresolvable textures are dropped, as are texture arrays with no
/// resolvable element.
pub struct MaterialMarshaler<'t> {
    textures: &'t mut dyn TexturePaths,
}

impl<'t> MaterialMarshaler<'t> {
    /// Marshal through `textures`.
    pub fn new(textures: &'t mut dyn TexturePaths) -> Self {
        Self { textures }
    }

    /// Convert every non-blacklisted key of `material`.
    pub fn convert_all(&mut self, material: &Material) -> AttributeMap {
        self.convert(material, material.keys())
    }

    /// Convert the listed `keys` of `material`.
    ///
    /// Keys absent from the material and values of unknown kind are skipped.
    pub fn convert<'k>(
        &mut self,
        material: &Material,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> AttributeMap {
        let mut out = AttributeMap::new();
        for key in keys {
            if is_blacklisted(key) {
                continue;
            }
            let Some(value) = material.get(key) else {
                continue;
            };
            match value {
                MaterialValue::Bool(b) => out.set_bool(key, *b),
                MaterialValue::Int(i) => out.set_int(key, *i),
                MaterialValue::Float(f) => out.set_float(key, f64::from(*f)),
                MaterialValue::String(s) => out.set_string(key, s.clone()),
                MaterialValue::BoolArray(v) => out.set(key, AttrValue::BoolArray(v.clone())),
                MaterialValue::IntArray(v) => out.set(key, AttrValue::IntArray(v.clone())),
                MaterialValue::FloatArray(v) => out.set(key, AttrValue::FloatArray(v.clone())),
                MaterialValue::StringArray(v) => out.set(key, AttrValue::StringArray(v.clone())),
                MaterialValue::Texture(texture) => {
                    if let Some(path) = self.resolve(texture) {
                        out.set_string(key, path);
                    }
                }
                MaterialValue::TextureArray(textures) => {
                    let paths: Vec<String> =
                        textures.iter().filter_map(|t| self.resolve(t)).collect();
                    if !paths.is_empty() {
                        out.set(key, AttrValue::StringArray(paths));
                    }
                }
                MaterialValue::Undefined => {
                    trace!(key, material = %material.name, "ignoring attribute of unknown kind");
                }
            }
        }
        out
    }

    fn resolve(&mut self, texture: &Texture) -> Option<String> {
        self.textures
            .texture_path(texture)
            .filter(|path| !path.is_empty())
    }
}

/// Convert aggregated reports into one attribute map.
///
/// Repeated keys (append policy) keep the last value per key and kind.
pub fn convert_reports(reports: &Reports) -> AttributeMap {
    let mut out = AttributeMap::new();
    for (key, value) in &reports.bools {
        out.set_bool(key.clone(), *value);
    }
    for (key, value) in &reports.floats {
        out.set_float(key.clone(), *value);
    }
    for (key, value) in &reports.strings {
        out.set_string(key.clone(), value.clone());
    }
    out
}

/// Binding of a texture slot to the UV set it samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureUvMapping {
    /// Shader-facing material key.
    pub key: &'static str,
    /// Element of the texture array at `key`.
    pub index: usize,
    /// UV set sampled by that texture.
    pub uv_set: u32,
}

/// Texture slots and their UV sets, in slot order.
pub const TEXTURE_UV_MAPPINGS: &[TextureUvMapping] = &[
    // colormap
    TextureUvMapping { key: "diffuseMap", index: 0, uv_set: 0 },
    // bumpmap
    TextureUvMapping { key: "bumpMap", index: 0, uv_set: 1 },
    // dirtmap
    TextureUvMapping { key: "diffuseMap", index: 1, uv_set: 2 },
    // specularmap
    TextureUvMapping { key: "specularMap", index: 0, uv_set: 3 },
    // opacitymap
    TextureUvMapping { key: "opacityMap", index: 0, uv_set: 4 },
    // normalmap
    TextureUvMapping { key: "normalMap", index: 0, uv_set: 5 },
];

/// Number of UV sets `material` needs: the highest UV set sampled by a valid
/// texture plus one, or `0` when no valid texture is bound.
pub fn scan_valid_textures(material: &Material) -> u32 {
    TEXTURE_UV_MAPPINGS
        .iter()
        .filter(|m| {
            material
                .textures(m.key)
                .get(m.index)
                .is_some_and(|t| t.valid)
        })
        .map(|m| m.uv_set + 1)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_geom_port::Uri;

    struct FixedPaths;

    impl TexturePaths for FixedPaths {
        fn texture_path(&mut self, texture: &Texture) -> Option<String> {
            texture.valid.then(|| texture.uri.path().to_owned())
        }
    }

    fn tex(path: &str) -> Texture {
        Texture::new(Uri::file(path))
    }

    #[test]
    fn blacklist_is_sorted_and_unique() {
        assert!(BLACKLIST.windows(2).all(|w| w[0] < w[1]));
        assert!(is_blacklisted("colormap.su"));
        assert!(is_blacklisted("color.r"));
        assert!(is_blacklisted("roughnessmap"));
        assert!(!is_blacklisted("diffuseMap"));
        assert!(!is_blacklisted("color"));
    }

    #[test]
    fn blacklisted_keys_are_dropped() {
        let material = Material::new("m")
            .with("color.r", MaterialValue::Float(1.0))
            .with("bumpmap.su", MaterialValue::Float(2.0))
            .with("colormap", MaterialValue::String("brick.png".into()))
            .with("opacity", MaterialValue::Float(0.5));
        let map = MaterialMarshaler::new(&mut FixedPaths).convert_all(&material);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["opacity"]);
        assert_eq!(map.get_float("opacity"), Some(0.5));
    }

    #[test]
    fn scalar_and_array_kinds_map_one_to_one() {
        let material = Material::new("m")
            .with("shininess", MaterialValue::Int(8))
            .with("name", MaterialValue::String("brick".into()))
            .with("flags", MaterialValue::BoolArray(vec![true, false]))
            .with("diffuseColor", MaterialValue::FloatArray(vec![1.0, 0.5, 0.25]))
            .with("legacy", MaterialValue::Undefined);
        let map = MaterialMarshaler::new(&mut FixedPaths).convert_all(&material);
        assert_eq!(map.get_int("shininess"), Some(8));
        assert_eq!(map.get_string("name"), Some("brick"));
        assert_eq!(map.get("flags"), Some(&AttrValue::BoolArray(vec![true, false])));
        assert_eq!(
            map.get("diffuseColor"),
            Some(&AttrValue::FloatArray(vec![1.0, 0.5, 0.25]))
        );
        assert!(!map.contains("legacy"));
    }

    #[test]
    fn textures_resolve_or_vanish() {
        let material = Material::new("m")
            .with("diffuseMap", MaterialValue::TextureArray(vec![
                tex("/t/a.png"),
                Texture::invalid(Uri::file("/t/missing.png")),
            ]))
            .with("bumpMap", MaterialValue::Texture(Texture::invalid(Uri::file("/t/b.png"))))
            .with("opacityMap", MaterialValue::TextureArray(vec![Texture::invalid(
                Uri::file("/t/c.png"),
            )]));
        let map = MaterialMarshaler::new(&mut FixedPaths).convert_all(&material);
        assert_eq!(
            map.get("diffuseMap"),
            Some(&AttrValue::StringArray(vec!["/t/a.png".into()]))
        );
        assert!(!map.contains("bumpMap"));
        assert!(!map.contains("opacityMap"));
    }

    #[test]
    fn explicit_key_list_limits_output() {
        let material = Material::new("m")
            .with("opacity", MaterialValue::Float(0.5))
            .with("shininess", MaterialValue::Int(8));
        let map = MaterialMarshaler::new(&mut FixedPaths).convert(&material, ["shininess", "absent"]);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["shininess"]);
    }

    #[test]
    fn first_diffuse_texture_requires_uv_set_zero() {
        let material = Material::new("m").with(
            "diffuseMap",
            MaterialValue::TextureArray(vec![
                tex("/t/a.png"),
                Texture::invalid(Uri::file("/t/dirt.png")),
            ]),
        )
        .with("bumpMap", MaterialValue::Texture(Texture::invalid(Uri::file("/t/b.png"))));
        assert_eq!(scan_valid_textures(&material), 1);
    }

    #[test]
    fn highest_valid_slot_wins() {
        let material = Material::new("m")
            .with("diffuseMap", MaterialValue::Texture(tex("/t/a.png")))
            .with("opacityMap", MaterialValue::Texture(tex("/t/o.png")));
        assert_eq!(scan_valid_textures(&material), 5);
        assert_eq!(scan_valid_textures(&Material::new("plain")), 0);
    }

    #[test]
    fn reports_flatten_by_kind() {
        let reports = Reports {
            bools: vec![("hasRoof".into(), true)],
            floats: vec![("area".into(), 1.0), ("area".into(), 2.0)],
            strings: vec![("zone".into(), "R1".into())],
        };
        let map = convert_reports(&reports);
        assert_eq!(map.get_bool("hasRoof"), Some(true));
        assert_eq!(map.get_float("area"), Some(2.0));
        assert_eq!(map.get_string("zone"), Some("R1"));
    }
}
