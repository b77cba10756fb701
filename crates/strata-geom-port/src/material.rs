// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Materials and texture references.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Uri;

/// Pixel layout of an in-memory image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum PixelFormat {
    /// One byte per pixel.
    Grey8,
    /// Three bytes per pixel.
    Rgb8,
    /// Four bytes per pixel.
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Grey8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// Decoded image owned by the generator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct TextureImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Row-major pixel bytes, top row first.
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Expected byte length for the declared dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.channels()
    }
}

/// Reference to image data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Texture {
    /// Where the image lives.
    pub uri: Uri,
    /// Whether the generator could load the image.
    #[cfg_attr(feature = "serde", serde(default = "default_valid"))]
    pub valid: bool,
    /// Decoded pixels, when the generator holds them in memory.
    #[cfg_attr(feature = "serde", serde(default))]
    pub image: Option<Arc<TextureImage>>,
}

#[cfg(feature = "serde")]
const fn default_valid() -> bool {
    true
}

impl Texture {
    /// Valid texture without in-memory pixels.
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            valid: true,
            image: None,
        }
    }

    /// Valid texture with in-memory pixels.
    pub fn with_image(uri: Uri, image: TextureImage) -> Self {
        Self {
            uri,
            valid: true,
            image: Some(Arc::new(image)),
        }
    }

    /// Texture the generator failed to load.
    pub fn invalid(uri: Uri) -> Self {
        Self {
            uri,
            valid: false,
            image: None,
        }
    }
}

/// A typed material value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "value", rename_all = "camelCase")
)]
pub enum MaterialValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i32),
    /// Single-precision float.
    Float(f32),
    /// String.
    String(String),
    /// Boolean array.
    BoolArray(Vec<bool>),
    /// Integer array.
    IntArray(Vec<i32>),
    /// Float array.
    FloatArray(Vec<f64>),
    /// String array.
    StringArray(Vec<String>),
    /// Single texture.
    Texture(Texture),
    /// Texture layers.
    TextureArray(Vec<Texture>),
    /// Kind this encoder does not understand.
    Undefined,
}

/// Typed attribute bag keyed by shader-facing names.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Material {
    /// Display name.
    pub name: String,
    /// Values by key.
    pub values: BTreeMap<String, MaterialValue>,
}

impl Material {
    /// Empty material.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: MaterialValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: MaterialValue) {
        self.values.insert(key.into(), value);
    }

    /// Value of `key`.
    pub fn get(&self, key: &str) -> Option<&MaterialValue> {
        self.values.get(key)
    }

    /// Declared keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Textures bound to `key`. A single texture reads as one element.
    pub fn textures(&self, key: &str) -> &[Texture] {
        match self.get(key) {
            Some(MaterialValue::Texture(t)) => core::slice::from_ref(t),
            Some(MaterialValue::TextureArray(ts)) => ts,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_texture_reads_as_slice() {
        let tex = Texture::new(Uri::file("/t/a.png"));
        let mat = Material::new("m")
            .with("diffuseMap", MaterialValue::Texture(tex.clone()))
            .with("opacity", MaterialValue::Float(0.5));
        assert_eq!(mat.textures("diffuseMap"), &[tex]);
        assert!(mat.textures("opacity").is_empty());
        assert!(mat.textures("bumpMap").is_empty());
    }

    #[test]
    fn image_length_follows_format() {
        let img = TextureImage {
            width: 2,
            height: 3,
            format: PixelFormat::Rgb8,
            pixels: vec![0; 18],
        };
        assert_eq!(img.expected_len(), img.pixels.len());
    }
}
