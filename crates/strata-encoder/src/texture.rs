// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Texture resolution.
//!
//! A texture reference becomes a host-usable path through one of three
//! strategies, chosen from its URI:
//!
//! | URI | Strategy |
//! |---|---|
//! | local file or share, not inside an archive | [`TextureStrategy::Passthrough`] |
//! | entry inside a package | [`TextureStrategy::ArchiveExtract`] |
//! | anything else (memory, builtin) | [`TextureStrategy::Reencode`] |
//!
//! Failures never abort an encode: they are logged and the texture is
//! dropped from the marshaled material.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat};
use strata_cas::{ArchiveCache, CasError};
use strata_geom_port::{AssetRegistrar, PixelFormat, Texture, TextureImage, Uri, UriScheme};
use thiserror::Error;
use tracing::{debug, warn};

use crate::marshal::TexturePaths;
use crate::names::NameRegistry;
use crate::options::TextureFormat;

/// Why a texture could not be resolved.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The generator flagged the texture as unusable.
    #[error("texture {0} is not valid")]
    Invalid(String),
    /// A filesystem URI without a native path.
    #[error("texture {0} has no native path")]
    NoNativePath(String),
    /// An archive entry was requested but no archive backend is attached.
    #[error("no archive backend to extract {0}")]
    NoArchive(String),
    /// The archive backend failed.
    #[error(transparent)]
    Archive(#[from] CasError),
    /// An in-memory texture without pixel data.
    #[error("texture {0} has no pixel data")]
    NoPixels(String),
    /// Pixel buffer does not match the declared dimensions.
    #[error("texture {uri}: expected {expected} pixel bytes, found {actual}")]
    PixelCount {
        /// Texture URI.
        uri: String,
        /// Bytes implied by width, height and format.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },
    /// The image codec failed.
    #[error("texture {uri}: {source}")]
    Encode {
        /// Texture URI.
        uri: String,
        /// Codec error.
        #[source]
        source: image::ImageError,
    },
    /// The codec produced no data.
    #[error("texture {0} encoded to an empty buffer")]
    EmptyOutput(String),
    /// The host refused the asset.
    #[error("host rejected asset {0}")]
    Rejected(String),
}

/// Resolution strategy for a texture URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureStrategy {
    /// Hand the native path to the host as-is.
    Passthrough,
    /// Pull the bytes from the archive and register them as an asset.
    ArchiveExtract,
    /// Encode the in-memory pixels to a file format and register them.
    Reencode,
}

impl TextureStrategy {
    /// Pick the strategy for `uri`.
    pub fn classify(uri: &Uri) -> Self {
        match (uri.is_composite(), uri.scheme()) {
            (false, UriScheme::File | UriScheme::Unc) => Self::Passthrough,
            (true, scheme) if scheme.is_package() => Self::ArchiveExtract,
            _ => Self::Reencode,
        }
    }
}

/// Concrete file format for re-encoded textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG.
    Jpg,
    /// PNG.
    Png,
    /// TIFF.
    Tiff,
}

impl ImageKind {
    /// Extensions the format is known by; the first is canonical.
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Jpg => &[".jpg", ".jpeg"],
            Self::Png => &[".png"],
            Self::Tiff => &[".tif", ".tiff"],
        }
    }

    /// Keep `current` if the format knows it, else the canonical extension.
    pub fn extension_for(self, current: &str) -> &str {
        let lower = current.to_ascii_lowercase();
        match self.extensions().iter().find(|e| **e == lower) {
            Some(_) => current,
            None => self.extensions()[0],
        }
    }

    /// Format for an explicit option, or the automatic choice for `uri`
    /// holding pixels of `pixels` layout.
    pub fn select(format: TextureFormat, uri: &Uri, pixels: PixelFormat) -> Self {
        match format {
            TextureFormat::Jpg => Self::Jpg,
            TextureFormat::Png => Self::Png,
            TextureFormat::Tiff => Self::Tiff,
            TextureFormat::Auto => {
                let ext = uri.extension().to_ascii_lowercase();
                if let Some(kind) = [Self::Png, Self::Jpg, Self::Tiff]
                    .into_iter()
                    .find(|k| k.extensions().contains(&ext.as_str()))
                {
                    kind
                } else if matches!(pixels, PixelFormat::Rgb8 | PixelFormat::Grey8) {
                    Self::Jpg
                } else {
                    Self::Png
                }
            }
        }
    }

    const fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Tiff => ImageFormat::Tiff,
        }
    }
}

/// Desired file name for a re-encoded texture, before uniquifying.
///
/// The stem is the URI's `textureName` query or base name; memory textures
/// are prefixed with `prefix_`.
pub fn texture_file_name(uri: &Uri, prefix: &str, kind: ImageKind) -> String {
    let stem = uri.base_name();
    let stem = if uri.scheme() == UriScheme::Memory && !prefix.is_empty() {
        format!("{prefix}_{stem}")
    } else {
        stem.to_owned()
    };
    format!("{stem}{}", kind.extension_for(uri.extension()))
}

/// Encode `image` as `kind`.
pub fn encode_image(image: &TextureImage, kind: ImageKind) -> Result<Vec<u8>, image::ImageError> {
    let (w, h) = (image.width, image.height);
    let pixels = image.pixels.clone();
    let dynamic = match image.format {
        PixelFormat::Grey8 => ImageBuffer::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
        PixelFormat::Rgb8 => ImageBuffer::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        PixelFormat::Rgba8 => ImageBuffer::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8),
    };
    let Some(mut dynamic) = dynamic else {
        return Err(image::ImageError::Parameter(
            image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ),
        ));
    };
    // JPEG has no alpha channel
    if kind == ImageKind::Jpg && image.format == PixelFormat::Rgba8 {
        dynamic = DynamicImage::ImageRgb8(dynamic.to_rgb8());
    }
    let mut bytes = Vec::new();
    dynamic.write_to(&mut Cursor::new(&mut bytes), kind.image_format())?;
    Ok(bytes)
}

/// Resolves textures for one encode call.
///
/// Borrows the host registrar, the optional archive cache and the session's
/// name registry for the duration of a material conversion.
pub struct TextureResolver<'a, R: AssetRegistrar + ?Sized> {
    registrar: &'a mut R,
    archive: Option<&'a mut ArchiveCache>,
    names: &'a mut NameRegistry,
    format: TextureFormat,
    name_prefix: &'a str,
}

impl<'a, R: AssetRegistrar + ?Sized> TextureResolver<'a, R> {
    /// Resolver writing assets through `registrar`.
    pub fn new(
        registrar: &'a mut R,
        archive: Option<&'a mut ArchiveCache>,
        names: &'a mut NameRegistry,
        format: TextureFormat,
        name_prefix: &'a str,
    ) -> Self {
        Self {
            registrar,
            archive,
            names,
            format,
            name_prefix,
        }
    }

    /// Resolve `texture`, logging and swallowing any failure.
    pub fn resolve(&mut self, texture: &Texture) -> Option<String> {
        match self.try_resolve(texture) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(uri = %texture.uri, error = %err, "texture resolution failed");
                None
            }
        }
    }

    /// Resolve `texture`.
    pub fn try_resolve(&mut self, texture: &Texture) -> Result<String, TextureError> {
        let uri = &texture.uri;
        if !texture.valid {
            return Err(TextureError::Invalid(uri.to_string()));
        }
        match TextureStrategy::classify(uri) {
            TextureStrategy::Passthrough => uri
                .native_path()
                .ok_or_else(|| TextureError::NoNativePath(uri.to_string())),
            TextureStrategy::ArchiveExtract => self.extract(uri),
            TextureStrategy::Reencode => self.reencode(texture),
        }
    }

    fn extract(&mut self, uri: &Uri) -> Result<String, TextureError> {
        let key = uri.to_string();
        let archive = self
            .archive
            .as_deref_mut()
            .ok_or_else(|| TextureError::NoArchive(key.clone()))?;
        let bytes = archive.resolve(&key)?;
        // entry names and `textureName` queries come from rule authors
        let file_name =
            NameRegistry::legalize(&format!("{}{}", uri.base_name(), uri.extension()));
        debug!(uri = %key, file_name = %file_name, bytes = bytes.len(), "extracting archive texture");
        self.registrar
            .register_asset(&key, &file_name, &bytes)
            .ok_or(TextureError::Rejected(key))
    }

    fn reencode(&mut self, texture: &Texture) -> Result<String, TextureError> {
        let uri = &texture.uri;
        let image = texture
            .image
            .as_deref()
            .ok_or_else(|| TextureError::NoPixels(uri.to_string()))?;
        if image.pixels.len() != image.expected_len() {
            return Err(TextureError::PixelCount {
                uri: uri.to_string(),
                expected: image.expected_len(),
                actual: image.pixels.len(),
            });
        }
        let kind = ImageKind::select(self.format, uri, image.format);
        let bytes = encode_image(image, kind).map_err(|source| TextureError::Encode {
            uri: uri.to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(TextureError::EmptyOutput(uri.to_string()));
        }
        let name = texture_file_name(uri, self.name_prefix, kind);
        let file_name = self.names.legalize_and_uniquify(&name);
        debug!(uri = %uri, file_name = %file_name, ?kind, bytes = bytes.len(), "re-encoded texture");
        self.registrar
            .register_asset(&uri.to_string(), &file_name, &bytes)
            .ok_or_else(|| TextureError::Rejected(uri.to_string()))
    }
}

impl<R: AssetRegistrar + ?Sized> TexturePaths for TextureResolver<'_, R> {
    fn texture_path(&mut self, texture: &Texture) -> Option<String> {
        self.resolve(texture)
    }
}
