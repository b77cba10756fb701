// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Asset URIs.
//!
//! Supported forms:
//!
//! | Form | Scheme |
//! |---|---|
//! | `file:/abs/path.png`, `file:///abs/path.png` | [`UriScheme::File`] |
//! | `file://host/share/path.png` | [`UriScheme::Unc`] |
//! | `rpk:<uri>!/entry.png`, `zip:<uri>!/entry.png` | [`UriScheme::Rpk`], [`UriScheme::Zip`] (composite) |
//! | `memory://id/name.png` | [`UriScheme::Memory`] |
//! | `builtin:name` | [`UriScheme::Builtin`] |
//!
//! Any form may carry a `?key=value&...` query.

use core::fmt;

use thiserror::Error;

/// URI parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    /// Empty input.
    #[error("empty uri")]
    Empty,
    /// Scheme is not one of the supported ones.
    #[error("unsupported uri scheme in '{0}'")]
    UnsupportedScheme(String),
    /// Composite URI without a `!` entry separator.
    #[error("composite uri '{0}' has no entry separator")]
    MissingEntry(String),
}

/// URI scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UriScheme {
    /// Local filesystem.
    File,
    /// Network share (`file://host/...`).
    Unc,
    /// Entry inside a rule package.
    Rpk,
    /// Entry inside a zip archive.
    Zip,
    /// In-memory asset owned by the generator.
    Memory,
    /// Asset built into the generator.
    Builtin,
}

impl UriScheme {
    /// Returns `true` for archive container schemes.
    pub fn is_package(self) -> bool {
        matches!(self, Self::Rpk | Self::Zip)
    }
}

/// Reference to an asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Uri {
    scheme: UriScheme,
    authority: String,
    path: String,
    container: Option<Box<Uri>>,
    query: Vec<(String, String)>,
}

/// Query key carrying the preferred texture name.
const QUERY_TEXTURE_NAME: &str = "textureName";

impl Uri {
    /// Local file URI.
    pub fn file(path: impl Into<String>) -> Self {
        Self::plain(UriScheme::File, String::new(), ensure_rooted(path.into()))
    }

    /// Network share URI.
    pub fn unc(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::plain(UriScheme::Unc, host.into(), ensure_rooted(path.into()))
    }

    /// In-memory asset URI.
    pub fn memory(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::plain(UriScheme::Memory, id.into(), ensure_rooted(path.into()))
    }

    /// Builtin asset URI.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::plain(UriScheme::Builtin, String::new(), name.into())
    }

    /// Entry `entry` inside the archive at `container`.
    ///
    /// `scheme` should be a package scheme; other schemes are coerced to
    /// [`UriScheme::Rpk`].
    pub fn package(scheme: UriScheme, container: Uri, entry: impl Into<String>) -> Self {
        let scheme = if scheme.is_package() {
            scheme
        } else {
            UriScheme::Rpk
        };
        Self {
            scheme,
            authority: String::new(),
            path: ensure_rooted(entry.into()),
            container: Some(Box::new(container)),
            query: Vec::new(),
        }
    }

    fn plain(scheme: UriScheme, authority: String, path: String) -> Self {
        Self {
            scheme,
            authority,
            path,
            container: None,
            query: Vec::new(),
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Parse a URI string.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        if input.is_empty() {
            return Err(UriError::Empty);
        }
        let (body, query) = match input.split_once('?') {
            Some((body, query)) => (body, parse_query(query)),
            None => (input, Vec::new()),
        };
        let mut uri = parse_body(body)?;
        uri.query = query;
        Ok(uri)
    }

    /// Scheme.
    pub fn scheme(&self) -> UriScheme {
        self.scheme
    }

    /// Authority (host or memory id); empty when absent.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Path (entry path for composite URIs).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Archive holding this entry, for composite URIs.
    pub fn container(&self) -> Option<&Uri> {
        self.container.as_deref()
    }

    /// Returns `true` if this URI points into another asset.
    pub fn is_composite(&self) -> bool {
        self.container.is_some()
    }

    /// Query value for `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// OS-native path for filesystem and share URIs.
    pub fn native_path(&self) -> Option<String> {
        if self.is_composite() {
            return None;
        }
        match self.scheme {
            UriScheme::File => Some(strip_drive_slash(&self.path).to_owned()),
            UriScheme::Unc => Some(format!(
                "\\\\{}{}",
                self.authority,
                self.path.replace('/', "\\")
            )),
            _ => None,
        }
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Extension of the last path segment including the dot, or empty.
    pub fn extension(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[dot..],
            _ => "",
        }
    }

    /// Preferred base name: the `textureName` query if present, otherwise the
    /// last path segment without its extension.
    pub fn base_name(&self) -> &str {
        if let Some(name) = self.query_value(QUERY_TEXTURE_NAME) {
            if !name.is_empty() {
                return name;
            }
        }
        let name = self.file_name();
        let ext = self.extension();
        &name[..name.len() - ext.len()]
    }
}

fn parse_body(body: &str) -> Result<Uri, UriError> {
    let (scheme, rest) = body
        .split_once(':')
        .ok_or_else(|| UriError::UnsupportedScheme(body.to_owned()))?;
    match scheme {
        "rpk" | "zip" => {
            let (inner, entry) = rest
                .rsplit_once('!')
                .ok_or_else(|| UriError::MissingEntry(body.to_owned()))?;
            let scheme = if scheme == "rpk" {
                UriScheme::Rpk
            } else {
                UriScheme::Zip
            };
            Ok(Uri::package(scheme, parse_body(inner)?, entry))
        }
        "file" => match rest.strip_prefix("//") {
            Some(after) if after.starts_with('/') => Ok(Uri::file(after)),
            Some(after) => {
                let (host, path) = after.split_once('/').unwrap_or((after, ""));
                Ok(Uri::unc(host, path))
            }
            None => Ok(Uri::file(rest)),
        },
        "memory" => {
            let after = rest.strip_prefix("//").unwrap_or(rest);
            let (id, path) = after.split_once('/').unwrap_or((after, ""));
            Ok(Uri::memory(id, path))
        }
        "builtin" => Ok(Uri::builtin(rest)),
        _ => Err(UriError::UnsupportedScheme(body.to_owned())),
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k.to_owned(), v.to_owned())
        })
        .collect()
}

fn ensure_rooted(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

// `/C:/dir/file` -> `C:/dir/file`
fn strip_drive_slash(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        &path[1..]
    } else {
        path
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.container, self.scheme) {
            (Some(container), UriScheme::Zip) => write!(f, "zip:{container}!{}", self.path)?,
            (Some(container), _) => write!(f, "rpk:{container}!{}", self.path)?,
            (None, UriScheme::File) => write!(f, "file:{}", self.path)?,
            (None, UriScheme::Unc) => write!(f, "file://{}{}", self.authority, self.path)?,
            (None, UriScheme::Memory) => write!(f, "memory://{}{}", self.authority, self.path)?,
            (None, UriScheme::Builtin) => write!(f, "builtin:{}", self.path)?,
            (None, UriScheme::Rpk | UriScheme::Zip) => write!(f, "rpk:{}", self.path)?,
        }
        for (i, (k, v)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Uri {
    type Error = UriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.to_string()
    }
}
