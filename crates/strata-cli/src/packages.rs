// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Archive backend over unpacked packages on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use strata_cas::{ArchiveSource, CasError};
use strata_geom_port::Uri;

/// Reads package entries from unpacked copies under a root directory.
///
/// Entry `/tex/roof.jpg` of container `.../rules.rpk` is read from
/// `<root>/rules.rpk/tex/roof.jpg`.
#[derive(Debug, Clone)]
pub struct UnpackedPackages {
    root: PathBuf,
}

impl UnpackedPackages {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, uri: &str) -> Result<PathBuf, CasError> {
        let parsed = Uri::parse(uri).map_err(|err| CasError::Backend {
            uri: uri.to_owned(),
            message: err.to_string(),
        })?;
        let missing = || CasError::Missing {
            uri: uri.to_owned(),
        };
        let container = parsed.container().ok_or_else(missing)?;
        let entry = Path::new(parsed.path().trim_start_matches('/'));
        // entries never leave their package directory
        if entry
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(missing());
        }
        Ok(self.root.join(container.file_name()).join(entry))
    }
}

impl ArchiveSource for UnpackedPackages {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, CasError> {
        let path = self.entry_path(uri)?;
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => CasError::Missing {
                uri: uri.to_owned(),
            },
            _ => CasError::Backend {
                uri: uri.to_owned(),
                message: format!("{}: {err}", path.display()),
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strata_geom_port::UriScheme;

    #[test]
    fn entries_resolve_under_container_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("rules.rpk/tex")).unwrap();
        fs::write(dir.path().join("rules.rpk/tex/roof.jpg"), [1, 2, 3]).unwrap();

        let uri = Uri::package(UriScheme::Rpk, Uri::file("/assets/rules.rpk"), "/tex/roof.jpg");
        let packages = UnpackedPackages::new(dir.path());
        assert_eq!(packages.fetch(&uri.to_string()).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn absent_entries_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Uri::package(UriScheme::Zip, Uri::file("/a.zip"), "/nope.png");
        let err = UnpackedPackages::new(dir.path())
            .fetch(&uri.to_string())
            .unwrap_err();
        assert!(matches!(err, CasError::Missing { .. }));
    }

    #[test]
    fn escaping_entries_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Uri::package(UriScheme::Zip, Uri::file("/a.zip"), "/../secret.png");
        let err = UnpackedPackages::new(dir.path())
            .fetch(&uri.to_string())
            .unwrap_err();
        assert!(matches!(err, CasError::Missing { .. }));
    }

    #[test]
    fn plain_uris_have_no_entry() {
        let packages = UnpackedPackages::new("/unused");
        assert!(matches!(
            packages.fetch("file:/tex/a.png"),
            Err(CasError::Missing { .. })
        ));
    }
}
