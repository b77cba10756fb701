// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `ConfigStore` over a directory of `<key>.json` files.
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so a
//! crashed save never leaves a half-written config behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use strata_app_core::config::{validate_key, ConfigError, ConfigStore};

/// JSON files under one base directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl FsConfigStore {
    /// Store in the platform config directory (e.g. `~/.config/strata`).
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("dev", "flyingrobots", "Strata").ok_or_else(|| {
            ConfigError::NoLocation("no home directory for the current user".into())
        })?;
        Self::at(dirs.config_dir())
    }

    /// Store rooted at `base`; the directory is created if missing.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base).map_err(io_error(&base))?;
        Ok(Self { base })
    }

    /// Directory holding the config files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ConfigError> {
        validate_key(key)?;
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, data).map_err(io_error(&staging))?;
        fs::rename(&staging, &path).map_err(io_error(&path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strata_app_core::config::ConfigService;

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        assert!(store.load_raw("encoder").unwrap().is_none());
    }

    #[test]
    fn saves_land_in_key_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let svc = ConfigService::new(FsConfigStore::at(dir.path().join("nested")).unwrap());
        svc.save("encoder", &vec![1u32, 2, 3]).unwrap();
        assert!(dir.path().join("nested/encoder.json").exists());
        assert!(!dir.path().join("nested/encoder.json.tmp").exists());
        assert_eq!(svc.load::<Vec<u32>>("encoder").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn traversal_keys_never_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        assert!(matches!(
            store.save_raw("../escape", b"{}"),
            Err(ConfigError::InvalidKey { .. })
        ));
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }
}
