// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named JSON settings behind a storage port.
//!
//! Keys are short lowercase identifiers (`encoder`, `cli-defaults`) because
//! stores are free to map them onto file names.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Raw byte storage for settings blobs.
pub trait ConfigStore {
    /// Bytes stored under `key`, or `None` when nothing was saved.
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError>;
    /// Replace the bytes stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failures while reading or writing settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key is empty or uses characters outside `[a-z0-9_-]`.
    #[error("invalid config key {key:?}")]
    InvalidKey {
        /// Offending key.
        key: String,
    },
    /// Stored bytes are not valid JSON for the requested type.
    #[error("config {key:?} is malformed: {source}")]
    Malformed {
        /// Key being read.
        key: String,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// Value could not be serialized.
    #[error("config {key:?} could not be serialized: {source}")]
    Unserializable {
        /// Key being written.
        key: String,
        /// Serializer failure.
        #[source]
        source: serde_json::Error,
    },
    /// Backend I/O failure.
    #[error("config storage at {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The store has no usable location.
    #[error("no config location: {0}")]
    NoLocation(String),
}

/// Reject keys a store could not safely map to a file name.
pub fn validate_key(key: &str) -> Result<(), ConfigError> {
    let ok = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidKey { key: key.to_owned() })
    }
}

/// Typed access to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Value under `key`; `None` when absent or stored empty.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        validate_key(key)?;
        let Some(bytes) = self.store.load_raw(key)? else {
            return Ok(None);
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ConfigError::Malformed {
                key: key.to_owned(),
                source,
            })
    }

    /// Value under `key`, or `T::default()` when absent.
    pub fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, ConfigError> {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Store `value` under `key` as pretty JSON.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        validate_key(key)?;
        let data =
            serde_json::to_vec_pretty(value).map_err(|source| ConfigError::Unserializable {
                key: key.to_owned(),
                source,
            })?;
        self.store.save_raw(key, &data)
    }
}

/// Store held in process memory, for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    blobs: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.blobs.borrow().get(key).cloned())
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.blobs.borrow_mut().insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        level: u8,
    }

    #[test]
    fn absent_and_blank_values_load_as_none() {
        let store = MemoryConfigStore::new();
        store.save_raw("blank", b"  \n").unwrap();
        let svc = ConfigService::new(store);
        assert!(svc.load::<Sample>("absent").unwrap().is_none());
        assert!(svc.load::<Sample>("blank").unwrap().is_none());
        assert_eq!(svc.load_or_default::<Sample>("absent").unwrap(), Sample::default());
    }

    #[test]
    fn saved_values_load_back() {
        let svc = ConfigService::new(MemoryConfigStore::new());
        let value = Sample {
            name: "encoder".into(),
            level: 3,
        };
        svc.save("sample", &value).unwrap();
        assert_eq!(svc.load::<Sample>("sample").unwrap(), Some(value));
    }

    #[test]
    fn malformed_blob_names_its_key() {
        let store = MemoryConfigStore::new();
        store.save_raw("bad", b"{ nope").unwrap();
        let svc = ConfigService::new(store);
        let err = svc.load::<Sample>("bad").unwrap_err();
        assert!(matches!(&err, ConfigError::Malformed { key, .. } if key == "bad"));
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let svc = ConfigService::new(MemoryConfigStore::new());
        for key in ["", "../encoder", "Encoder", "a/b", "x.json"] {
            assert!(matches!(
                svc.save(key, &1u8),
                Err(ConfigError::InvalidKey { .. })
            ));
        }
        assert!(validate_key("cli-defaults_2").is_ok());
    }
}
