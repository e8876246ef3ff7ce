//! Snapshot persistence for the registry and per-user gamification data.
//!
//! The engine treats storage as a pass-through cache: it reads everything on
//! hydration and replaces everything on flush.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::workflows::compliance::{AuditLogEntry, License, StateProfile};
use crate::workflows::gamification::GamificationData;

/// Everything the registry needs to be rebuilt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub states: Vec<StateProfile>,
    #[serde(default)]
    pub licenses: Vec<License>,
    #[serde(default)]
    pub archived_audit: Vec<AuditLogEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed snapshot at {path}: {source}")]
    Serde {
        path: String,
        source: serde_json::Error,
    },
    #[error("snapshot rejected: {0}")]
    Corrupt(String),
}

/// Durable storage collaborator with read-all / replace-all semantics.
pub trait SnapshotStore: Send + Sync {
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError>;
    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError>;
    fn load_gamification(&self, user_id: &str)
        -> Result<Option<GamificationData>, PersistenceError>;
    fn save_gamification(
        &self,
        user_id: &str,
        data: &GamificationData,
    ) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    registry: Mutex<RegistrySnapshot>,
    gamification: Mutex<HashMap<String, GamificationData>>,
}

impl MemorySnapshotStore {
    pub fn with_registry(snapshot: RegistrySnapshot) -> Self {
        Self {
            registry: Mutex::new(snapshot),
            gamification: Mutex::new(HashMap::new()),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError> {
        Ok(self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        *self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot.clone();
        Ok(())
    }

    fn load_gamification(
        &self,
        user_id: &str,
    ) -> Result<Option<GamificationData>, PersistenceError> {
        Ok(self
            .gamification
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(user_id)
            .cloned())
    }

    fn save_gamification(
        &self,
        user_id: &str,
        data: &GamificationData,
    ) -> Result<(), PersistenceError> {
        self.gamification
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user_id.to_string(), data.clone());
        Ok(())
    }
}

/// JSON documents under a data directory:
/// `registry.json` and `gamification/<user>-<digest>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    /// One file per user: a readable slug plus a digest of the exact id, so
    /// ids that slug alike (`a@b.c`, `a_b_c`) never share a file.
    pub fn gamification_path(&self, user_id: &str) -> PathBuf {
        let digest = Sha256::digest(user_id.as_bytes());
        let slug: String = user_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root
            .join("gamification")
            .join(format!("{slug}-{}.json", hex::encode(&digest[..16])))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| PersistenceError::Serde {
            path: path.display().to_string(),
            source,
        })
}

/// Write via a sibling temp file and rename so readers never see a torn file.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let io_error = |source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Serde {
        path: path.display().to_string(),
        source,
    })?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes).map_err(io_error)?;
    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        io_error(source)
    })
}

impl SnapshotStore for JsonFileStore {
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError> {
        Ok(read_json(&self.registry_path())?.unwrap_or_default())
    }

    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        write_json(&self.registry_path(), snapshot)
    }

    fn load_gamification(
        &self,
        user_id: &str,
    ) -> Result<Option<GamificationData>, PersistenceError> {
        read_json(&self.gamification_path(user_id))
    }

    fn save_gamification(
        &self,
        user_id: &str,
        data: &GamificationData,
    ) -> Result<(), PersistenceError> {
        write_json(&self.gamification_path(user_id), data)
    }
}
