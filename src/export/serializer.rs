//! Framed, checksummed artifact files

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, ScorelineError};

/// Something the object store can persist.
///
/// `KIND` is written into the file header so a preprocessor can never be
/// loaded where a model is expected.
pub trait Artifact: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

/// On-disk envelope around a bincode payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactEnvelope {
    magic: [u8; 4],
    format_version: u32,
    kind: String,
    checksum: u32,
    payload: Vec<u8>,
}

impl ArtifactEnvelope {
    const MAGIC: [u8; 4] = *b"SCRL";
    const VERSION: u32 = 1;

    fn new(kind: &str, payload: Vec<u8>) -> Self {
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            kind: kind.to_string(),
            checksum: crc32fast::hash(&payload),
            payload,
        }
    }

    fn verify(&self, expected_kind: &str) -> std::result::Result<(), String> {
        if self.magic != Self::MAGIC {
            return Err("not a scoreline artifact".to_string());
        }
        if self.format_version != Self::VERSION {
            return Err(format!("unsupported format version {}", self.format_version));
        }
        if self.kind != expected_kind {
            return Err(format!("expected a {} artifact, found {}", expected_kind, self.kind));
        }
        if crc32fast::hash(&self.payload) != self.checksum {
            return Err("checksum mismatch, file may be corrupted".to_string());
        }
        Ok(())
    }
}

/// Saves and loads artifacts at filesystem paths.
///
/// Writes go to a temporary sibling that is synced and renamed over the
/// target, so readers see either the old file or the complete new one.
#[derive(Debug, Clone, Default)]
pub struct ObjectStore;

impl ObjectStore {
    pub fn new() -> Self {
        Self
    }

    pub fn save<T: Artifact>(&self, path: impl AsRef<Path>, object: &T) -> Result<()> {
        let path = path.as_ref();
        let payload = bincode::serialize(object)
            .map_err(|e| ScorelineError::storage(path, format!("failed to serialize: {}", e)))?;
        let envelope = ArtifactEnvelope::new(T::KIND, payload);
        let bytes = bincode::serialize(&envelope)
            .map_err(|e| ScorelineError::storage(path, format!("failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ScorelineError::storage(path, format!("failed to create directory: {}", e))
            })?;
        }

        let temp_path = temp_path_for(path)?;
        if let Err(e) = self.write_temp(&temp_path, &bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(ScorelineError::storage(path, format!("failed to write: {}", e)));
        }
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ScorelineError::storage(path, format!("atomic rename failed: {}", e)));
        }

        info!(path = %path.display(), kind = T::KIND, bytes = bytes.len(), "Artifact saved");
        Ok(())
    }

    pub fn load<T: Artifact>(&self, path: impl AsRef<Path>) -> Result<T> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| ScorelineError::storage(path, format!("failed to read: {}", e)))?;
        let envelope: ArtifactEnvelope = bincode::deserialize(&bytes)
            .map_err(|e| ScorelineError::storage(path, format!("malformed artifact: {}", e)))?;
        envelope
            .verify(T::KIND)
            .map_err(|reason| ScorelineError::storage(path, reason))?;

        let object = bincode::deserialize(&envelope.payload)
            .map_err(|e| ScorelineError::storage(path, format!("failed to deserialize: {}", e)))?;
        debug!(path = %path.display(), kind = T::KIND, "Artifact loaded");
        Ok(object)
    }

    fn write_temp(&self, temp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

/// Save with the default store
pub fn save_object<T: Artifact>(path: impl AsRef<Path>, object: &T) -> Result<()> {
    ObjectStore::new().save(path, object)
}

/// Load with the default store
pub fn load_object<T: Artifact>(path: impl AsRef<Path>) -> Result<T> {
    ObjectStore::new().load(path)
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ScorelineError::storage(path, "path has no file name"))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    Ok(path.with_file_name(temp_name))
}
