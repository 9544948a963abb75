//! Argus Store - Dedup persistence
//!
//! The seen set is a JSON array of record ids, sorted and pretty-printed so
//! it diffs cleanly under version control.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_SEEN_PATH: &str = "data/processed/seen.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode seen set: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Ids already handed to the sink in earlier runs.
pub type SeenSet = BTreeSet<String>;

/// File-backed seen set.
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the seen set. A missing, unreadable or malformed file yields the
    /// empty set.
    pub fn load(&self) -> SeenSet {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No seen file at {:?}, starting empty", self.path);
                return SeenSet::new();
            }
            Err(e) => {
                warn!("Could not read seen file {:?}: {}", self.path, e);
                return SeenSet::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => {
                let seen: SeenSet = ids.into_iter().collect();
                info!("Loaded {} seen ids from {:?}", seen.len(), self.path);
                seen
            }
            Err(e) => {
                warn!("Ignoring malformed seen file {:?}: {}", self.path, e);
                SeenSet::new()
            }
        }
    }

    /// Replace the stored set with `seen`, creating parent directories.
    pub fn save(&self, seen: &SeenSet) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let ids: Vec<&String> = seen.iter().collect();
        let json = serde_json::to_string_pretty(&ids)?;

        // Readers never observe a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!("Saved {} seen ids to {:?}", seen.len(), self.path);
        Ok(())
    }
}

impl Default for SeenStore {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_PATH)
    }
}
