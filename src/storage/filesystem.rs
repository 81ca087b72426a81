//! JSON file store
//!
//! Keeps the account snapshot in a single pretty-printed JSON file.

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use super::{AccountStore, Snapshot};
use crate::error::StoreError;

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl AccountStore for JsonFileStore {
    /// Creates an empty store file on first use
    fn load(&self) -> Result<Snapshot, StoreError> {
        if !self.path.exists() {
            info!("Creating account store at {}", self.path.display());
            let empty = Snapshot::new();
            self.save(&empty)?;
            return Ok(empty);
        }

        let data = fs::read(&self.path)?;
        let snapshot: Snapshot = serde_json::from_slice(&data)?;
        info!(
            "Loaded {} account(s) from {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, data)?;
        fs::rename(&temp, &self.path)?;

        debug!(
            "Saved {} account(s) to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}
