//! Override layer kept between invocations
//!
//! An editor keeps overrides in memory for as long as it runs. Each CLI
//! invocation is a fresh process, so the overrides are read from
//! `overrides.toml` in the data directory on start and written back when a
//! command changed them. Secret parameters are never written.

use crate::cli::error::Result;
use crate::core::error::Error;
use crate::core::parameter::{ParameterKey, ParameterValue};
use crate::core::store::ParameterStore;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const OVERRIDES_FILE: &str = "overrides.toml";

#[derive(Debug, Clone)]
pub struct OverrideFile {
    path: PathBuf,
}

impl OverrideFile {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(OVERRIDES_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply the stored overrides to `store`, returning how many were set
    pub fn load_into(&self, store: &ParameterStore) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let table: toml::Table = toml::from_str(&content).map_err(|e| {
            Error::settings(format!("{}: {}", self.path.display(), e))
        })?;

        let mut loaded = 0;
        for (name, value) in table {
            let key: ParameterKey = match name.parse() {
                Ok(key) => key,
                Err(_) => {
                    warn!("Ignoring unknown override '{}' in {}", name, self.path.display());
                    continue;
                }
            };
            if let Some(value) = ParameterValue::from_toml(value) {
                store.set(key, value)?;
                loaded += 1;
            }
        }
        debug!("Loaded {} overrides from {}", loaded, self.path.display());
        Ok(loaded)
    }

    /// Replace the file with the current override layer of `store`
    pub fn save_from(&self, store: &ParameterStore) -> Result<()> {
        // Secrets stay in memory only
        let overrides: Vec<_> = store
            .overrides()
            .into_iter()
            .filter(|(key, _)| !key.is_secret())
            .collect();
        if overrides.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        let table: toml::Table = overrides
            .iter()
            .map(|(key, value)| (key.name().to_string(), value.to_toml()))
            .collect();
        let content = toml::to_string_pretty(&table).map_err(Error::from)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
