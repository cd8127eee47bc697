//! Persisted parameter defaults
//!
//! Defaults live in a TOML file keyed by `default_<parameter>`:
//!
//! ```toml
//! default_host = "db.internal"
//! default_port = 5432
//! default_prompt_for_password = true
//! default_files = ["schema.sql", "seed.sql"]
//! ```
//!
//! [`SettingsWatcher`] reloads a [`ParameterStore`] whenever that file
//! changes on disk.

use crate::core::error::{Error, Result};
use crate::core::parameter::{ParameterKey, ParameterValue};
use crate::core::store::ParameterStore;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Backing source of persisted parameter defaults
pub trait SettingsSource: Send + Sync {
    /// Read the persisted default for `key`, if one is stored
    fn get(&self, key: ParameterKey) -> Option<ParameterValue>;

    /// Re-read the backing storage
    fn reload(&self) -> Result<()> {
        Ok(())
    }

    /// Persist `values` as the new defaults for their keys, leaving other
    /// stored keys untouched
    fn store(&self, values: &BTreeMap<ParameterKey, ParameterValue>) -> Result<()>;
}

/// Settings held in memory only
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<BTreeMap<ParameterKey, ParameterValue>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an initial set of defaults
    pub fn with_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (ParameterKey, V)>,
        V: Into<ParameterValue>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }

    /// Replace a single default, as an external edit of the settings would
    pub fn put(&self, key: ParameterKey, value: impl Into<ParameterValue>) {
        self.values.write().insert(key, value.into());
    }

    pub fn remove(&self, key: ParameterKey) {
        self.values.write().remove(&key);
    }
}

impl SettingsSource for MemorySettings {
    fn get(&self, key: ParameterKey) -> Option<ParameterValue> {
        self.values.read().get(&key).cloned()
    }

    fn store(&self, values: &BTreeMap<ParameterKey, ParameterValue>) -> Result<()> {
        let mut stored = self.values.write();
        for (key, value) in values {
            stored.insert(*key, value.clone());
        }
        Ok(())
    }
}

/// Settings loaded from a TOML file
#[derive(Debug)]
pub struct TomlSettings {
    path: PathBuf,
    table: RwLock<toml::Table>,
}

impl TomlSettings {
    /// Open the settings file at `path`. A missing file is treated as empty
    /// and only created once something is saved.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = read_table(&path)?;
        Ok(Self {
            path,
            table: RwLock::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for TomlSettings {
    fn get(&self, key: ParameterKey) -> Option<ParameterValue> {
        self.table
            .read()
            .get(&key.settings_key())
            .cloned()
            .and_then(ParameterValue::from_toml)
            .map(|value| value.coerce_for(key))
    }

    fn reload(&self) -> Result<()> {
        let table = read_table(&self.path)?;
        *self.table.write() = table;
        debug!("Reloaded settings from {}", self.path.display());
        Ok(())
    }

    fn store(&self, values: &BTreeMap<ParameterKey, ParameterValue>) -> Result<()> {
        // Start from what is on disk so edits made since the last reload survive
        let mut table = read_table(&self.path)?;
        for (key, value) in values {
            table.insert(key.settings_key(), value.to_toml());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&table)?;
        std::fs::write(&self.path, content)?;

        *self.table.write() = table;
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    if !path.exists() {
        return Ok(toml::Table::new());
    }
    let content = std::fs::read_to_string(path)?;
    content.parse::<toml::Table>().map_err(|e| {
        Error::settings(format!(
            "Failed to parse settings file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Watches a settings file and reloads a store whenever it changes
///
/// The watcher stops when this value is dropped.
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl SettingsWatcher {
    pub fn spawn<P: AsRef<Path>>(path: P, store: Arc<ParameterStore>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| Error::settings(format!("{} is not a file path", path.display())))?;

        // Watch the directory: editors often replace the file instead of
        // writing it in place.
        let watch_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant {
                        if let Err(e) = store.reload() {
                            warn!("Failed to reload settings: {}", e);
                        }
                    }
                }
                Err(e) => warn!("Settings watcher error: {}", e),
            }
        })?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        debug!("Watching {} for settings changes", path.display());

        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
