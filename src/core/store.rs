//! Layered parameter store
//!
//! Each parameter is looked up in three layers, highest precedence first:
//!
//! 1. overrides, set explicitly and kept until unset,
//! 2. cached defaults, filled lazily from the settings source,
//! 3. the settings source itself, read on a cache miss.
//!
//! Reloading drops the cached defaults but never the overrides.

use crate::core::error::{Error, Result};
use crate::core::parameter::{IntoParameterKey, ParameterKey, ParameterValue};
use crate::core::settings::SettingsSource;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Layer a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Override,
    Invocation,
    Default,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Override => "override",
            Self::Invocation => "invocation",
            Self::Default => "default",
        })
    }
}

/// Connection parameters shared by every command of one editor process
pub struct ParameterStore {
    settings: Arc<dyn SettingsSource>,
    overrides: RwLock<BTreeMap<ParameterKey, ParameterValue>>,
    defaults: RwLock<BTreeMap<ParameterKey, ParameterValue>>,
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("overrides", &self.overrides.read().keys().collect::<Vec<_>>())
            .field("defaults", &self.defaults.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ParameterStore {
    pub fn new(settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            settings,
            overrides: RwLock::new(BTreeMap::new()),
            defaults: RwLock::new(BTreeMap::new()),
        }
    }

    /// Value of `key`, failing with [`Error::MissingParameter`] when no layer
    /// has one
    pub fn get<K: IntoParameterKey>(&self, key: K) -> Result<ParameterValue> {
        let key = key.into_parameter_key()?;
        self.lookup(key).ok_or(Error::MissingParameter(key))
    }

    /// Value of `key`, or `None` when no layer has one
    pub fn try_get<K: IntoParameterKey>(&self, key: K) -> Result<Option<ParameterValue>> {
        let key = key.into_parameter_key()?;
        Ok(self.lookup(key))
    }

    /// Whether any layer has a value for `key`. Reads and caches the
    /// persisted default, exactly as [`get`](Self::get) would.
    pub fn contains<K: IntoParameterKey>(&self, key: K) -> Result<bool> {
        let key = key.into_parameter_key()?;
        Ok(self.lookup(key).is_some())
    }

    pub fn set<K, V>(&self, key: K, value: V) -> Result<()>
    where
        K: IntoParameterKey,
        V: Into<ParameterValue>,
    {
        let key = key.into_parameter_key()?;
        self.overrides
            .write()
            .insert(key, value.into().coerce_for(key));
        debug!("Override set for {}", key);
        Ok(())
    }

    /// Remove the override for `key`. Unsetting a key that has no override
    /// is not an error.
    pub fn unset<K: IntoParameterKey>(&self, key: K) -> Result<()> {
        let key = key.into_parameter_key()?;
        if self.overrides.write().remove(&key).is_some() {
            debug!("Override unset for {}", key);
        }
        Ok(())
    }

    /// Put a value into the default cache; it lasts until the next reload
    pub fn cache_default(&self, key: ParameterKey, value: impl Into<ParameterValue>) {
        self.defaults.write().insert(key, value.into());
    }

    /// Drop every cached default and re-read the settings source. Overrides
    /// are kept.
    pub fn reload(&self) -> Result<()> {
        self.defaults.write().clear();
        self.settings.reload()?;
        // A lookup racing the source reload may have cached a stale value
        self.defaults.write().clear();
        debug!("Parameter defaults reloaded");
        Ok(())
    }

    pub fn has_overrides(&self) -> bool {
        !self.overrides.read().is_empty()
    }

    /// Snapshot of the override layer
    pub fn overrides(&self) -> BTreeMap<ParameterKey, ParameterValue> {
        self.overrides.read().clone()
    }

    /// Persist every override as the new default for its key. Returns the
    /// number of parameters saved.
    pub fn save(&self) -> Result<usize> {
        let overrides = self.overrides();
        if overrides.is_empty() {
            return Ok(0);
        }
        self.settings.store(&overrides)?;
        self.reload()?;
        Ok(overrides.len())
    }

    /// Which layer currently supplies `key`
    pub fn layer_of(&self, key: ParameterKey) -> Option<Layer> {
        if self.overrides.read().contains_key(&key) {
            Some(Layer::Override)
        } else if self.lookup(key).is_some() {
            Some(Layer::Default)
        } else {
            None
        }
    }

    /// Materialise every parameter for one invocation.
    ///
    /// Per-invocation values sit between the overrides and the defaults. They
    /// are kept even when empty, so an explicitly empty password reaches the
    /// client.
    pub fn resolve(
        &self,
        invocation: &BTreeMap<ParameterKey, ParameterValue>,
    ) -> ResolvedParameters {
        let overrides = self.overrides();
        let mut values = BTreeMap::new();
        let mut layers = BTreeMap::new();

        for key in ParameterKey::ALL {
            let found = if let Some(value) = overrides.get(&key) {
                Some((value.clone(), Layer::Override))
            } else if let Some(value) = invocation.get(&key) {
                Some((value.clone(), Layer::Invocation))
            } else {
                self.lookup(key).map(|value| (value, Layer::Default))
            };

            if let Some((value, layer)) = found {
                values.insert(key, value);
                layers.insert(key, layer);
            }
        }

        ResolvedParameters { values, layers }
    }

    fn lookup(&self, key: ParameterKey) -> Option<ParameterValue> {
        if let Some(value) = self.overrides.read().get(&key) {
            return Some(value.clone());
        }
        if let Some(value) = self.defaults.read().get(&key) {
            return Some(value.clone());
        }

        let value = self.settings.get(key).filter(ParameterValue::is_truthy)?;
        self.defaults.write().insert(key, value.clone());
        Some(value)
    }
}

/// Read-only view of the parameters used by one invocation
#[derive(Debug, Clone, Default)]
pub struct ResolvedParameters {
    values: BTreeMap<ParameterKey, ParameterValue>,
    layers: BTreeMap<ParameterKey, Layer>,
}

impl ResolvedParameters {
    /// Build a view directly from values, all attributed to the invocation
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (ParameterKey, V)>,
        V: Into<ParameterValue>,
    {
        let values: BTreeMap<_, _> = values.into_iter().map(|(k, v)| (k, v.into())).collect();
        let layers = values.keys().map(|k| (*k, Layer::Invocation)).collect();
        Self { values, layers }
    }

    pub fn get(&self, key: ParameterKey) -> Option<&ParameterValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: ParameterKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Whether `key` is present with a truthy value
    pub fn is_set(&self, key: ParameterKey) -> bool {
        self.get(key).is_some_and(ParameterValue::is_truthy)
    }

    pub fn layer(&self, key: ParameterKey) -> Option<Layer> {
        self.layers.get(&key).copied()
    }

    pub fn insert(&mut self, key: ParameterKey, value: impl Into<ParameterValue>) {
        self.values.insert(key, value.into());
        self.layers.insert(key, Layer::Invocation);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::MemorySettings;
    use proptest::prelude::*;

    fn store_with(settings: MemorySettings) -> (Arc<MemorySettings>, ParameterStore) {
        let settings = Arc::new(settings);
        let store = ParameterStore::new(settings.clone());
        (settings, store)
    }

    #[test]
    fn test_get_unknown_name_fails() {
        let (_, store) = store_with(MemorySettings::new());
        assert!(matches!(
            store.get("hots"),
            Err(Error::UnknownParameter(_))
        ));
        assert!(matches!(
            store.set("hots", "x"),
            Err(Error::UnknownParameter(_))
        ));
        assert!(matches!(store.unset("hots"), Err(Error::UnknownParameter(_))));
        assert!(matches!(
            store.contains("hots"),
            Err(Error::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_get_absent_fails_explicitly() {
        let (_, store) = store_with(MemorySettings::new());
        assert!(matches!(
            store.get(ParameterKey::Password),
            Err(Error::MissingParameter(ParameterKey::Password))
        ));
        assert_eq!(store.try_get(ParameterKey::Password).unwrap(), None);
        assert!(!store.contains(ParameterKey::Password).unwrap());
    }

    #[test]
    fn test_override_takes_precedence_over_default() {
        let (_, store) = store_with(MemorySettings::with_values([(ParameterKey::Host, "db")]));
        assert_eq!(store.get("host").unwrap(), ParameterValue::from("db"));

        store.set("host", "override").unwrap();
        assert_eq!(store.get("host").unwrap(), ParameterValue::from("override"));

        store.unset("host").unwrap();
        assert_eq!(store.get("host").unwrap(), ParameterValue::from("db"));
    }

    #[test]
    fn test_unset_without_default_makes_key_absent() {
        let (_, store) = store_with(MemorySettings::new());
        store.set(ParameterKey::User, "alice").unwrap();
        assert!(store.contains(ParameterKey::User).unwrap());
        store.unset(ParameterKey::User).unwrap();
        assert!(!store.contains(ParameterKey::User).unwrap());
        // unsetting twice is fine
        store.unset(ParameterKey::User).unwrap();
    }

    #[test]
    fn test_reload_keeps_overrides() {
        let (_, store) = store_with(MemorySettings::new());
        store.set(ParameterKey::Database, "A").unwrap();
        store.reload().unwrap();
        store.reload().unwrap();
        assert_eq!(
            store.get(ParameterKey::Database).unwrap(),
            ParameterValue::from("A")
        );
    }

    #[test]
    fn test_defaults_are_cached_until_reload() {
        let (settings, store) =
            store_with(MemorySettings::with_values([(ParameterKey::Port, "5432")]));

        assert!(store.contains(ParameterKey::Port).unwrap());
        settings.put(ParameterKey::Port, "6543");
        assert_eq!(
            store.get(ParameterKey::Port).unwrap(),
            ParameterValue::from("5432")
        );

        store.reload().unwrap();
        assert_eq!(
            store.get(ParameterKey::Port).unwrap(),
            ParameterValue::from("6543")
        );

        settings.remove(ParameterKey::Port);
        store.reload().unwrap();
        assert!(!store.contains(ParameterKey::Port).unwrap());
    }

    #[test]
    fn test_falsy_persisted_default_counts_as_absent() {
        let (_, store) = store_with(MemorySettings::with_values([
            (ParameterKey::Host, ParameterValue::from("")),
            (ParameterKey::PromptForPassword, ParameterValue::Flag(false)),
        ]));
        assert!(!store.contains(ParameterKey::Host).unwrap());
        assert!(!store.contains(ParameterKey::PromptForPassword).unwrap());
    }

    #[test]
    fn test_cache_default_is_dropped_on_reload() {
        let (_, store) = store_with(MemorySettings::new());
        store.cache_default(ParameterKey::Password, "secret");
        assert!(store.contains(ParameterKey::Password).unwrap());
        store.reload().unwrap();
        assert!(!store.contains(ParameterKey::Password).unwrap());
    }

    #[test]
    fn test_save_persists_overrides() {
        let (settings, store) = store_with(MemorySettings::new());
        assert_eq!(store.save().unwrap(), 0);

        store.set(ParameterKey::Host, "saved-host").unwrap();
        store.set(ParameterKey::Sslmode, "require").unwrap();
        assert!(store.has_overrides());
        assert_eq!(store.save().unwrap(), 2);

        assert_eq!(
            settings.get(ParameterKey::Host),
            Some(ParameterValue::from("saved-host"))
        );
        assert!(store.has_overrides());

        store.unset(ParameterKey::Host).unwrap();
        assert_eq!(
            store.get(ParameterKey::Host).unwrap(),
            ParameterValue::from("saved-host")
        );
        assert_eq!(store.layer_of(ParameterKey::Host), Some(Layer::Default));
        assert_eq!(store.layer_of(ParameterKey::Sslmode), Some(Layer::Override));
        assert_eq!(store.layer_of(ParameterKey::User), None);
    }

    #[test]
    fn test_resolve_layers() {
        let (_, store) = store_with(MemorySettings::with_values([
            (ParameterKey::Host, "default-host"),
            (ParameterKey::User, "default-user"),
        ]));
        store.set(ParameterKey::Host, "override-host").unwrap();

        let mut invocation = BTreeMap::new();
        invocation.insert(ParameterKey::Host, ParameterValue::from("arg-host"));
        invocation.insert(ParameterKey::User, ParameterValue::from("arg-user"));
        invocation.insert(ParameterKey::Password, ParameterValue::from(""));

        let resolved = store.resolve(&invocation);
        assert_eq!(
            resolved.get(ParameterKey::Host),
            Some(&ParameterValue::from("override-host"))
        );
        assert_eq!(resolved.layer(ParameterKey::Host), Some(Layer::Override));
        assert_eq!(
            resolved.get(ParameterKey::User),
            Some(&ParameterValue::from("arg-user"))
        );
        assert_eq!(resolved.layer(ParameterKey::User), Some(Layer::Invocation));
        assert!(resolved.contains(ParameterKey::Password));
        assert!(!resolved.is_set(ParameterKey::Password));
        assert!(!resolved.contains(ParameterKey::Database));
    }

    proptest! {
        #[test]
        fn prop_set_get_unset_for_every_key(index in 0usize..ParameterKey::ALL.len(), value in "[a-zA-Z0-9_./-]{1,24}") {
            let key = ParameterKey::ALL[index];
            let (_, store) = store_with(MemorySettings::new());

            store.set(key.name(), value.as_str()).unwrap();
            prop_assert_eq!(store.get(key).unwrap(), ParameterValue::from(value.as_str()));

            store.unset(key).unwrap();
            prop_assert!(!store.contains(key).unwrap());
        }
    }
}
