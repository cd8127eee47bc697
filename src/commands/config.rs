use super::Plugin;
use crate::core::error::Result;
use crate::core::parameter::{ParameterKey, ParameterValue};
use crate::core::store::Layer;
use serde::Serialize;

const NAME_LABEL: &str = "Enter PostgreSQL configuration variable name:";
const MASK: &str = "********";

/// How a configuration action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOutcome {
    Applied,
    Cancelled,
    /// `config_save` with no overrides to save
    NothingToSave,
}

/// One configured parameter as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
    pub layer: Layer,
}

impl Plugin {
    /// Set an override, prompting for whichever of `name` and `value` is
    /// missing. An unknown name is an error.
    pub fn config_set(&self, name: Option<&str>, value: Option<&str>) -> Result<ConfigOutcome> {
        let Some(name) = self.name_or_prompt(name) else {
            self.notify("PostgreSQL configuration variable setting cancelled.");
            return Ok(ConfigOutcome::Cancelled);
        };
        let key: ParameterKey = name.parse()?;

        let value = match value {
            Some(value) => Some(value.to_string()),
            None => {
                let label = format!("Enter {}:", key);
                if key.is_secret() {
                    self.prompt.secret(&label)
                } else {
                    self.prompt.input(&label, "")
                }
            }
        };
        let Some(value) = value else {
            self.notify("PostgreSQL configuration variable setting cancelled.");
            return Ok(ConfigOutcome::Cancelled);
        };

        self.store.set(key, ParameterValue::parse_for(key, &value))?;
        self.notify(&format!("PostgreSQL configuration variable '{}' set.", key));
        Ok(ConfigOutcome::Applied)
    }

    /// Remove an override, prompting for the name if missing
    pub fn config_unset(&self, name: Option<&str>) -> Result<ConfigOutcome> {
        let Some(name) = self.name_or_prompt(name) else {
            self.notify("PostgreSQL configuration variable unsetting cancelled.");
            return Ok(ConfigOutcome::Cancelled);
        };

        self.store.unset(name.as_str())?;
        self.notify(&format!(
            "PostgreSQL configuration variable '{}' unset.",
            name
        ));
        Ok(ConfigOutcome::Applied)
    }

    /// Saving only makes sense while there are overrides
    pub fn config_save_enabled(&self) -> bool {
        self.store.has_overrides()
    }

    /// Persist the overrides as defaults
    pub fn config_save(&self) -> Result<ConfigOutcome> {
        if !self.config_save_enabled() {
            return Ok(ConfigOutcome::NothingToSave);
        }
        self.store.save()?;
        self.notify("PostgreSQL configuration saved to defaults.");
        Ok(ConfigOutcome::Applied)
    }

    /// Every parameter that currently has a value, secrets masked
    pub fn config_show(&self) -> Vec<ConfigEntry> {
        ParameterKey::ALL
            .iter()
            .filter_map(|&key| {
                let layer = self.store.layer_of(key)?;
                let value = self.store.try_get(key).ok().flatten()?;
                let value = if key.is_secret() {
                    MASK.to_string()
                } else {
                    value.to_string()
                };
                Some(ConfigEntry {
                    name: key.name().to_string(),
                    value,
                    layer,
                })
            })
            .collect()
    }

    fn name_or_prompt(&self, name: Option<&str>) -> Option<String> {
        match name {
            Some(name) => Some(name.to_string()),
            None => self.prompt.input(NAME_LABEL, ""),
        }
    }
}
