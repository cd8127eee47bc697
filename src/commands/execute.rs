use super::Plugin;
use crate::core::error::Result;
use crate::core::parameter::{IntoParameterKey, ParameterKey, ParameterValue};
use crate::editor::TextSource;
use crate::runtime::{
    password_required, plan, BatchReport, CommandBuilder, PsqlExecutor, QueryExecutor,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Parameters passed along with a single execute request
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    values: BTreeMap<ParameterKey, ParameterValue>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, rejecting unknown names
    pub fn with<K, V>(mut self, key: K, value: V) -> Result<Self>
    where
        K: IntoParameterKey,
        V: Into<ParameterValue>,
    {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn insert<K, V>(&mut self, key: K, value: V) -> Result<()>
    where
        K: IntoParameterKey,
        V: Into<ParameterValue>,
    {
        let key = key.into_parameter_key()?;
        self.values.insert(key, value.into().coerce_for(key));
        Ok(())
    }

    /// Run these files instead of the buffer
    pub fn files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<String> = files
            .into_iter()
            .map(|file| file.into().display().to_string())
            .collect();
        self.values
            .insert(ParameterKey::Files, ParameterValue::List(files));
        self
    }

    pub fn values(&self) -> &BTreeMap<ParameterKey, ParameterValue> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How an execute request ended
#[derive(Debug)]
pub enum ExecuteOutcome {
    Completed(BatchReport),
    /// File mode found none of the configured files
    NothingToRun,
    /// The user declined to continue without a password
    Cancelled,
}

impl Plugin {
    /// Run the selections (or the whole buffer, or the configured files) of
    /// `source`, one `psql` process per unit.
    pub async fn execute(
        &self,
        source: &dyn TextSource,
        invocation: &Invocation,
    ) -> ExecuteOutcome {
        let mut params = self.store.resolve(invocation.values());

        if !params.contains(ParameterKey::Password)
            && password_required(&params, self.home_dir.as_deref())
        {
            self.notify("Enter password for PostgreSQL database.");
            let password = self.prompt.secret("Enter password:").unwrap_or_default();

            if password.is_empty() {
                if !self.prompt.confirm("Proceed with empty password?", "Proceed") {
                    self.notify("PostgreSQL query cancelled.");
                    return ExecuteOutcome::Cancelled;
                }
            } else {
                self.store
                    .cache_default(ParameterKey::Password, password.as_str());
            }
            params.insert(ParameterKey::Password, password);
        }

        let units = plan(&params, source);
        if units.is_empty() {
            self.notify("PostgreSQL: none of the configured files exist.");
            return ExecuteOutcome::NothingToRun;
        }
        debug!("Planned {} units", units.len());

        let command = CommandBuilder::new(&params, &source.encoding()).build();
        let executor: Arc<dyn QueryExecutor> =
            Arc::new(PsqlExecutor::new(command).with_timeout(self.timeout));

        ExecuteOutcome::Completed(self.coordinator.run_batch(units, executor).await)
    }
}
