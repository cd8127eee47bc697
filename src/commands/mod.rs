//! User-invocable actions
//!
//! A [`Plugin`] ties the parameter store to the editor collaborators and
//! exposes the actions a user can trigger:
//!
//! - [`Plugin::execute`] runs the buffer, the selections or configured files
//! - [`Plugin::config_set`] / [`Plugin::config_unset`] manage overrides
//! - [`Plugin::config_save`] turns the overrides into persisted defaults
//! - [`Plugin::config_show`] lists what is currently configured

pub mod config;
pub mod execute;

pub use config::{ConfigEntry, ConfigOutcome};
pub use execute::{ExecuteOutcome, Invocation};

use crate::core::store::ParameterStore;
use crate::editor::{BufferSink, DeclinePrompt, OutputSink, Prompt, StatusNotifier, TracingNotifier};
use crate::runtime::ExecutionCoordinator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The plugin as seen by its host
pub struct Plugin {
    store: Arc<ParameterStore>,
    prompt: Arc<dyn Prompt>,
    notifier: Arc<dyn StatusNotifier>,
    coordinator: ExecutionCoordinator,
    timeout: Option<Duration>,
    home_dir: Option<PathBuf>,
}

impl Plugin {
    /// Start building a plugin around `store`
    pub fn builder(store: Arc<ParameterStore>) -> PluginBuilder {
        PluginBuilder::new(store)
    }

    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    fn notify(&self, message: &str) {
        self.notifier.notify(message);
    }
}

/// Builder for [`Plugin`]
///
/// ```rust
/// use psql_execute::commands::Plugin;
/// use psql_execute::core::{MemorySettings, ParameterStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(ParameterStore::new(Arc::new(MemorySettings::new())));
/// let plugin = Plugin::builder(store).timeout_secs(30).build();
/// ```
pub struct PluginBuilder {
    store: Arc<ParameterStore>,
    sink: Arc<dyn OutputSink>,
    prompt: Arc<dyn Prompt>,
    notifier: Arc<dyn StatusNotifier>,
    timeout: Option<Duration>,
    home_dir: Option<PathBuf>,
}

impl PluginBuilder {
    pub fn new(store: Arc<ParameterStore>) -> Self {
        Self {
            store,
            sink: Arc::new(BufferSink::new()),
            prompt: Arc::new(DeclinePrompt),
            notifier: Arc::new(TracingNotifier),
            timeout: None,
            home_dir: dirs::home_dir(),
        }
    }

    /// Panel query output is appended to
    pub fn sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn StatusNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Kill any `psql` process still running after this many seconds
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(timeout_secs));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory searched for `.pgpass`
    pub fn home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    pub fn build(self) -> Plugin {
        Plugin {
            coordinator: ExecutionCoordinator::new(self.sink, Arc::clone(&self.notifier)),
            store: self.store,
            prompt: self.prompt,
            notifier: self.notifier,
            timeout: self.timeout,
            home_dir: self.home_dir,
        }
    }
}
