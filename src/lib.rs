//! # psql-execute
//!
//! Run SQL text from an editor against a PostgreSQL server by shelling out to
//! `psql`, one subprocess per selection or file, with the combined output
//! collected into a single panel.
//!
//! The crate is split the way the work flows:
//!
//! - [`core`] holds the connection parameters: the typed key set, the layered
//!   [`ParameterStore`](core::ParameterStore) and its persisted settings file.
//! - [`runtime`] turns resolved parameters into a `psql` command, runs it and
//!   coordinates a batch of runs.
//! - [`editor`] describes what the host editor must provide (text, an output
//!   panel, prompts and status messages).
//! - [`commands`] are the user-invocable actions built on top of the above.
//!
//! ```rust,no_run
//! use psql_execute::core::{ParameterKey, ParameterStore};
//! use psql_execute::core::settings::TomlSettings;
//! use std::sync::Arc;
//!
//! # fn main() -> psql_execute::core::Result<()> {
//! let settings = Arc::new(TomlSettings::open("PSQLExecute.toml")?);
//! let store = Arc::new(ParameterStore::new(settings));
//! store.set(ParameterKey::Host, "db.internal")?;
//! assert_eq!(store.get("host")?.to_string(), "db.internal");
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod core;
pub mod editor;
pub mod runtime;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::{Error, ParameterKey, ParameterStore, ParameterValue, Result};
pub use crate::runtime::{ExecutionCoordinator, QueryRunner, RunResult, WorkUnit};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
