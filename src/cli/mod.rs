//! Terminal front end for running SQL through `psql`.
//! ## Usage
//!
//! ```bash
//! # Run a file
//! psql-execute execute --buffer report.sql
//!
//! # Run two statements of a buffer concurrently
//! psql-execute execute --buffer report.sql --select 0:120 --select 121:300
//!
//! # Configure the connection for later runs
//! psql-execute config set host db.internal
//! psql-execute config save
//!
//! # See what is configured
//! psql-execute config show --json
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod session;
pub mod terminal;

pub use error::{CliError, Result, UserFriendlyError};

/// Default directory for config, overrides and the settings file
pub fn default_data_dir() -> std::path::PathBuf {
    directories::ProjectDirs::from("", "", "psql-execute")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join(".psql-execute")
        })
}

/// Initialize the data directory if it doesn't exist
pub fn ensure_data_dir() -> Result<std::path::PathBuf> {
    let data_dir = default_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
    }
    Ok(data_dir)
}
