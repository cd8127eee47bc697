use crate::cli::app::Cli;
use crate::cli::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file name used when none is configured
pub const DEFAULT_SETTINGS_FILE: &str = "PSQLExecute.toml";

/// Configuration of the psql-execute command line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Kill a `psql` process after this many seconds
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub quiet: bool,

    /// Custom data directory (if not using system default)
    pub data_dir: Option<PathBuf>,

    /// Where the persisted `default_<parameter>` settings live
    pub settings_file: Option<PathBuf>,

    #[serde(default)]
    pub output: OutputDefaults,
}

/// Output formatting defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDefaults {
    /// Colour status messages
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for OutputDefaults {
    fn default() -> Self {
        Self {
            color: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating it with defaults if missing
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_file(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            CliError::configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            CliError::configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Merge with command-line arguments, giving priority to CLI args
    pub fn merge_with_cli_args(mut self, cli_args: &Cli) -> Self {
        if cli_args.verbose {
            self.verbose = true;
        }
        if cli_args.quiet {
            self.quiet = true;
        }
        if cli_args.no_color {
            self.output.color = false;
        }
        if let Some(timeout) = cli_args.timeout {
            self.timeout_secs = Some(timeout);
        }
        if let Some(ref data_dir) = cli_args.data_dir {
            self.data_dir = Some(data_dir.clone());
        }
        if let Some(ref settings_file) = cli_args.settings_file {
            self.settings_file = Some(settings_file.clone());
        }

        self
    }

    /// Settings file, relative to `data_dir` unless configured
    pub fn settings_path(&self, data_dir: &Path) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| data_dir.join(DEFAULT_SETTINGS_FILE))
    }
}

fn default_true() -> bool {
    true
}
