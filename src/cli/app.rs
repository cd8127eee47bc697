use crate::cli::config::Config;
use crate::cli::error::{CliError, Result};
use crate::cli::session::OverrideFile;
use crate::cli::terminal::{StdoutSink, TerminalNotifier, TerminalPrompt};
use crate::commands::{ConfigOutcome, ExecuteOutcome, Invocation, Plugin};
use crate::core::parameter::{ParameterKey, ParameterValue};
use crate::core::settings::TomlSettings;
use crate::core::store::ParameterStore;
use crate::editor::{BufferText, Region};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Run SQL through psql with layered connection settings
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress status messages (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Kill a psql process still running after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Custom data directory path
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Settings file holding the persisted defaults
    #[arg(long, global = true, env = "PSQL_EXECUTE_SETTINGS")]
    pub settings_file: Option<PathBuf>,

    /// Disable coloured status messages
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run SQL from a buffer, its selections or a list of files
    Execute(ExecuteCommand),

    /// Manage connection parameters
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ExecuteCommand {
    /// SQL files to run, one psql process each
    pub files: Vec<PathBuf>,

    /// Buffer to run (stdin if omitted and no files are given)
    #[arg(short, long)]
    pub buffer: Option<PathBuf>,

    /// Selection of the buffer in character offsets; repeat for several
    #[arg(short, long = "select", value_name = "START:END", value_parser = parse_region)]
    pub selections: Vec<Region>,

    /// Encoding of the buffer
    #[arg(short, long, default_value = "UTF-8")]
    pub encoding: String,

    /// Parameter for this run only; repeat for several
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(ParameterKey, ParameterValue)>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set a parameter override, prompting for what is missing
    Set {
        name: Option<String>,
        value: Option<String>,
    },

    /// Remove a parameter override
    Unset { name: Option<String> },

    /// Persist the overrides as defaults
    Save,

    /// Show every configured parameter
    Show {
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        if let Commands::Completion { shell } = self.command {
            generate_completion(shell);
            return Ok(());
        }

        let data_dir = match self.data_dir {
            Some(ref dir) => {
                std::fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => crate::cli::ensure_data_dir()?,
        };

        let config = Config::load_from_file(data_dir.join("config.toml"))
            .unwrap_or_else(|e| {
                warn!("Using default configuration: {}", e);
                Config::default()
            })
            .merge_with_cli_args(&self);

        let data_dir = match config.data_dir.clone() {
            Some(dir) if dir != data_dir => {
                std::fs::create_dir_all(&dir)?;
                dir
            }
            _ => data_dir,
        };
        debug!("Using data directory {}", data_dir.display());

        let settings = Arc::new(TomlSettings::open(config.settings_path(&data_dir))?);
        let store = Arc::new(ParameterStore::new(settings));
        let overrides = OverrideFile::in_dir(&data_dir);
        overrides.load_into(&store)?;

        let plugin = Plugin::builder(Arc::clone(&store))
            .sink(Arc::new(StdoutSink::new()))
            .notifier(Arc::new(TerminalNotifier::new(
                config.quiet,
                config.output.color,
            )))
            .prompt(Arc::new(TerminalPrompt))
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build();

        match self.command {
            Commands::Execute(cmd) => cmd.execute(&plugin).await,
            Commands::Config { action } => action.execute(&plugin, &overrides),
            Commands::Completion { .. } => Ok(()),
        }
    }
}

impl ExecuteCommand {
    pub async fn execute(self, plugin: &Plugin) -> Result<()> {
        let text = match self.buffer {
            Some(ref path) => std::fs::read_to_string(path)?,
            None if self.files.is_empty() => std::io::read_to_string(std::io::stdin())?,
            None => String::new(),
        };

        let mut buffer = BufferText::new(text).with_encoding(self.encoding);
        for region in self.selections {
            buffer = buffer.with_selection(region);
        }

        let mut invocation = Invocation::new();
        for (key, value) in self.params {
            invocation.insert(key, value)?;
        }
        if !self.files.is_empty() {
            invocation = invocation.files(self.files);
        }

        match plugin.execute(&buffer, &invocation).await {
            ExecuteOutcome::Completed(report) if !report.all_succeeded() => {
                let failed = report
                    .units
                    .iter()
                    .filter(|unit| !unit.class.is_some_and(|class| class.is_success()))
                    .count();
                Err(CliError::QueriesFailed {
                    failed,
                    total: report.units.len(),
                })
            }
            ExecuteOutcome::Completed(_) | ExecuteOutcome::Cancelled => Ok(()),
            ExecuteOutcome::NothingToRun => {
                Err(CliError::invalid_input("none of the given files exist"))
            }
        }
    }
}

impl ConfigAction {
    pub fn execute(self, plugin: &Plugin, overrides: &OverrideFile) -> Result<()> {
        match self {
            Self::Set { name, value } => {
                if plugin.config_set(name.as_deref(), value.as_deref())? == ConfigOutcome::Applied {
                    overrides.save_from(plugin.store())?;
                }
            }
            Self::Unset { name } => {
                if plugin.config_unset(name.as_deref())? == ConfigOutcome::Applied {
                    overrides.save_from(plugin.store())?;
                }
            }
            Self::Save => {
                if plugin.config_save()? == ConfigOutcome::NothingToSave {
                    eprintln!("{}", "No configuration overrides to save.".dimmed());
                }
            }
            Self::Show { json } => {
                let entries = plugin.config_show();
                if json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else if entries.is_empty() {
                    eprintln!("{}", "No parameters configured.".dimmed());
                } else {
                    for entry in entries {
                        println!(
                            "{} = {} {}",
                            entry.name.bold(),
                            entry.value,
                            format!("({})", entry.layer).dimmed()
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_region(s: &str) -> std::result::Result<Region, String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{}'", s))?;
    let start = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start '{}': {}", start, e))?;
    let end = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end '{}': {}", end, e))?;
    Ok(Region::new(start, end))
}

fn parse_param(s: &str) -> std::result::Result<(ParameterKey, ParameterValue), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let key: ParameterKey = name.trim().parse().map_err(|e| format!("{}", e))?;
    Ok((key, ParameterValue::parse_for(key, value)))
}

/// Generate shell completion script
fn generate_completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
