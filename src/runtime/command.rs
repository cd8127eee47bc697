//! Building the `psql` invocation
//!
//! Connection parameters reach `psql` through libpq environment variables,
//! never through arguments, so nothing sensitive shows up in a process list.

use crate::core::encoding::normalize_encoding_name;
use crate::core::parameter::ParameterKey;
use crate::core::store::ResolvedParameters;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Client used when `psql_path` is not configured
pub const DEFAULT_PSQL_PATH: &str = "/usr/bin/psql";

/// Keeps `psql` from ever waiting on a terminal password prompt
pub const NO_PASSWORD_FLAG: &str = "--no-password";

/// Password file libpq reads when no passfile is configured
pub const LOCAL_PASSFILE: &str = ".pgpass";

/// A fully resolved `psql` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsqlCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Complete environment of the child; nothing is inherited beyond it
    pub env: BTreeMap<String, String>,
    /// Encoding of query text and output
    pub encoding: String,
}

impl PsqlCommand {
    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args).env_clear().envs(&self.env);
        cmd
    }
}

/// Turns resolved parameters into a [`PsqlCommand`]
///
/// ```rust
/// use psql_execute::core::{ParameterKey, ResolvedParameters};
/// use psql_execute::runtime::CommandBuilder;
///
/// let params = ResolvedParameters::from_values([(ParameterKey::Host, "db")]);
/// let command = CommandBuilder::new(&params, "UTF-8")
///     .base_env(Vec::<(String, String)>::new())
///     .build();
/// assert_eq!(command.env["PGHOST"], "db");
/// assert_eq!(command.args, vec!["--no-password"]);
/// ```
pub struct CommandBuilder<'a> {
    params: &'a ResolvedParameters,
    encoding: String,
    base_env: Option<BTreeMap<String, String>>,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(params: &'a ResolvedParameters, encoding: &str) -> Self {
        Self {
            params,
            encoding: normalize_encoding_name(encoding).to_string(),
            base_env: None,
        }
    }

    /// Environment to start from instead of the current process environment
    pub fn base_env<I>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.base_env = Some(env.into_iter().collect());
        self
    }

    pub fn build(self) -> PsqlCommand {
        let program = self
            .params
            .get(ParameterKey::PsqlPath)
            .filter(|value| value.is_truthy())
            .map(|value| value.to_string())
            .unwrap_or_else(|| DEFAULT_PSQL_PATH.to_string());

        let mut env = self.base_env.unwrap_or_else(|| std::env::vars().collect());

        for (key, value) in self.params.iter() {
            let Some(var) = key.env_var() else {
                continue;
            };
            // An explicitly empty password is still passed through
            if value.is_truthy() || key == ParameterKey::Password {
                env.insert(var.to_string(), value.as_env_value());
            }
        }

        if let Some(var) = ParameterKey::ClientEncoding.env_var() {
            env.entry(var.to_string())
                .or_insert_with(|| self.encoding.clone());
        }

        debug!(
            "Built psql command {} with {} connection variables",
            program,
            env.keys().filter(|k| k.starts_with("PG")).count()
        );

        PsqlCommand {
            program,
            args: vec![NO_PASSWORD_FLAG.to_string()],
            env,
            encoding: self.encoding,
        }
    }
}

/// Path of the libpq password file in `home`
pub fn local_passfile(home: &Path) -> PathBuf {
    home.join(LOCAL_PASSFILE)
}

/// Whether the user has to be asked for a password before running.
///
/// True only when prompting is enabled and libpq has no other way to find
/// one: no passfile, no service and no `~/.pgpass`.
pub fn password_required(params: &ResolvedParameters, home: Option<&Path>) -> bool {
    params.is_set(ParameterKey::PromptForPassword)
        && !params.is_set(ParameterKey::Passfile)
        && !params.is_set(ParameterKey::Service)
        && !home.is_some_and(|home| local_passfile(home).is_file())
}
