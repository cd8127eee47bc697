//! Connection parameter names and values
//!
//! Every parameter the plugin understands is a [`ParameterKey`]. Most of them
//! map one-to-one onto a libpq environment variable; three are pseudo
//! parameters that only steer the plugin itself (`psql_path`,
//! `prompt_for_password` and `files`).

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recognised connection parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    Host,
    Hostaddr,
    Port,
    Database,
    User,
    Password,
    Passfile,
    Service,
    Servicefile,
    KerberosRealm,
    Options,
    Appname,
    Sslmode,
    Requiressl,
    Sslcompression,
    Sslcert,
    Sslkey,
    Sslrootcert,
    Sslcrl,
    Requirepeer,
    Krbsrvname,
    Gsslib,
    ConnectTimeout,
    ClientEncoding,
    Datestyle,
    Timezone,
    Geqo,
    Sysconfdir,
    Localedir,
    PsqlPath,
    PromptForPassword,
    Files,
}

impl ParameterKey {
    /// Every key, in the order they are listed to users
    pub const ALL: [ParameterKey; 32] = [
        Self::Host,
        Self::Hostaddr,
        Self::Port,
        Self::Database,
        Self::User,
        Self::Password,
        Self::Passfile,
        Self::Service,
        Self::Servicefile,
        Self::KerberosRealm,
        Self::Options,
        Self::Appname,
        Self::Sslmode,
        Self::Requiressl,
        Self::Sslcompression,
        Self::Sslcert,
        Self::Sslkey,
        Self::Sslrootcert,
        Self::Sslcrl,
        Self::Requirepeer,
        Self::Krbsrvname,
        Self::Gsslib,
        Self::ConnectTimeout,
        Self::ClientEncoding,
        Self::Datestyle,
        Self::Timezone,
        Self::Geqo,
        Self::Sysconfdir,
        Self::Localedir,
        Self::PsqlPath,
        Self::PromptForPassword,
        Self::Files,
    ];

    /// The name used in commands and settings files
    pub fn name(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Hostaddr => "hostaddr",
            Self::Port => "port",
            Self::Database => "database",
            Self::User => "user",
            Self::Password => "password",
            Self::Passfile => "passfile",
            Self::Service => "service",
            Self::Servicefile => "servicefile",
            Self::KerberosRealm => "kerberos_realm",
            Self::Options => "options",
            Self::Appname => "appname",
            Self::Sslmode => "sslmode",
            Self::Requiressl => "requiressl",
            Self::Sslcompression => "sslcompression",
            Self::Sslcert => "sslcert",
            Self::Sslkey => "sslkey",
            Self::Sslrootcert => "sslrootcert",
            Self::Sslcrl => "sslcrl",
            Self::Requirepeer => "requirepeer",
            Self::Krbsrvname => "krbsrvname",
            Self::Gsslib => "gsslib",
            Self::ConnectTimeout => "connect_timeout",
            Self::ClientEncoding => "client_encoding",
            Self::Datestyle => "datestyle",
            Self::Timezone => "timezone",
            Self::Geqo => "geqo",
            Self::Sysconfdir => "sysconfdir",
            Self::Localedir => "localedir",
            Self::PsqlPath => "psql_path",
            Self::PromptForPassword => "prompt_for_password",
            Self::Files => "files",
        }
    }

    /// The libpq environment variable this parameter is exported as, if any
    pub fn env_var(self) -> Option<&'static str> {
        let var = match self {
            Self::Host => "PGHOST",
            Self::Hostaddr => "PGHOSTADDR",
            Self::Port => "PGPORT",
            Self::Database => "PGDATABASE",
            Self::User => "PGUSER",
            Self::Password => "PGPASSWORD",
            Self::Passfile => "PGPASSFILE",
            Self::Service => "PGSERVICE",
            Self::Servicefile => "PGSERVICEFILE",
            Self::KerberosRealm => "PGREALM",
            Self::Options => "PGOPTIONS",
            Self::Appname => "PGAPPNAME",
            Self::Sslmode => "PGSSLMODE",
            Self::Requiressl => "PGREQUIRESSL",
            Self::Sslcompression => "PGSSLCOMPRESSION",
            Self::Sslcert => "PGSSLCERT",
            Self::Sslkey => "PGSSLKEY",
            Self::Sslrootcert => "PGSSLROOTCERT",
            Self::Sslcrl => "PGSSLCRL",
            Self::Requirepeer => "PGREQUIREPEER",
            Self::Krbsrvname => "PGKRBSRVNAME",
            Self::Gsslib => "PGGSSLIB",
            Self::ConnectTimeout => "PGCONNECT_TIMEOUT",
            Self::ClientEncoding => "PGCLIENTENCODING",
            Self::Datestyle => "PGDATESTYLE",
            Self::Timezone => "PGTZ",
            Self::Geqo => "PGGEQO",
            Self::Sysconfdir => "PGSYSCONFDIR",
            Self::Localedir => "PGLOCALEDIR",
            Self::PsqlPath | Self::PromptForPassword | Self::Files => return None,
        };
        Some(var)
    }

    /// Key under which the persisted default of this parameter is stored
    pub fn settings_key(self) -> String {
        format!("default_{}", self.name())
    }

    /// Whether the value of this parameter must never be shown to the user
    pub fn is_secret(self) -> bool {
        matches!(self, Self::Password)
    }

    /// Parameters that hold an on/off switch rather than text
    pub fn is_flag(self) -> bool {
        matches!(self, Self::PromptForPassword)
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| Error::unknown_parameter(s))
    }
}

/// Anything that names a parameter: a typed key or a user-supplied string
pub trait IntoParameterKey {
    fn into_parameter_key(self) -> Result<ParameterKey>;
}

impl IntoParameterKey for ParameterKey {
    fn into_parameter_key(self) -> Result<ParameterKey> {
        Ok(self)
    }
}

impl IntoParameterKey for &str {
    fn into_parameter_key(self) -> Result<ParameterKey> {
        self.parse()
    }
}

impl IntoParameterKey for &String {
    fn into_parameter_key(self) -> Result<ParameterKey> {
        self.as_str().parse()
    }
}

/// The value of a parameter
///
/// Values typed by the user are always text. Settings files may also hold
/// booleans (`prompt_for_password`) and lists (`files`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl ParameterValue {
    /// Interpret text typed by the user as a value of `key`. Flag keys
    /// understand `true`/`false` (and `yes`/`no`, `on`/`off`, `1`/`0`).
    pub fn parse_for(key: ParameterKey, text: &str) -> Self {
        Self::Text(text.to_string()).coerce_for(key)
    }

    /// Turn boolean-looking text into a [`Flag`](Self::Flag) for flag keys
    pub fn coerce_for(self, key: ParameterKey) -> Self {
        if !key.is_flag() {
            return self;
        }
        match self {
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Self::Flag(true),
                "false" | "no" | "off" | "0" | "" => Self::Flag(false),
                _ => Self::Text(text),
            },
            other => other,
        }
    }

    /// Empty text, `false` and empty lists count as "not set" when defaults
    /// are read and when the environment is built
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => !text.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Text as it is exported into the client environment
    pub fn as_env_value(&self) -> String {
        self.to_string()
    }

    /// Interpret the value as a list of items (used for `files`)
    pub fn as_list(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => text.split(',').map(|s| s.trim().to_string()).collect(),
            Self::Flag(_) => Vec::new(),
        }
    }

    /// Convert a settings-file value. Tables and datetimes are not
    /// meaningful for any parameter.
    pub fn from_toml(value: toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(Self::Text(s)),
            toml::Value::Integer(i) => Some(Self::Text(i.to_string())),
            toml::Value::Float(f) => Some(Self::Text(f.to_string())),
            toml::Value::Boolean(b) => Some(Self::Flag(b)),
            toml::Value::Array(items) => Some(Self::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        toml::Value::String(s) => Some(s),
                        toml::Value::Integer(i) => Some(i.to_string()),
                        _ => None,
                    })
                    .collect(),
            )),
            toml::Value::Datetime(_) | toml::Value::Table(_) => None,
        }
    }

    pub fn to_toml(&self) -> toml::Value {
        match self {
            Self::Flag(flag) => toml::Value::Boolean(*flag),
            Self::Text(text) => toml::Value::String(text.clone()),
            Self::List(items) => {
                toml::Value::Array(items.iter().cloned().map(toml::Value::String).collect())
            }
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{}", flag),
            Self::Text(text) => f.write_str(text),
            Self::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}
