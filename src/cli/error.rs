use thiserror::Error;

/// Error type for the psql-execute command line
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{failed} of {total} queries did not succeed")]
    QueriesFailed { failed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] crate::core::error::Error),
}

impl CliError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Message shown to the user, with a hint where one helps
    pub fn user_message(&self) -> String {
        use crate::core::error::Error;

        match self {
            Self::Core(Error::UnknownParameter(name)) => format!(
                "Argument {} not recognized. Run 'psql-execute config show' to see configured parameters.",
                name
            ),
            Self::Core(Error::UnsupportedEncoding(name)) => format!(
                "Encoding '{}' is not supported. Use UTF-8, ISO-8859-1 or ASCII.",
                name
            ),
            Self::Core(Error::Settings(msg)) => {
                format!("Settings file error: {}. Fix or remove the file and retry.", msg)
            }
            Self::Core(Error::TomlParse(err)) => {
                format!("Could not parse a TOML file: {}", err)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Conversion to a message fit for the terminal
pub trait UserFriendlyError {
    fn user_message(&self) -> String;
}

impl UserFriendlyError for CliError {
    fn user_message(&self) -> String {
        self.user_message()
    }
}
