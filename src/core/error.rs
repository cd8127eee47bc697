use crate::core::parameter::ParameterKey;
use thiserror::Error;

/// Errors raised by the parameter store, the command builder and the runner
#[derive(Error, Debug)]
pub enum Error {
    #[error("Argument {0} not recognized.")]
    UnknownParameter(String),

    #[error("Parameter '{0}' is not configured")]
    MissingParameter(ParameterKey),

    #[error("Unsupported text encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Text cannot be represented in {encoding}: {details}")]
    Encoding { encoding: String, details: String },

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to communicate with psql: {0}")]
    Communication(#[source] std::io::Error),

    #[error("psql did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File watcher error: {0}")]
    FileWatcher(#[from] notify::Error),

    #[error("Async task error: {0}")]
    AsyncTask(#[from] tokio::task::JoinError),
}

impl Error {
    /// Create a settings error
    pub fn settings<S: Into<String>>(msg: S) -> Self {
        Self::Settings(msg.into())
    }

    /// Create an unknown parameter error
    pub fn unknown_parameter<S: Into<String>>(name: S) -> Self {
        Self::UnknownParameter(name.into())
    }

    /// The client could not be started at all (missing executable, permissions)
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }

    /// Something went wrong while feeding input to or reading output from a
    /// running client
    pub fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            Self::Communication(_)
                | Self::Encoding { .. }
                | Self::UnsupportedEncoding(_)
                | Self::Timeout(_)
                | Self::AsyncTask(_)
        )
    }

    /// Configuration errors are reported straight back to whoever asked
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownParameter(_) | Self::MissingParameter(_) | Self::Settings(_)
        )
    }
}

/// Result type for psql-execute operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unknown_parameter_message() {
        let err = Error::unknown_parameter("colour");
        assert_eq!(err.to_string(), "Argument colour not recognized.");
        assert!(err.is_configuration_error());
        assert!(!err.is_launch_failure());
    }

    #[test]
    fn test_failure_taxonomy() {
        let launch = Error::Launch {
            program: "/nope/psql".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert!(launch.is_launch_failure());
        assert!(!launch.is_communication_failure());
        assert!(launch.to_string().contains("/nope/psql"));

        let comm = Error::Communication(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(comm.is_communication_failure());

        let enc = Error::Encoding {
            encoding: "ASCII".to_string(),
            details: "byte 0xff at offset 3".to_string(),
        };
        assert!(enc.is_communication_failure());
        assert!(!enc.is_configuration_error());
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }
}
