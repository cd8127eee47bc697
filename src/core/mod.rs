//! Connection parameters and their persisted defaults

pub mod encoding;
pub mod error;
pub mod parameter;
pub mod settings;
pub mod store;

pub use encoding::{normalize_encoding_name, TextEncoding, DEFAULT_ENCODING};
pub use error::{Error, Result};
pub use parameter::{IntoParameterKey, ParameterKey, ParameterValue};
pub use settings::{MemorySettings, SettingsSource, SettingsWatcher, TomlSettings};
pub use store::{Layer, ParameterStore, ResolvedParameters};
