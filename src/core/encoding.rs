//! Text encodings understood when talking to `psql`
//!
//! The editor reports the encoding of its buffer by name. That name is
//! exported verbatim as `PGCLIENTENCODING`, and the same encoding is used to
//! encode query text and decode the client's output.

use crate::core::error::{Error, Result};
use std::fmt;

/// Name editors use when they have not detected an encoding
pub const UNDEFINED_ENCODING: &str = "Undefined";

/// Encoding used in place of [`UNDEFINED_ENCODING`]
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Replace the "undefined" sentinel with the UTF-8 default
pub fn normalize_encoding_name(name: &str) -> &str {
    if name.is_empty() || name.eq_ignore_ascii_case(UNDEFINED_ENCODING) {
        DEFAULT_ENCODING
    } else {
        name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Ascii,
}

impl TextEncoding {
    /// Look up an encoding by any of its common names
    pub fn from_name(name: &str) -> Result<Self> {
        let canonical: String = normalize_encoding_name(name)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match canonical.as_str() {
            "utf8" | "unicode" => Ok(Self::Utf8),
            "latin1" | "iso88591" | "westerniso88591" | "l1" => Ok(Self::Latin1),
            "ascii" | "usascii" | "sqlascii" => Ok(Self::Ascii),
            _ => Err(Error::UnsupportedEncoding(name.to_string())),
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 | Self::Ascii => {
                let limit = if self == Self::Latin1 { 0xff } else { 0x7f };
                text.chars()
                    .enumerate()
                    .map(|(index, c)| {
                        let code = c as u32;
                        if code <= limit {
                            Ok(code as u8)
                        } else {
                            Err(Error::Encoding {
                                encoding: self.to_string(),
                                details: format!(
                                    "character {:?} at position {} has no mapping",
                                    c, index
                                ),
                            })
                        }
                    })
                    .collect()
            }
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| Error::Encoding {
                encoding: self.to_string(),
                details: e.utf8_error().to_string(),
            }),
            Self::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(Error::Encoding {
                    encoding: self.to_string(),
                    details: format!("byte 0x{:02x} at offset {}", bytes[offset], offset),
                }),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
            Self::Ascii => "ASCII",
        })
    }
}
