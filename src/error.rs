//! Error types for rawprobe
//!
//! Header construction and marshaling never fail. These errors only come
//! from parsing user-supplied text at the edges of the crate.

use thiserror::Error;

/// Result type alias for rawprobe operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Hardware address that is not six hex octets
    #[error("Invalid MAC address '{0}'")]
    InvalidMac(String),

    /// Hex byte string with a bad digit or an odd number of nibbles
    #[error("Invalid hex bytes '{input}': {reason}")]
    InvalidHex { input: String, reason: String },

    /// Unknown scan technique name
    #[error("Unknown scan technique '{0}'")]
    UnknownScan(String),

    /// Flag value outside of a single byte
    #[error("Invalid TCP flags '{0}'")]
    InvalidFlags(String),
}

impl Error {
    pub fn invalid_hex<S: Into<String>>(input: S, reason: S) -> Self {
        Error::InvalidHex {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
