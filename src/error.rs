//! Crate-level error type.
//!
//! Only configuration problems and the startup health probe surface as
//! [`BridgeError`]. Failures of individual remote calls inside the running
//! loop are values ([`crate::remote::RemoteError`]) and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the bridge before (or instead of) entering its loop.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A configuration field failed validation.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The configuration file could not be read.
    #[error("cannot read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::BridgeConfig`].
    #[error("cannot parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The initial health probe did not return 200.
    #[error("remote service is not available at {url}")]
    ServiceUnavailable { url: String },

    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

impl BridgeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        BridgeError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// An unreachable remote service exits with `1`; configuration and setup
    /// problems exit with `2`.
    pub fn exit_code(&self) -> u8 {
        match self {
            BridgeError::ServiceUnavailable { .. } => 1,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
