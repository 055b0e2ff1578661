//! Error taxonomy for the control-panel engine
//!
//! Every failure is local to one operation. Fetch failures are meant to be
//! shown with a retry action, mutation failures trigger an authoritative
//! reload, and normalization never produces an error at all.

use crate::models::MethodPath;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The backend answered with a non-2xx status. The body is opaque.
    #[error("{operation} failed with HTTP status {status}")]
    Network {
        operation: &'static str,
        status: u16,
    },

    /// The request never produced a response (connect, timeout, TLS, ...)
    #[error("{operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A service, class or method is absent from the local registry
    #[error("not found in registry: {0}")]
    NotFound(String),

    /// The requested behavior is not one of the method's available behaviors
    #[error("behavior {behavior} is not available for {path}")]
    InvalidBehavior { path: MethodPath, behavior: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The top-level response could not be decoded into any known shape
    #[error("malformed {operation} payload: {reason}")]
    MalformedPayload {
        operation: &'static str,
        reason: String,
    },

    /// An optimistic change was not confirmed by the backend. The registry
    /// has been reloaded from the backend by the time this is returned,
    /// unless that reload failed too; then the shown value is unconfirmed.
    #[error("change of {path} was not confirmed: {source}")]
    StaleState {
        path: MethodPath,
        #[source]
        source: Box<ConsoleError>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// True for transport failures and non-2xx statuses
    pub fn is_network(&self) -> bool {
        match self {
            ConsoleError::Network { .. } | ConsoleError::Transport { .. } => true,
            ConsoleError::StaleState { source, .. } => source.is_network(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::NotFound(_))
    }

    /// HTTP status of the failed call, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Network { status, .. } => Some(*status),
            ConsoleError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            ConsoleError::StaleState { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ConsoleError {
    fn from(err: config::ConfigError) -> Self {
        ConsoleError::Config(err.to_string())
    }
}
