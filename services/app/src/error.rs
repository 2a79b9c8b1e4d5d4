//! services/app/src/error.rs
//!
//! Defines the primary error type for the entire app service.

use crate::config::ConfigError;
use gpdf_core::ports::PortError;

/// The primary error type for the `app` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A local, pre-network rejection: bad file extension, oversized file,
    /// empty or suspicious question text. Shown to the user verbatim.
    #[error("{0}")]
    Validation(String),

    /// Represents a standard Input/Output error (e.g., reading the input file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl AppError {
    /// The message presented to the user for this error.
    ///
    /// Validation and server-provided detail are shown verbatim; transport
    /// failures collapse into a generic reconnect prompt.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Port(PortError::Unreachable(_)) => {
                "Could not connect to the server. Please check that the backend is running."
                    .to_string()
            }
            AppError::Port(PortError::Api(detail)) => detail.clone(),
            AppError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
