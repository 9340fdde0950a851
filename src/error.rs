//! Error handling for the DirVis-RS application
//!
//! This module defines the crate-level error type and a Result alias.
//! Subsystems keep their own narrower errors ([`NetworkError`],
//! [`CommandError`]) which convert into [`DirVisError`] at the application
//! boundary.

use crate::command::CommandError;
use crate::network::NetworkError;
use thiserror::Error;

/// Main error type for DirVis-RS operations
#[derive(Error, Debug)]
pub enum DirVisError {
    /// Errors from building or running the processing network
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Errors from the command subsystem
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DirVisError>,
    },
}

impl DirVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DirVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for DirVisError {
    fn from(err: serde_json::Error) -> Self {
        DirVisError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DirVisError {
    fn from(err: toml::de::Error) -> Self {
        DirVisError::Serialization(err.to_string())
    }
}

/// Result type alias for DirVis-RS operations
pub type Result<T> = std::result::Result<T, DirVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<DirVisError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::AlgorithmId;

    #[test]
    fn test_error_display() {
        let err = DirVisError::Config("missing data dir".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing data dir");
    }

    #[test]
    fn test_error_with_context() {
        let err = DirVisError::Config("test".to_string());
        let with_ctx = err.with_context("Failed to load settings");
        assert!(with_ctx.to_string().contains("Failed to load settings"));
    }

    #[test]
    fn test_network_error_context() {
        let result: std::result::Result<(), NetworkError> =
            Err(NetworkError::UnknownAlgorithm(AlgorithmId(3)));
        let err = result.context("Building demo network").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Building demo network: Network error: Unknown algorithm AlgorithmId(3)"
        );
    }
}
