//! Network-specific error types.

use crate::network::id::AlgorithmId;
use thiserror::Error;

/// Errors surfaced by the graph-building API.
///
/// These describe programmer errors in how the graph is wired and are
/// returned synchronously; a failed call leaves the graph unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Type mismatch: output '{output}' ({produced}) cannot feed input '{input}' ({accepted})")]
    TypeMismatch {
        output: String,
        produced: &'static str,
        input: String,
        accepted: &'static str,
    },

    #[error("Connecting {from} to {to} would create a cycle")]
    Cycle { from: AlgorithmId, to: AlgorithmId },

    #[error("Input '{port}' of {algorithm} is already driven by another connection")]
    PortConflict { algorithm: AlgorithmId, port: String },

    #[error("Algorithm '{name}' is already registered as {existing}")]
    Duplicate { name: String, existing: AlgorithmId },

    #[error("Unknown algorithm {0}")]
    UnknownAlgorithm(AlgorithmId),

    #[error("Algorithm {algorithm} has no {direction} port named '{port}'")]
    UnknownPort {
        algorithm: AlgorithmId,
        direction: &'static str,
        port: String,
    },

    #[error("Unknown connection {0}")]
    UnknownConnection(crate::network::id::ConnectionId),

    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(String),
}

/// What went wrong inside an algorithm's `process()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingErrorKind {
    /// A required input carried no data.
    MissingInput,
    /// The input data was present but unusable.
    InvalidData,
    /// The algorithm observed a stop request and gave up.
    Cancelled,
    Other,
}

/// Runtime failure of an algorithm's `process()`.
///
/// Caught at the per-algorithm boundary by the scheduler; never propagated
/// to downstream algorithms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct ProcessingError {
    pub kind: ProcessingErrorKind,
    pub message: String,
}

impl ProcessingError {
    pub fn new(kind: ProcessingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_input(port: &str) -> Self {
        Self::new(
            ProcessingErrorKind::MissingInput,
            format!("input '{}' has no data", port),
        )
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(ProcessingErrorKind::InvalidData, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ProcessingErrorKind::Cancelled, "stop requested")
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProcessingErrorKind::Other, message)
    }
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;
