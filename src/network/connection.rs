//! Connections: directed edges from an output port to an input port.

use crate::network::id::{AlgorithmId, ConnectionId, PortId};

/// An edge from `source` (an output port) to `target` (an input port).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: PortId,
    pub target: PortId,
}

impl Connection {
    pub fn from_algorithm(&self) -> AlgorithmId {
        self.source.algorithm()
    }

    pub fn to_algorithm(&self) -> AlgorithmId {
        self.target.algorithm()
    }

    pub fn touches(&self, algorithm: AlgorithmId) -> bool {
        self.from_algorithm() == algorithm || self.to_algorithm() == algorithm
    }
}

/// Serializable view of one connection, with port names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub id: ConnectionId,
    pub from: AlgorithmId,
    pub output: String,
    pub to: AlgorithmId,
    pub input: String,
}
