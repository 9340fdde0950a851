//! Identity types for the processing network.
//!
//! `AlgorithmId` is a direct index into the network's slot vector. Slots of
//! removed algorithms are tombstoned, never reused, so an id stays valid
//! (or reports "unknown") for the network's lifetime.

use std::fmt;

/// Index into the network's algorithm slots.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AlgorithmId(pub u32);

impl AlgorithmId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AlgorithmId({})", self.0)
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One port of one algorithm.
///
/// Input and output ports are numbered independently, so the direction is
/// implied by where the id is used (connection source vs. target).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId {
    algorithm: AlgorithmId,
    port: u16,
}

impl PortId {
    pub fn new(algorithm: AlgorithmId, port_index: u16) -> Self {
        Self {
            algorithm,
            port: port_index,
        }
    }

    #[inline]
    pub fn algorithm(self) -> AlgorithmId {
        self.algorithm
    }

    #[inline]
    pub fn port_index(self) -> usize {
        self.port as usize
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortId(algorithm={}, port={})", self.algorithm.0, self.port)
    }
}

/// Identifier of a connection. Assigned monotonically, never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_id_addresses_any_algorithm() {
        // Slots are never reused, so indices keep growing.
        for index in [0, 100, 1 << 20, u32::MAX - 1] {
            let port = PortId::new(AlgorithmId(index), u16::MAX);
            assert_eq!(port.algorithm(), AlgorithmId(index));
            assert_eq!(port.port_index(), u16::MAX as usize);
        }
        assert_ne!(
            PortId::new(AlgorithmId(1 << 20), 0),
            PortId::new(AlgorithmId(0), 0)
        );
    }

    #[test]
    fn test_algorithm_id_display() {
        assert_eq!(AlgorithmId(42).to_string(), "AlgorithmId(42)");
        assert_eq!(AlgorithmId(42).index(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(3).to_string(), "ConnectionId(3)");
    }
}
