//! Status messages and snapshots published by the processing network.
//!
//! The scheduler thread never calls into UI code. It pushes `NetworkEvent`s
//! into a bounded channel that the display side drains once per frame.

use crate::network::connection::ConnectionSnapshot;
use crate::network::error::ProcessingError;
use crate::network::id::AlgorithmId;
use crate::network::port::PortDescriptor;
use std::time::Duration;

/// Messages sent from the scheduler thread.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// The scheduling loop started.
    Started,

    /// An algorithm finished `process()` successfully.
    AlgorithmProcessed {
        id: AlgorithmId,
        name: String,
        elapsed: Duration,
    },

    /// An algorithm's `process()` failed. Its dependents keep their previous inputs.
    AlgorithmFailed {
        id: AlgorithmId,
        name: String,
        error: ProcessingError,
    },

    /// Propagated data did not satisfy a typed input and was dropped.
    DataRejected {
        id: AlgorithmId,
        port: String,
        message: String,
    },

    /// The scheduling loop exited.
    Stopped,
}

/// Snapshot of a single registered algorithm.
#[derive(Debug, Clone)]
pub struct AlgorithmSnapshot {
    pub id: AlgorithmId,
    pub name: String,
    pub description: String,
    pub ports: Vec<PortDescriptor>,
    pub dirty: bool,
    pub parked: bool,
    pub is_visualization: bool,
}

/// Complete topology snapshot of the network graph.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    pub algorithms: Vec<AlgorithmSnapshot>,
    pub connections: Vec<ConnectionSnapshot>,
}

impl TopologySnapshot {
    /// Whether data produced by `from` can flow into `to`.
    pub fn reaches(&self, from: AlgorithmId, to: AlgorithmId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            for c in self.connections.iter().filter(|c| c.from == node) {
                if !seen.contains(&c.to) {
                    seen.push(c.to);
                    stack.push(c.to);
                }
            }
        }
        false
    }
}

/// What one scheduling cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Algorithms whose `process()` succeeded, in execution order.
    pub executed: Vec<AlgorithmId>,
    /// Algorithms whose `process()` failed.
    pub failed: Vec<AlgorithmId>,
    /// Dirty algorithms skipped because an ancestor was dirty too.
    pub deferred: Vec<AlgorithmId>,
    /// The cycle stopped early because a stop was requested.
    pub interrupted: bool,
}

impl CycleReport {
    /// Nothing ran: the loop may go to sleep.
    pub fn is_idle(&self) -> bool {
        self.executed.is_empty() && self.failed.is_empty()
    }
}

/// Counters since the network was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub cycles: u64,
    pub executions: u64,
    pub failures: u64,
    pub dropped_events: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_report_idle() {
        let mut report = CycleReport::default();
        assert!(report.is_idle());
        report.deferred.push(AlgorithmId(1));
        assert!(report.is_idle());
        report.failed.push(AlgorithmId(0));
        assert!(!report.is_idle());
    }

    #[test]
    fn test_topology_reaches() {
        let edge = |id, from, to| ConnectionSnapshot {
            id: crate::network::ConnectionId(id),
            from: AlgorithmId(from),
            output: "out".to_string(),
            to: AlgorithmId(to),
            input: "in".to_string(),
        };
        let topology = TopologySnapshot {
            algorithms: Vec::new(),
            connections: vec![edge(0, 0, 1), edge(1, 1, 2)],
        };
        assert!(topology.reaches(AlgorithmId(0), AlgorithmId(2)));
        assert!(!topology.reaches(AlgorithmId(2), AlgorithmId(0)));
        assert!(topology.reaches(AlgorithmId(3), AlgorithmId(3)));
    }
}
