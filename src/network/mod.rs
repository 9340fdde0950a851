//! Processing network.
//!
//! A directed acyclic graph of [`Algorithm`]s connected output-to-input,
//! executed by a background scheduler that re-runs only what is dirty.
//!
//! ```text
//! DataInject ──Data──▶ TriangleNormals ──Triangles──▶ RenderTriangles
//! DataInject ──Data──▶ RenderLines
//! ```
//!
//! - Graph mutation (`add_algorithm`, `connect`, ...) is synchronous and
//!   validated: type compatibility, acyclicity and single-driver inputs.
//! - Execution happens on the `processing-network` thread, in topological
//!   order. Failures are contained to the failing algorithm.
//! - Visualizations are driven by the display surface through
//!   [`ProcessingNetwork::visit_visualizations`].

pub mod algorithm;
pub mod connection;
pub mod data;
pub mod error;
pub mod events;
pub mod executor;
pub mod id;
pub mod port;
pub mod topology;

pub use algorithm::{
    shared, Algorithm, AlgorithmHandle, DirtyTrigger, ProcessContext, Visualization,
};
pub use connection::{Connection, ConnectionSnapshot};
pub use data::{AlgorithmData, DataType};
pub use error::{NetworkError, NetworkResult, ProcessingError, ProcessingErrorKind};
pub use events::{AlgorithmSnapshot, CycleReport, NetworkEvent, NetworkStats, TopologySnapshot};
pub use executor::ProcessingNetwork;
pub use id::{AlgorithmId, ConnectionId, PortId};
pub use port::{Port, PortDescriptor, PortDirection};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Algorithm panics are caught by the scheduler, so a poisoned lock only
/// means a visitor or caller panicked; the guarded state is still usable.
pub(crate) fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
