//! Processing network: graph registry and background scheduler.
//!
//! The scheduler thread repeats cycles while there is work:
//! 1. Under the registry lock, collect dirty algorithms in topological
//!    order and snapshot their inputs. A dirty algorithm with a dirty
//!    ancestor waits for a later cycle.
//! 2. Without the registry lock, run `process()` on each collected algorithm.
//! 3. Under the registry lock, apply outputs and propagate changed data
//!    through connections, dirtying the consumers.
//!
//! With nothing dirty it sleeps on the wake channel until a graph change,
//! an injection or `stop()` arrives.

use crate::config::NetworkSettings;
use crate::network::algorithm::{
    AlgorithmHandle, DirtyTrigger, ProcessContext, SlotState, Visualization,
};
use crate::network::connection::{Connection, ConnectionSnapshot};
use crate::network::data::AlgorithmData;
use crate::network::error::{NetworkError, NetworkResult, ProcessingError, ProcessingErrorKind};
use crate::network::events::{
    AlgorithmSnapshot, CycleReport, NetworkEvent, NetworkStats, TopologySnapshot,
};
use crate::network::id::{AlgorithmId, ConnectionId, PortId};
use crate::network::lock_unpoisoned;
use crate::network::port::{Port, PortDescriptor, PortDirection};
use crate::network::topology;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// A registered algorithm with its live ports.
struct AlgorithmSlot {
    handle: AlgorithmHandle,
    name: String,
    description: String,
    descriptors: Vec<PortDescriptor>,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    state: Arc<SlotState>,
    is_visualization: bool,
    /// Tombstone. Slots are never reused so ids stay stable.
    removed: bool,
}

impl AlgorithmSlot {
    fn port_index(&self, direction: PortDirection, name: &str) -> Option<usize> {
        let ports = match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        ports.iter().position(|p| p.name() == name)
    }
}

/// Everything guarded by the network-wide lock.
#[derive(Default)]
struct Registry {
    slots: Vec<AlgorithmSlot>,
    connections: Vec<Connection>,
    next_connection: u32,
    /// Topological order over live slots. Recomputed on graph change.
    order: Vec<usize>,
    order_dirty: bool,
}

impl Registry {
    fn slot(&self, id: AlgorithmId) -> NetworkResult<&AlgorithmSlot> {
        self.slots
            .get(id.index())
            .filter(|s| !s.removed)
            .ok_or(NetworkError::UnknownAlgorithm(id))
    }

    fn slot_mut(&mut self, id: AlgorithmId) -> NetworkResult<&mut AlgorithmSlot> {
        self.slots
            .get_mut(id.index())
            .filter(|s| !s.removed)
            .ok_or(NetworkError::UnknownAlgorithm(id))
    }

    fn port(&self, id: AlgorithmId, direction: PortDirection, name: &str) -> NetworkResult<usize> {
        self.slot(id)?
            .port_index(direction, name)
            .ok_or_else(|| NetworkError::UnknownPort {
                algorithm: id,
                direction: direction.as_str(),
                port: name.to_string(),
            })
    }

    fn adjacency(&self) -> Vec<Vec<usize>> {
        topology::build_adjacency(
            self.slots.len(),
            self.connections
                .iter()
                .map(|c| (c.from_algorithm().index(), c.to_algorithm().index())),
        )
    }

    fn live_mask(&self) -> Vec<bool> {
        self.slots.iter().map(|s| !s.removed).collect()
    }

    fn invalidate_order(&mut self) {
        self.order_dirty = true;
    }

    fn ensure_order(&mut self) {
        if !self.order_dirty {
            return;
        }
        let adj = self.adjacency();
        match topology::topological_order(&adj, &self.live_mask()) {
            Some(order) => self.order = order,
            // `connect` rejects cycles, so this is a broken invariant.
            None => tracing::error!("Processing network graph has a cycle; keeping previous order"),
        }
        self.order_dirty = false;
    }

    /// Dirty (and not parked) flags per slot, plus whether an ancestor is pending.
    fn pending(&mut self) -> (Vec<bool>, Vec<bool>) {
        self.ensure_order();
        let pending: Vec<bool> = self
            .slots
            .iter()
            .map(|s| !s.removed && s.state.is_dirty() && !s.state.is_parked())
            .collect();
        let waiting = topology::has_marked_ancestor(&self.adjacency(), &self.order, &pending);
        (pending, waiting)
    }

    /// Store `data` on an input, dirtying its owner if the input changed.
    fn deliver(
        &mut self,
        target: PortId,
        data: AlgorithmData,
    ) -> Result<bool, NetworkError> {
        let slot = self.slot_mut(target.algorithm())?;
        let changed = slot.inputs[target.port_index()].set_data(data)?;
        if changed {
            slot.state.invalidate();
        }
        Ok(changed)
    }

    /// Drop the data on an input that lost its driver.
    fn clear_input(&mut self, target: PortId) {
        if let Ok(slot) = self.slot_mut(target.algorithm()) {
            if slot.inputs[target.port_index()].clear() {
                slot.inputs[target.port_index()].mark_consumed();
            }
            slot.state.invalidate();
        }
    }
}

/// One algorithm collected for execution in the current cycle.
struct Job {
    id: AlgorithmId,
    name: String,
    handle: AlgorithmHandle,
    state: Arc<SlotState>,
    inputs: Vec<(&'static str, Option<AlgorithmData>)>,
    output_names: Vec<&'static str>,
}

/// State shared between the network handle and the scheduler thread.
struct Shared {
    registry: Mutex<Registry>,
    stop: AtomicBool,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    event_tx: Sender<NetworkEvent>,
    event_rx: Receiver<NetworkEvent>,
    idle_wait: Duration,
    cycles: AtomicU64,
    executions: AtomicU64,
    failures: AtomicU64,
    dropped_events: AtomicU64,
}

impl Shared {
    fn wake(&self) {
        // A full channel already holds a pending wake-up.
        let _ = self.wake_tx.try_send(());
    }

    fn emit(&self, event: NetworkEvent) {
        if self.event_tx.try_send(event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn run(&self) {
        tracing::info!("Processing network thread started");
        self.emit(NetworkEvent::Started);

        while !self.stop.load(Ordering::SeqCst) {
            let report = self.run_cycle();
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            if report.is_idle() {
                match self.wake_rx.recv_timeout(self.idle_wait) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }

        self.emit(NetworkEvent::Stopped);
        tracing::info!("Processing network thread exiting");
    }

    fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let jobs = self.collect(&mut report);
        if jobs.is_empty() {
            return report;
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
        let mut results = Vec::with_capacity(jobs.len());
        let mut parked = Vec::new();

        for job in jobs {
            if self.stop.load(Ordering::SeqCst) {
                tracing::debug!("Stop requested, leaving {} dirty", job.name);
                report.interrupted = true;
                break;
            }

            // Cleared before running so an injection during process() re-dirties it.
            job.state.dirty.store(false, Ordering::SeqCst);
            let generation = job.state.generation();
            let started = Instant::now();
            let mut ctx = ProcessContext::new(job.inputs, job.output_names, &self.stop);
            let outcome = {
                let mut algorithm = lock_unpoisoned(&job.handle);
                catch_unwind(AssertUnwindSafe(|| algorithm.process(&mut ctx)))
                    .unwrap_or_else(|_| Err(ProcessingError::other("process() panicked")))
            };
            self.executions.fetch_add(1, Ordering::Relaxed);

            match outcome {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    tracing::trace!("Processed {} ({:?}) in {:?}", job.name, job.id, elapsed);
                    report.executed.push(job.id);
                    results.push((job.id, ctx.into_outputs()));
                    self.emit(NetworkEvent::AlgorithmProcessed {
                        id: job.id,
                        name: job.name,
                        elapsed,
                    });
                }
                Err(error)
                    if error.kind == ProcessingErrorKind::Cancelled
                        && self.stop.load(Ordering::SeqCst) =>
                {
                    tracing::debug!("{} ({:?}) cancelled", job.name, job.id);
                    job.state.dirty.store(true, Ordering::SeqCst);
                    report.interrupted = true;
                    break;
                }
                Err(error) => {
                    tracing::error!("Algorithm {} ({:?}) failed: {}", job.name, job.id, error);
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    job.state.dirty.store(true, Ordering::SeqCst);
                    report.failed.push(job.id);
                    parked.push((job.state.clone(), generation));
                    self.emit(NetworkEvent::AlgorithmFailed {
                        id: job.id,
                        name: job.name,
                        error,
                    });
                }
            }
        }

        self.propagate(results, parked);
        report
    }

    /// Phase 1: pick runnable algorithms and snapshot their inputs.
    fn collect(&self, report: &mut CycleReport) -> Vec<Job> {
        let mut registry = lock_unpoisoned(&self.registry);
        let (pending, waiting) = registry.pending();
        let mut jobs = Vec::new();

        for &idx in &registry.order {
            if !pending[idx] {
                continue;
            }
            let id = AlgorithmId(idx as u32);
            if waiting[idx] {
                report.deferred.push(id);
                continue;
            }
            let slot = &registry.slots[idx];
            jobs.push(Job {
                id,
                name: slot.name.clone(),
                handle: Arc::clone(&slot.handle),
                state: Arc::clone(&slot.state),
                inputs: slot
                    .inputs
                    .iter()
                    .map(|p| (p.name(), p.data().cloned()))
                    .collect(),
                output_names: slot.outputs.iter().map(|p| p.name()).collect(),
            });
        }
        jobs
    }

    /// Phase 3: apply outputs, push changed data downstream.
    fn propagate(
        &self,
        results: Vec<(AlgorithmId, Vec<Option<AlgorithmData>>)>,
        parked: Vec<(Arc<SlotState>, u64)>,
    ) {
        let mut registry = lock_unpoisoned(&self.registry);

        // Park first: a change delivered below must be able to unpark.
        for (state, generation) in parked {
            state.park(generation);
        }

        for (id, outputs) in results {
            let Ok(slot) = registry.slot_mut(id) else {
                // Removed while it was running.
                continue;
            };
            for (index, data) in outputs.into_iter().enumerate() {
                if let Some(data) = data {
                    if let Err(e) = slot.outputs[index].set_data(data) {
                        tracing::warn!("{} wrote invalid output: {}", slot.name, e);
                    }
                }
            }

            let changed: Vec<(usize, AlgorithmData)> = slot
                .outputs
                .iter()
                .enumerate()
                .filter(|(_, port)| port.is_changed())
                .filter_map(|(i, port)| port.data().map(|d| (i, d.clone())))
                .collect();

            for (index, data) in changed {
                let source = PortId::new(id, index as u16);
                let targets: Vec<PortId> = registry
                    .connections
                    .iter()
                    .filter(|c| c.source == source)
                    .map(|c| c.target)
                    .collect();

                for target in targets {
                    if let Err(e) = registry.deliver(target, data.clone()) {
                        let port = registry
                            .slot(target.algorithm())
                            .map(|s| s.inputs[target.port_index()].name())
                            .unwrap_or("?");
                        tracing::warn!("Dropped data for {:?}.{}: {}", target.algorithm(), port, e);
                        self.emit(NetworkEvent::DataRejected {
                            id: target.algorithm(),
                            port: port.to_string(),
                            message: e.to_string(),
                        });
                    }
                }

                // Every connection sharing this source has consumed it.
                if let Ok(slot) = registry.slot_mut(id) {
                    slot.outputs[index].mark_consumed();
                }
            }
        }
    }
}

/// The processing network: algorithm registry, connections and scheduler thread.
///
/// All methods take `&self`; wrap the network in an `Arc` to share it
/// between the application, the display surface and loader threads.
pub struct ProcessingNetwork {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessingNetwork {
    pub fn new(settings: &NetworkSettings) -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        let (event_tx, event_rx) = bounded(settings.event_channel_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                stop: AtomicBool::new(false),
                wake_tx,
                wake_rx,
                event_tx,
                event_rx,
                idle_wait: Duration::from_millis(settings.idle_wait_ms.max(1)),
                cycles: AtomicU64::new(0),
                executions: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                dropped_events: AtomicU64::new(0),
            }),
            thread: Mutex::new(None),
        }
    }

    // ── Graph building ──

    /// Register an algorithm. It starts dirty.
    ///
    /// The algorithm is locked only while the registry is not, so a handle
    /// that is still inside `process()` never stalls the network.
    pub fn add_algorithm(&self, handle: AlgorithmHandle) -> NetworkResult<AlgorithmId> {
        let state = Arc::new(SlotState::new());
        let slot = {
            let mut algorithm = lock_unpoisoned(&handle);
            let descriptors = algorithm.ports().to_vec();
            let (inputs, outputs): (Vec<_>, Vec<_>) = descriptors
                .iter()
                .cloned()
                .partition(|d| d.direction == PortDirection::Input);
            AlgorithmSlot {
                name: algorithm.name().to_string(),
                description: algorithm.description().to_string(),
                is_visualization: algorithm.as_visualization_mut().is_some(),
                descriptors,
                inputs: inputs.into_iter().map(Port::new).collect(),
                outputs: outputs.into_iter().map(Port::new).collect(),
                state: Arc::clone(&state),
                handle: Arc::clone(&handle),
                removed: false,
            }
        };

        let mut registry = lock_unpoisoned(&self.shared.registry);
        let address = Arc::as_ptr(&handle) as *const ();
        if let Some(existing) = registry
            .slots
            .iter()
            .position(|s| !s.removed && Arc::as_ptr(&s.handle) as *const () == address)
        {
            return Err(NetworkError::Duplicate {
                name: registry.slots[existing].name.clone(),
                existing: AlgorithmId(existing as u32),
            });
        }
        let id = AlgorithmId(registry.slots.len() as u32);
        tracing::info!("Added algorithm {:?} '{}'", id, slot.name);
        registry.slots.push(slot);
        registry.invalidate_order();
        drop(registry);

        // Attached after registration so a rejected duplicate keeps its trigger.
        lock_unpoisoned(&handle).attach(DirtyTrigger::new(state, self.shared.wake_tx.clone()));
        self.shared.wake();
        Ok(id)
    }

    /// Remove an algorithm and every connection touching it.
    pub fn remove_algorithm(&self, id: AlgorithmId) -> NetworkResult<AlgorithmHandle> {
        let mut registry = lock_unpoisoned(&self.shared.registry);
        registry.slot(id)?;

        let (dropped, kept): (Vec<Connection>, Vec<Connection>) =
            std::mem::take(&mut registry.connections)
                .into_iter()
                .partition(|c| c.touches(id));
        registry.connections = kept;
        for connection in dropped {
            if connection.to_algorithm() != id {
                registry.clear_input(connection.target);
            }
        }

        let slot = registry.slot_mut(id)?;
        slot.removed = true;
        let handle = Arc::clone(&slot.handle);
        tracing::info!("Removed algorithm {:?} '{}'", id, slot.name);
        registry.invalidate_order();
        drop(registry);

        self.shared.wake();
        Ok(handle)
    }

    /// Connect `source.output` to `target.input`.
    ///
    /// Checks port existence, type compatibility, acyclicity and that the
    /// input is not already driven, in that order. On error the graph is
    /// left unchanged.
    pub fn connect(
        &self,
        source: AlgorithmId,
        output: &str,
        target: AlgorithmId,
        input: &str,
    ) -> NetworkResult<ConnectionId> {
        let mut registry = lock_unpoisoned(&self.shared.registry);

        let out_index = registry.port(source, PortDirection::Output, output)?;
        let in_index = registry.port(target, PortDirection::Input, input)?;

        let produced = registry.slots[source.index()].outputs[out_index].data_type();
        let accepted = registry.slots[target.index()].inputs[in_index].data_type();
        if !produced.is_compatible_with(&accepted) {
            return Err(NetworkError::TypeMismatch {
                output: output.to_string(),
                produced: produced.name(),
                input: input.to_string(),
                accepted: accepted.name(),
            });
        }

        if topology::would_create_cycle(&registry.adjacency(), source.index(), target.index()) {
            return Err(NetworkError::Cycle {
                from: source,
                to: target,
            });
        }

        let target_port = PortId::new(target, in_index as u16);
        if registry.connections.iter().any(|c| c.target == target_port) {
            return Err(NetworkError::PortConflict {
                algorithm: target,
                port: input.to_string(),
            });
        }

        let id = ConnectionId(registry.next_connection);
        registry.next_connection += 1;
        registry.connections.push(Connection {
            id,
            source: PortId::new(source, out_index as u16),
            target: target_port,
        });
        registry.invalidate_order();

        // Hand over whatever the source already produced.
        let current = registry.slots[source.index()].outputs[out_index]
            .data()
            .cloned();
        if let Some(data) = current {
            if let Err(e) = registry.deliver(target_port, data) {
                tracing::warn!("Initial data of {:?} rejected by {:?}: {}", source, target, e);
            }
        }
        registry.slots[target.index()].state.invalidate();

        tracing::info!(
            "Connected {:?}.{} -> {:?}.{} as {:?}",
            source,
            output,
            target,
            input,
            id
        );
        drop(registry);

        self.shared.wake();
        Ok(id)
    }

    /// Remove a connection. The orphaned input is cleared and its owner dirtied.
    pub fn disconnect(&self, id: ConnectionId) -> NetworkResult<()> {
        let mut registry = lock_unpoisoned(&self.shared.registry);
        let index = registry
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or(NetworkError::UnknownConnection(id))?;

        let connection = registry.connections.remove(index);
        registry.clear_input(connection.target);
        registry.invalidate_order();
        tracing::info!("Removed connection {:?}", id);
        drop(registry);

        self.shared.wake();
        Ok(())
    }

    /// Request re-processing of an algorithm, e.g. after a parameter change.
    pub fn mark_dirty(&self, id: AlgorithmId) -> NetworkResult<()> {
        lock_unpoisoned(&self.shared.registry).slot(id)?.state.invalidate();
        self.shared.wake();
        Ok(())
    }

    // ── Lifecycle ──

    /// Launch the scheduling loop on a background thread.
    pub fn start(&self) -> NetworkResult<()> {
        let mut thread = lock_unpoisoned(&self.thread);
        if thread.is_some() {
            tracing::warn!("Processing network already running");
            return Ok(());
        }

        self.shared.stop.store(false, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("processing-network".to_string())
            .spawn(move || shared.run())
            .map_err(|e| NetworkError::Spawn(e.to_string()))?;
        *thread = Some(handle);
        Ok(())
    }

    /// Stop the loop after the algorithm currently executing and wait for the
    /// thread to exit.
    pub fn stop(&self) {
        let Some(handle) = lock_unpoisoned(&self.thread).take() else {
            return;
        };

        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.wake();
        if handle.join().is_err() {
            tracing::error!("Processing network thread panicked");
        }
        self.shared.stop.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        lock_unpoisoned(&self.thread).is_some()
    }

    /// Run one scheduling cycle on the calling thread.
    ///
    /// Intended for headless drivers and tests; do not mix with a running
    /// background loop.
    pub fn run_cycle(&self) -> CycleReport {
        self.shared.run_cycle()
    }

    /// Run cycles until nothing runnable is left. Returns the number of cycles.
    pub fn run_until_idle(&self) -> usize {
        let mut cycles = 0;
        while !self.run_cycle().is_idle() {
            cycles += 1;
        }
        cycles
    }

    // ── Frame hooks ──

    /// Apply `visitor` to every registered visualization, in registration order.
    ///
    /// The registry is snapshotted under its lock and released before any
    /// visitor runs; each visualization is locked while it is visited.
    /// Returns the number of visualizations visited.
    pub fn visit_visualizations<F>(&self, mut visitor: F) -> usize
    where
        F: FnMut(&mut dyn Visualization),
    {
        let handles: Vec<AlgorithmHandle> = {
            let registry = lock_unpoisoned(&self.shared.registry);
            registry
                .slots
                .iter()
                .filter(|s| !s.removed && s.is_visualization)
                .map(|s| Arc::clone(&s.handle))
                .collect()
        };

        let mut visited = 0;
        for handle in handles {
            let mut algorithm = lock_unpoisoned(&handle);
            if let Some(visualization) = algorithm.as_visualization_mut() {
                visitor(visualization);
                visited += 1;
            }
        }
        visited
    }

    // ── Inspection ──

    /// Whether the algorithm, or anything upstream of it, has pending work.
    pub fn is_dirty(&self, id: AlgorithmId) -> NetworkResult<bool> {
        let mut registry = lock_unpoisoned(&self.shared.registry);
        let own = registry.slot(id)?.state.is_dirty();
        let (_, waiting) = registry.pending();
        Ok(own || waiting[id.index()])
    }

    /// Whether the algorithm failed and waits for new input.
    pub fn is_parked(&self, id: AlgorithmId) -> NetworkResult<bool> {
        Ok(lock_unpoisoned(&self.shared.registry)
            .slot(id)?
            .state
            .is_parked())
    }

    pub fn input_data(&self, id: AlgorithmId, input: &str) -> NetworkResult<Option<AlgorithmData>> {
        let registry = lock_unpoisoned(&self.shared.registry);
        let index = registry.port(id, PortDirection::Input, input)?;
        Ok(registry.slots[id.index()].inputs[index].data().cloned())
    }

    pub fn output_data(
        &self,
        id: AlgorithmId,
        output: &str,
    ) -> NetworkResult<Option<AlgorithmData>> {
        let registry = lock_unpoisoned(&self.shared.registry);
        let index = registry.port(id, PortDirection::Output, output)?;
        Ok(registry.slots[id.index()].outputs[index].data().cloned())
    }

    pub fn algorithm(&self, id: AlgorithmId) -> NetworkResult<AlgorithmHandle> {
        Ok(Arc::clone(
            &lock_unpoisoned(&self.shared.registry).slot(id)?.handle,
        ))
    }

    /// Live algorithms in registration order.
    pub fn algorithm_ids(&self) -> Vec<AlgorithmId> {
        lock_unpoisoned(&self.shared.registry)
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed)
            .map(|(i, _)| AlgorithmId(i as u32))
            .collect()
    }

    /// Current topological order, ties broken by registration order.
    pub fn execution_order(&self) -> Vec<AlgorithmId> {
        let mut registry = lock_unpoisoned(&self.shared.registry);
        registry.ensure_order();
        registry
            .order
            .iter()
            .map(|&i| AlgorithmId(i as u32))
            .collect()
    }

    pub fn connections(&self) -> Vec<ConnectionSnapshot> {
        let registry = lock_unpoisoned(&self.shared.registry);
        Self::connection_snapshots(&registry)
    }

    pub fn topology(&self) -> TopologySnapshot {
        let registry = lock_unpoisoned(&self.shared.registry);
        let algorithms = registry
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed)
            .map(|(i, s)| AlgorithmSnapshot {
                id: AlgorithmId(i as u32),
                name: s.name.clone(),
                description: s.description.clone(),
                ports: s.descriptors.clone(),
                dirty: s.state.is_dirty(),
                parked: s.state.is_parked(),
                is_visualization: s.is_visualization,
            })
            .collect();
        TopologySnapshot {
            algorithms,
            connections: Self::connection_snapshots(&registry),
        }
    }

    fn connection_snapshots(registry: &Registry) -> Vec<ConnectionSnapshot> {
        registry
            .connections
            .iter()
            .map(|c| ConnectionSnapshot {
                id: c.id,
                from: c.from_algorithm(),
                output: registry.slots[c.from_algorithm().index()].outputs
                    [c.source.port_index()]
                .name()
                .to_string(),
                to: c.to_algorithm(),
                input: registry.slots[c.to_algorithm().index()].inputs[c.target.port_index()]
                    .name()
                    .to_string(),
            })
            .collect()
    }

    /// Receiver for scheduler status events. Clones share one queue.
    pub fn events(&self) -> Receiver<NetworkEvent> {
        self.shared.event_rx.clone()
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            cycles: self.shared.cycles.load(Ordering::Relaxed),
            executions: self.shared.executions.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
            dropped_events: self.shared.dropped_events.load(Ordering::Relaxed),
        }
    }
}

impl Default for ProcessingNetwork {
    fn default() -> Self {
        Self::new(&NetworkSettings::default())
    }
}

impl Drop for ProcessingNetwork {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::algorithm::{shared, Algorithm};
    use crate::network::data::DataType;

    /// Emits `seed + sum(inputs)` on "out".
    struct Adder {
        seed: u32,
        ports: Vec<PortDescriptor>,
        runs: u32,
    }

    impl Adder {
        fn source(seed: u32) -> Self {
            Self {
                seed,
                ports: vec![PortDescriptor::output("out", "", DataType::of::<u32>())],
                runs: 0,
            }
        }

        fn node() -> Self {
            Self {
                seed: 0,
                ports: vec![
                    PortDescriptor::input("in", "", DataType::of::<u32>()),
                    PortDescriptor::output("out", "", DataType::of::<u32>()),
                ],
                runs: 0,
            }
        }
    }

    impl Algorithm for Adder {
        fn name(&self) -> &str {
            "Adder"
        }

        fn ports(&self) -> &[PortDescriptor] {
            &self.ports
        }

        fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
            self.runs += 1;
            let upstream = match ctx.input_data("in") {
                Some(_) => *ctx.input::<u32>("in")?,
                None => 0,
            };
            ctx.set_output("out", AlgorithmData::new(self.seed + upstream))
                .map_err(|e| ProcessingError::other(e.to_string()))
        }
    }

    fn value(data: Option<AlgorithmData>) -> Option<u32> {
        data.and_then(|d| d.downcast_ref::<u32>().copied())
    }

    #[test]
    fn test_chain_propagates_in_order() {
        let network = ProcessingNetwork::default();
        let a = network.add_algorithm(shared(Adder::source(2))).unwrap();
        let b = network.add_algorithm(shared(Adder::node())).unwrap();
        let c = network.add_algorithm(shared(Adder::node())).unwrap();
        network.connect(a, "out", b, "in").unwrap();
        network.connect(b, "out", c, "in").unwrap();

        let first = network.run_cycle();
        assert_eq!(first.executed, vec![a]);
        assert_eq!(first.deferred, vec![b, c]);

        network.run_until_idle();
        assert_eq!(value(network.input_data(c, "in").unwrap()), Some(2));
        assert_eq!(value(network.output_data(c, "out").unwrap()), Some(2));
        assert!(!network.is_dirty(c).unwrap());
    }

    #[test]
    fn test_idle_network_runs_nothing() {
        let network = ProcessingNetwork::default();
        let source = shared(Adder::source(1));
        let a = network.add_algorithm(source.clone()).unwrap();
        network.run_until_idle();
        let runs = lock_unpoisoned(&source).runs;

        assert!(network.run_cycle().is_idle());
        assert_eq!(lock_unpoisoned(&source).runs, runs);
        assert!(!network.is_dirty(a).unwrap());
    }

    #[test]
    fn test_duplicate_registration() {
        let network = ProcessingNetwork::default();
        let source = shared(Adder::source(1));
        let id = network.add_algorithm(source.clone()).unwrap();
        let err = network.add_algorithm(source).unwrap_err();
        assert_eq!(
            err,
            NetworkError::Duplicate {
                name: "Adder".to_string(),
                existing: id
            }
        );
    }

    #[test]
    fn test_unknown_port() {
        let network = ProcessingNetwork::default();
        let a = network.add_algorithm(shared(Adder::source(1))).unwrap();
        let b = network.add_algorithm(shared(Adder::node())).unwrap();
        assert!(matches!(
            network.connect(a, "missing", b, "in"),
            Err(NetworkError::UnknownPort { .. })
        ));
        assert!(matches!(
            network.connect(a, "out", b, "out"),
            Err(NetworkError::UnknownPort { direction: "input", .. })
        ));
    }

    #[test]
    fn test_remove_algorithm_drops_connections() {
        let network = ProcessingNetwork::default();
        let a = network.add_algorithm(shared(Adder::source(4))).unwrap();
        let b = network.add_algorithm(shared(Adder::node())).unwrap();
        network.connect(a, "out", b, "in").unwrap();
        network.run_until_idle();
        assert_eq!(value(network.input_data(b, "in").unwrap()), Some(4));

        network.remove_algorithm(a).unwrap();
        assert!(network.connections().is_empty());
        assert!(network.input_data(b, "in").unwrap().is_none());
        assert!(network.is_dirty(b).unwrap());
        assert_eq!(network.algorithm_ids(), vec![b]);
        assert!(matches!(
            network.remove_algorithm(a),
            Err(NetworkError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_start_stop_idempotent() {
        let network = ProcessingNetwork::default();
        network.start().unwrap();
        network.start().unwrap();
        assert!(network.is_running());
        network.stop();
        network.stop();
        assert!(!network.is_running());
    }

    /// Fails every run; the first run also fires its own trigger.
    struct FailsAfterInput {
        trigger: Option<DirtyTrigger>,
        runs: u32,
    }

    impl Algorithm for FailsAfterInput {
        fn name(&self) -> &str {
            "FailsAfterInput"
        }

        fn ports(&self) -> &[PortDescriptor] {
            &[]
        }

        fn process(&mut self, _ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
            self.runs += 1;
            if self.runs == 1 {
                if let Some(trigger) = &self.trigger {
                    trigger.fire();
                }
            }
            Err(ProcessingError::other("bad data"))
        }

        fn attach(&mut self, trigger: DirtyTrigger) {
            self.trigger = Some(trigger);
        }
    }

    #[test]
    fn test_input_during_failed_run_prevents_parking() {
        let network = ProcessingNetwork::default();
        let id = network
            .add_algorithm(shared(FailsAfterInput {
                trigger: None,
                runs: 0,
            }))
            .unwrap();

        assert_eq!(network.run_cycle().failed, vec![id]);
        assert!(!network.is_parked(id).unwrap());

        // Retried with the new input, fails again with nothing newer.
        assert_eq!(network.run_cycle().failed, vec![id]);
        assert!(network.is_parked(id).unwrap());
        assert!(network.run_cycle().is_idle());
    }

    /// Blocks inside `process()` until released.
    struct Gate {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl Algorithm for Gate {
        fn name(&self) -> &str {
            "Gate"
        }

        fn ports(&self) -> &[PortDescriptor] {
            &[]
        }

        fn process(&mut self, _ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Ok(())
        }
    }

    #[test]
    fn test_readding_busy_algorithm_leaves_registry_free() {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let network = Arc::new(ProcessingNetwork::default());
        let id = network
            .add_algorithm(shared(Gate {
                entered: entered_tx,
                release: release_rx,
            }))
            .unwrap();

        let net = Arc::clone(&network);
        let runner = std::thread::spawn(move || net.run_cycle());
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let removed = network.remove_algorithm(id).unwrap();
        let net = Arc::clone(&network);
        let readd = std::thread::spawn(move || net.add_algorithm(removed));
        std::thread::sleep(Duration::from_millis(20));

        let (done_tx, done_rx) = bounded(1);
        let net = Arc::clone(&network);
        std::thread::spawn(move || {
            let _ = done_tx.send(net.algorithm_ids().len());
        });
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)).unwrap(), 0);

        release_tx.send(()).unwrap();
        assert_eq!(runner.join().unwrap().executed, vec![id]);
        let readded = readd.join().unwrap().unwrap();
        assert_ne!(readded, id);
        assert_eq!(network.algorithm_ids(), vec![readded]);
    }
}
