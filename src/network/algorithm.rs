//! Algorithm abstraction for the processing network.
//!
//! An algorithm declares its ports once, at construction, and implements
//! `process()`: read the current inputs from the `ProcessContext`, compute,
//! write outputs back to it. It never talks to other algorithms directly.
//!
//! Visualizations are algorithms that additionally expose per-frame hooks.
//! The display surface reaches them through
//! [`ProcessingNetwork::visit_visualizations`](crate::network::ProcessingNetwork::visit_visualizations);
//! the scheduler never calls those hooks.

use crate::network::data::AlgorithmData;
use crate::network::error::ProcessingError;
use crate::network::port::{PortDescriptor, PortDirection};
use crossbeam_channel::Sender;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared handle to a registered algorithm.
///
/// Each algorithm has its own lock, independent of the network registry,
/// so a long `process()` never blocks graph mutation.
pub type AlgorithmHandle = Arc<Mutex<dyn Algorithm>>;

/// Wrap an algorithm so it can be registered while the caller keeps a typed handle.
pub fn shared<A: Algorithm + 'static>(algorithm: A) -> Arc<Mutex<A>> {
    Arc::new(Mutex::new(algorithm))
}

/// Trait implemented by every node of the processing network.
pub trait Algorithm: Send {
    /// Human-readable name of this algorithm.
    fn name(&self) -> &str;

    /// What the algorithm does, for tooltips and logs.
    fn description(&self) -> &str {
        ""
    }

    /// Port descriptors, inputs and outputs in declaration order.
    ///
    /// Must return the same list for the algorithm's whole lifetime.
    fn ports(&self) -> &[PortDescriptor];

    /// Compute outputs from the current inputs.
    ///
    /// Must be idempotent for unchanged inputs and must not block
    /// indefinitely. Long computations should poll
    /// [`ProcessContext::stop_requested`] at safe points.
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError>;

    /// Called once when the algorithm is added to a network.
    ///
    /// Algorithms that accept data from outside the graph keep the trigger
    /// to mark themselves dirty.
    fn attach(&mut self, _trigger: DirtyTrigger) {}

    /// Visualization capability, if any.
    fn as_visualization_mut(&mut self) -> Option<&mut dyn Visualization> {
        None
    }
}

/// Per-frame lifecycle of an algorithm that draws something.
pub trait Visualization {
    /// One-time GPU resource setup, before the first frame.
    fn prepare(&mut self) {}

    /// Once per frame before `render`; pull the latest processed data into
    /// render-ready form.
    fn update(&mut self);

    /// Issue drawing commands.
    fn render(&mut self);

    /// Release GPU resources on shutdown.
    fn finalize(&mut self) {}
}

/// Scheduling flags of one registered algorithm, shared with its trigger.
#[derive(Debug)]
pub(crate) struct SlotState {
    /// Needs re-processing.
    pub dirty: AtomicBool,
    /// Failed last time; skipped until new input arrives.
    pub parked: AtomicBool,
    /// Bumped by every `invalidate()`.
    generation: AtomicU64,
}

impl SlotState {
    pub fn new() -> Self {
        Self {
            dirty: AtomicBool::new(true),
            parked: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// New input arrived: process again, even after a failure.
    pub fn invalidate(&self) {
        // The bump must precede the unpark, see `park`.
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.parked.store(false, Ordering::SeqCst);
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Park after a failure, unless it was invalidated since `generation`.
    pub fn park(&self, generation: u64) {
        self.parked.store(true, Ordering::SeqCst);
        if self.generation() != generation {
            self.parked.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn is_parked(&self) -> bool {
        self.parked.load(Ordering::SeqCst)
    }
}

/// Marks one algorithm dirty and wakes the scheduler.
///
/// Handed to algorithms through [`Algorithm::attach`]. Firing it takes no
/// network lock.
#[derive(Clone, Debug)]
pub struct DirtyTrigger {
    state: Arc<SlotState>,
    wake: Sender<()>,
}

impl DirtyTrigger {
    pub(crate) fn new(state: Arc<SlotState>, wake: Sender<()>) -> Self {
        Self { state, wake }
    }

    pub fn fire(&self) {
        self.state.invalidate();
        // A full channel already holds a pending wake-up.
        let _ = self.wake.try_send(());
    }
}

/// Inputs and outputs of one `process()` call.
///
/// Inputs are a snapshot taken before the cycle started, so every
/// algorithm of a cycle sees a consistent view. Outputs are collected here
/// and applied to the ports after the cycle.
pub struct ProcessContext<'a> {
    inputs: Vec<(&'static str, Option<AlgorithmData>)>,
    outputs: Vec<(&'static str, Option<AlgorithmData>)>,
    stop: &'a AtomicBool,
}

impl<'a> ProcessContext<'a> {
    pub fn new(
        inputs: Vec<(&'static str, Option<AlgorithmData>)>,
        output_names: Vec<&'static str>,
        stop: &'a AtomicBool,
    ) -> Self {
        Self {
            inputs,
            outputs: output_names.into_iter().map(|name| (name, None)).collect(),
            stop,
        }
    }

    /// Build a context for `ports` with the given input data, in input order.
    pub fn for_ports(
        ports: &[PortDescriptor],
        input_data: Vec<Option<AlgorithmData>>,
        stop: &'a AtomicBool,
    ) -> Self {
        let mut data = input_data.into_iter();
        let inputs = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
            .map(|p| (p.name, data.next().flatten()))
            .collect();
        let outputs = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .map(|p| p.name)
            .collect();
        Self::new(inputs, outputs, stop)
    }

    /// Raw payload on an input, if any.
    pub fn input_data(&self, name: &str) -> Option<&AlgorithmData> {
        self.inputs
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, data)| data.as_ref())
    }

    /// Typed payload on an input.
    pub fn input<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ProcessingError> {
        let data = self
            .input_data(name)
            .ok_or_else(|| ProcessingError::missing_input(name))?;
        data.downcast::<T>().ok_or_else(|| {
            ProcessingError::invalid_data(format!(
                "input '{}' carries {}, expected {}",
                name,
                data.type_name(),
                std::any::type_name::<T>()
            ))
        })
    }

    /// Typed payload on an input that may legitimately be empty.
    pub fn input_opt<T: Any + Send + Sync>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>, ProcessingError> {
        match self.input_data(name) {
            Some(_) => self.input::<T>(name).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_output(&mut self, name: &str, data: AlgorithmData) -> Result<(), ProcessingError> {
        let slot = self
            .outputs
            .iter_mut()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| ProcessingError::other(format!("no output named '{}'", name)))?;
        slot.1 = Some(data);
        Ok(())
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once a stop was requested. Use with `?` at safe points.
    pub fn check_stop(&self) -> Result<(), ProcessingError> {
        if self.stop_requested() {
            Err(ProcessingError::cancelled())
        } else {
            Ok(())
        }
    }

    /// Outputs written during `process()`, in output-port order.
    pub fn into_outputs(self) -> Vec<Option<AlgorithmData>> {
        self.outputs.into_iter().map(|(_, data)| data).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::data::DataType;
    use crate::network::error::ProcessingErrorKind;

    fn ports() -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input("A", "", DataType::of::<u32>()),
            PortDescriptor::output("Sum", "", DataType::of::<u32>()),
            PortDescriptor::input("B", "", DataType::of::<u32>()),
        ]
    }

    #[test]
    fn test_context_maps_inputs_in_order() {
        let stop = AtomicBool::new(false);
        let ports = ports();
        let ctx = ProcessContext::for_ports(
            &ports,
            vec![Some(AlgorithmData::new(1u32)), None],
            &stop,
        );
        assert_eq!(*ctx.input::<u32>("A").unwrap(), 1);
        let err = ctx.input::<u32>("B").unwrap_err();
        assert_eq!(err.kind, ProcessingErrorKind::MissingInput);
    }

    #[test]
    fn test_context_wrong_type_is_invalid_data() {
        let stop = AtomicBool::new(false);
        let ports = ports();
        let ctx = ProcessContext::for_ports(&ports, vec![Some(AlgorithmData::new("x"))], &stop);
        let err = ctx.input::<u32>("A").unwrap_err();
        assert_eq!(err.kind, ProcessingErrorKind::InvalidData);
    }

    #[test]
    fn test_context_outputs() {
        let stop = AtomicBool::new(false);
        let ports = ports();
        let mut ctx = ProcessContext::for_ports(&ports, vec![], &stop);
        ctx.set_output("Sum", AlgorithmData::new(3u32)).unwrap();
        assert!(ctx.set_output("Nope", AlgorithmData::new(3u32)).is_err());
        let outputs = ctx.into_outputs();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].as_ref().unwrap().is::<u32>());
    }

    #[test]
    fn test_check_stop() {
        let stop = AtomicBool::new(false);
        let ctx = ProcessContext::new(vec![], vec![], &stop);
        assert!(ctx.check_stop().is_ok());
        stop.store(true, Ordering::Relaxed);
        assert_eq!(
            ctx.check_stop().unwrap_err().kind,
            ProcessingErrorKind::Cancelled
        );
    }

    #[test]
    fn test_park_respects_newer_input() {
        let state = SlotState::new();
        let generation = state.generation();
        state.park(generation);
        assert!(state.is_parked());

        // Input arrived between the failure and the park.
        let generation = state.generation();
        state.invalidate();
        state.park(generation);
        assert!(!state.is_parked());
        assert!(state.is_dirty());
    }

    #[test]
    fn test_trigger_invalidates_and_wakes() {
        let state = Arc::new(SlotState::new());
        state.dirty.store(false, Ordering::SeqCst);
        state.parked.store(true, Ordering::SeqCst);
        let (tx, rx) = crossbeam_channel::bounded(1);
        let trigger = DirtyTrigger::new(state.clone(), tx);
        trigger.fire();
        trigger.fire();
        assert!(state.is_dirty());
        assert!(!state.is_parked());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
