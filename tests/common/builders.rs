//! Test algorithm builders
//!
//! [`StageBuilder`] assembles a small algorithm over `u64` payloads: named
//! inputs, one output "out", and a compute closure. Each stage counts its
//! `process()` calls.

use dirvis_rs::network::{
    shared, Algorithm, AlgorithmData, DataType, PortDescriptor, ProcessContext, ProcessingError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const OUT: &str = "out";

pub type Compute = Box<dyn FnMut(&[Option<u64>]) -> Result<Option<u64>, ProcessingError> + Send>;

pub struct Stage {
    name: String,
    ports: Vec<PortDescriptor>,
    inputs: Vec<&'static str>,
    compute: Compute,
    runs: Arc<AtomicUsize>,
}

impl Algorithm for Stage {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let mut values = Vec::with_capacity(self.inputs.len());
        for name in &self.inputs {
            values.push(ctx.input_opt::<u64>(name)?.map(|v| *v));
        }
        if let Some(result) = (self.compute)(&values)? {
            ctx.set_output(OUT, AlgorithmData::new(result))?;
        }
        Ok(())
    }
}

/// Run counter of a built stage
#[derive(Clone)]
pub struct Runs(Arc<AtomicUsize>);

impl Runs {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct StageBuilder {
    name: String,
    inputs: Vec<&'static str>,
    compute: Option<Compute>,
}

impl StageBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            compute: None,
        }
    }

    pub fn input(mut self, name: &'static str) -> Self {
        self.inputs.push(name);
        self
    }

    pub fn compute<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[Option<u64>]) -> Result<Option<u64>, ProcessingError> + Send + 'static,
    {
        self.compute = Some(Box::new(f));
        self
    }

    /// Emit `value` regardless of inputs
    pub fn constant(self, value: u64) -> Self {
        self.compute(move |_| Ok(Some(value)))
    }

    /// Fail whenever the first input is odd, otherwise pass it on
    pub fn fail_on_odd(self) -> Self {
        self.compute(|values| match values.first().copied().flatten() {
            Some(v) if v % 2 == 1 => Err(ProcessingError::invalid_data(format!("{} is odd", v))),
            other => Ok(other),
        })
    }

    /// Default compute: sum of the present inputs, nothing if none are present
    pub fn build(self) -> (Arc<Mutex<Stage>>, Runs) {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut ports: Vec<PortDescriptor> = self
            .inputs
            .iter()
            .map(|&name| PortDescriptor::input(name, "", DataType::of::<u64>()))
            .collect();
        ports.push(PortDescriptor::output(OUT, "", DataType::of::<u64>()));

        let compute: Compute = match self.compute {
            Some(compute) => compute,
            None => Box::new(
                |values: &[Option<u64>]| -> Result<Option<u64>, ProcessingError> {
                    let present: Vec<u64> = values.iter().flatten().copied().collect();
                    Ok((!present.is_empty()).then(|| present.iter().sum()))
                },
            ),
        };

        let stage = Stage {
            name: self.name,
            ports,
            inputs: self.inputs,
            compute,
            runs: Arc::clone(&runs),
        };
        (shared(stage), Runs(runs))
    }
}
