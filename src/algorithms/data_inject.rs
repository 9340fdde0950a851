//! Entry point for data produced outside the network (file loaders, demos).

use crate::network::{
    Algorithm, AlgorithmData, DataType, DirtyTrigger, NetworkError, PortDescriptor,
    ProcessContext, ProcessingError,
};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

pub const OUTPUT: &str = "Data";

#[derive(Default)]
struct InjectionPoint {
    payload: Option<AlgorithmData>,
    trigger: Option<DirtyTrigger>,
}

fn lock(point: &Mutex<InjectionPoint>) -> MutexGuard<'_, InjectionPoint> {
    point.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Source algorithm that republishes whatever was last injected.
///
/// It does not load or transform anything. Loader threads hold an
/// [`Injector`] and push datasets through it; the network picks them up on
/// its next cycle.
pub struct DataInject {
    ports: Vec<PortDescriptor>,
    point: Arc<Mutex<InjectionPoint>>,
}

impl DataInject {
    /// Injection point accepting any payload.
    pub fn new() -> Self {
        Self::with_type(DataType::Any)
    }

    /// Injection point whose output is typed as `T`.
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self::with_type(DataType::of::<T>())
    }

    fn with_type(data_type: DataType) -> Self {
        Self {
            ports: vec![PortDescriptor::output(
                OUTPUT,
                "The data that has been injected.",
                data_type,
            )],
            point: Arc::new(Mutex::new(InjectionPoint::default())),
        }
    }

    /// A handle for pushing data in from any thread.
    pub fn injector(&self) -> Injector {
        Injector {
            point: Arc::clone(&self.point),
            data_type: self.ports[0].data_type,
        }
    }
}

impl Default for DataInject {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for DataInject {
    fn name(&self) -> &str {
        "Data Inject"
    }

    fn description(&self) -> &str {
        "Injects data into the processing network. It does not process or load anything."
    }

    fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
        let payload = lock(&self.point).payload.clone();
        match payload {
            Some(data) => ctx.set_output(OUTPUT, data),
            None => Ok(()),
        }
    }

    fn attach(&mut self, trigger: DirtyTrigger) {
        lock(&self.point).trigger = Some(trigger);
    }
}

/// Cloneable handle to a [`DataInject`]'s payload slot.
#[derive(Clone)]
pub struct Injector {
    point: Arc<Mutex<InjectionPoint>>,
    data_type: DataType,
}

impl Injector {
    /// Replace the injected payload and schedule the injection point.
    ///
    /// Before the algorithm is registered the payload is only stored; it
    /// goes out on the first cycle after registration.
    pub fn inject(&self, data: AlgorithmData) -> Result<(), NetworkError> {
        if !self.data_type.accepts(&data) {
            return Err(NetworkError::TypeMismatch {
                output: data.type_name().to_string(),
                produced: data.type_name(),
                input: OUTPUT.to_string(),
                accepted: self.data_type.name(),
            });
        }

        let trigger = {
            let mut point = lock(&self.point);
            point.payload = Some(data);
            point.trigger.clone()
        };
        if let Some(trigger) = trigger {
            trigger.fire();
        }
        Ok(())
    }

    pub fn inject_value<T: Any + Send + Sync>(&self, value: T) -> Result<(), NetworkError> {
        self.inject(AlgorithmData::new(value))
    }

    pub fn has_payload(&self) -> bool {
        lock(&self.point).payload.is_some()
    }
}
