//! Ports: typed, named data slots on an algorithm.
//!
//! Algorithms declare their ports once, at construction, as
//! `PortDescriptor`s. The network turns each descriptor into a `Port` that
//! holds the current payload and a changed flag used by propagation.

use crate::network::data::{AlgorithmData, DataType};
use crate::network::error::NetworkError;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
    }
}

/// Static description of a port.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub direction: PortDirection,
    pub data_type: DataType,
}

impl PortDescriptor {
    pub fn input(name: &'static str, description: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            description,
            direction: PortDirection::Input,
            data_type,
        }
    }

    pub fn output(name: &'static str, description: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            description,
            direction: PortDirection::Output,
            data_type,
        }
    }
}

/// A live port owned by the network on behalf of one algorithm.
#[derive(Debug, Clone)]
pub struct Port {
    descriptor: PortDescriptor,
    data: Option<AlgorithmData>,
    changed: bool,
}

impl Port {
    pub fn new(descriptor: PortDescriptor) -> Self {
        Self {
            descriptor,
            data: None,
            changed: false,
        }
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn data_type(&self) -> DataType {
        self.descriptor.data_type
    }

    pub fn data(&self) -> Option<&AlgorithmData> {
        self.data.as_ref()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Store a payload. The changed flag is raised only when the payload is
    /// a different allocation than the current one.
    ///
    /// Returns whether the port changed.
    pub fn set_data(&mut self, data: AlgorithmData) -> Result<bool, NetworkError> {
        if !self.descriptor.data_type.accepts(&data) {
            return Err(NetworkError::TypeMismatch {
                output: data.type_name().to_string(),
                produced: data.type_name(),
                input: self.descriptor.name.to_string(),
                accepted: self.descriptor.data_type.name(),
            });
        }

        let same = self.data.as_ref().is_some_and(|current| current.ptr_eq(&data));
        if !same {
            self.data = Some(data);
            self.changed = true;
        }
        Ok(!same)
    }

    /// Drop the payload. Returns whether the port held data.
    pub fn clear(&mut self) -> bool {
        let had_data = self.data.take().is_some();
        if had_data {
            self.changed = true;
        }
        had_data
    }

    /// Called once every connection leaving this port has consumed the payload.
    pub fn mark_consumed(&mut self) {
        self.changed = false;
    }
}
