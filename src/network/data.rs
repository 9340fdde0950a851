//! Type-erased payloads carried by ports.
//!
//! `AlgorithmData` is a cheaply clonable `Arc` around any `Send + Sync`
//! value. Propagation shares the `Arc`; it never deep-copies a dataset.
//! `DataType` is the type tag declared on ports and checked when ports are
//! connected and again when data is assigned.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type tag of a port or payload.
#[derive(Clone, Copy)]
pub enum DataType {
    /// Dynamically typed. Compatible with every other tag; the payload is
    /// checked when it reaches a typed input.
    Any,
    Typed { id: TypeId, name: &'static str },
}

impl DataType {
    pub fn of<T: Any + Send + Sync>() -> Self {
        DataType::Typed {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Any => "any",
            DataType::Typed { name, .. } => name,
        }
    }

    /// Whether an output tagged `self` may be connected to an input tagged `input`.
    pub fn is_compatible_with(&self, input: &DataType) -> bool {
        match (self, input) {
            (DataType::Any, _) | (_, DataType::Any) => true,
            (DataType::Typed { id: a, .. }, DataType::Typed { id: b, .. }) => a == b,
        }
    }

    /// Whether a concrete payload satisfies this tag.
    pub fn accepts(&self, data: &AlgorithmData) -> bool {
        match self {
            DataType::Any => true,
            DataType::Typed { id, .. } => data.type_id == *id,
        }
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataType::Any, DataType::Any) => true,
            (DataType::Typed { id: a, .. }, DataType::Typed { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for DataType {}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataType({})", self.name())
    }
}

/// Strip the module path: `dirvis_rs::types::TriangleDataSet` -> `TriangleDataSet`.
fn short_type_name(full: &'static str) -> &'static str {
    if full.contains('<') {
        return full;
    }
    match full.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Shared, type-erased payload.
#[derive(Clone)]
pub struct AlgorithmData {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl AlgorithmData {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_id: TypeId::of::<T>(),
            type_name: short_type_name(std::any::type_name::<T>()),
        }
    }

    /// Concrete tag of the carried value.
    pub fn data_type(&self) -> DataType {
        DataType::Typed {
            id: self.type_id,
            name: self.type_name,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Shared handle to the value if it is a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Identity comparison. Two payloads are the same when they share the allocation.
    pub fn ptr_eq(&self, other: &AlgorithmData) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for AlgorithmData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AlgorithmData({})", self.type_name)
    }
}
