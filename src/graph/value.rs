//! Tagged values held by the compute graph's value store.
//!
//! A tagged union over the resource kinds the graph tracks, in the spirit
//! of an IValue: the node holds only `ValueRef` indices and resolves them
//! against the store at encode time.

use std::fmt;

use crate::api::buffer::StagingBuffer;
use crate::graph::tensor::{GpuTensor, TensorData};

/// Opaque, stable index into a graph's value store.
///
/// Never an owning handle; the store outlives every node referencing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRef(pub usize);

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Discriminant of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    None,
    Tensor,
    TensorData,
    Staging,
    Int,
    Double,
    Bool,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::None => "NONE",
            TypeTag::Tensor => "TENSOR",
            TypeTag::TensorData => "TENSORDATA",
            TypeTag::Staging => "STAGING",
            TypeTag::Int => "INT",
            TypeTag::Double => "DOUBLE",
            TypeTag::Bool => "BOOL",
        };
        write!(f, "{}", name)
    }
}

/// One entry in the value store.
#[derive(Debug)]
pub enum Value {
    None,
    Tensor(GpuTensor),
    TensorData(TensorData),
    Staging(StagingBuffer),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::None => TypeTag::None,
            Value::Tensor(_) => TypeTag::Tensor,
            Value::TensorData(_) => TypeTag::TensorData,
            Value::Staging(_) => TypeTag::Staging,
            Value::Int(_) => TypeTag::Int,
            Value::Double(_) => TypeTag::Double,
            Value::Bool(_) => TypeTag::Bool,
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Value::Tensor(_))
    }

    pub fn is_tensor_data(&self) -> bool {
        matches!(self, Value::TensorData(_))
    }

    pub fn is_staging(&self) -> bool {
        matches!(self, Value::Staging(_))
    }

    /// `Err` carries the actual tag for resolution-error reporting.
    pub fn try_tensor(&self) -> Result<&GpuTensor, TypeTag> {
        match self {
            Value::Tensor(t) => Ok(t),
            other => Err(other.type_tag()),
        }
    }

    pub fn try_tensor_data(&self) -> Result<&TensorData, TypeTag> {
        match self {
            Value::TensorData(t) => Ok(t),
            other => Err(other.type_tag()),
        }
    }

    pub fn try_staging(&self) -> Result<&StagingBuffer, TypeTag> {
        match self {
            Value::Staging(s) => Ok(s),
            other => Err(other.type_tag()),
        }
    }
}

/// A graph input or output: the tensor plus the staging buffer that feeds
/// or drains it.
#[derive(Debug, Clone, Copy)]
pub struct IOValueRef {
    pub value: ValueRef,
    pub staging: ValueRef,
}
