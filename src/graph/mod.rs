//! Compute graph: value store, tensor resources, and encoding nodes.

pub mod compute_graph;
pub mod ops;
pub mod tensor;
pub mod value;

pub use compute_graph::ComputeGraph;
pub use ops::{ArgGroup, ExecuteNode, PrepackNode};
pub use tensor::{GpuTensor, TensorData};
pub use value::{IOValueRef, TypeTag, Value, ValueRef};
