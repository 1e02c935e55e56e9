//! The compute graph: owner of the context, the value store, and the node
//! lists.
//!
//! As opposed to eager execution where commands are encoded every
//! inference, the ops composing a model are parsed once and a command
//! buffer is encoded from them; inference then replays the cached buffer.
//! The graph iterates its nodes in declaration order and calls `encode` on
//! each; ordering plus the barriers recorded at bind time are the only
//! synchronization between nodes.

use crate::api::context::{Context, SubmitIndex};
use crate::api::types::DType;
use crate::config::GraphConfig;
use crate::error::{ForgeResult, VkForgeError};
use crate::graph::ops::{ExecuteNode, PrepackNode};
use crate::graph::tensor::{GpuTensor, TensorData};
use crate::graph::value::{IOValueRef, TypeTag, Value, ValueRef};

/// Core data structure for executing a model in graph mode.
pub struct ComputeGraph {
    context: Context,
    values: Vec<Value>,
    prepack_nodes: Vec<PrepackNode>,
    execute_nodes: Vec<ExecuteNode>,
    inputs: Vec<IOValueRef>,
    outputs: Vec<IOValueRef>,
}

impl ComputeGraph {
    pub fn new(config: GraphConfig) -> Self {
        tracing::debug!("creating compute graph");
        Self {
            context: Context::new(config.context),
            values: Vec::new(),
            prepack_nodes: Vec::new(),
            execute_nodes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn inputs(&self) -> &[IOValueRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[IOValueRef] {
        &self.outputs
    }

    // ========== Value store ==========

    /// Returns the value at a particular reference.
    pub fn get_val(&self, vref: ValueRef) -> ForgeResult<&Value> {
        self.values
            .get(vref.0)
            .ok_or(VkForgeError::ValueOutOfRange {
                index: vref.0,
                len: self.values.len(),
            })
    }

    pub fn resolve_tensor(&self, vref: ValueRef) -> ForgeResult<&GpuTensor> {
        self.get_val(vref)?
            .try_tensor()
            .map_err(|actual| VkForgeError::ValueTypeMismatch {
                index: vref.0,
                expected: TypeTag::Tensor,
                actual,
            })
    }

    pub fn resolve_tensor_data(&self, vref: ValueRef) -> ForgeResult<&TensorData> {
        self.get_val(vref)?
            .try_tensor_data()
            .map_err(|actual| VkForgeError::ValueTypeMismatch {
                index: vref.0,
                expected: TypeTag::TensorData,
                actual,
            })
    }

    pub fn resolve_staging(&self, vref: ValueRef) -> ForgeResult<&crate::api::StagingBuffer> {
        self.get_val(vref)?
            .try_staging()
            .map_err(|actual| VkForgeError::ValueTypeMismatch {
                index: vref.0,
                expected: TypeTag::Staging,
                actual,
            })
    }

    /// Sizes of a tensor or tensor-data value.
    pub fn val_sizes(&self, vref: ValueRef) -> ForgeResult<&[i64]> {
        match self.get_val(vref)? {
            Value::Tensor(t) => Ok(t.sizes()),
            Value::TensorData(t) => Ok(t.sizes()),
            other => Err(VkForgeError::ValueTypeMismatch {
                index: vref.0,
                expected: TypeTag::Tensor,
                actual: other.type_tag(),
            }),
        }
    }

    /// Dtype of a tensor or tensor-data value.
    pub fn val_dtype(&self, vref: ValueRef) -> ForgeResult<DType> {
        match self.get_val(vref)? {
            Value::Tensor(t) => Ok(t.dtype()),
            Value::TensorData(t) => Ok(t.dtype()),
            other => Err(VkForgeError::ValueTypeMismatch {
                index: vref.0,
                expected: TypeTag::Tensor,
                actual: other.type_tag(),
            }),
        }
    }

    // ========== Graph building ==========

    /// Allocate a persistent GPU tensor and store it.
    pub fn add_tensor(&mut self, sizes: Vec<i64>, dtype: DType) -> ForgeResult<ValueRef> {
        let element_count: usize = sizes.iter().map(|&d| d as usize).product();
        let nbytes = element_count * dtype.element_size();
        let buffer = self.context.allocate_buffer(nbytes)?;
        Ok(self.push_value(Value::Tensor(GpuTensor::new(sizes, dtype, buffer))))
    }

    /// Store CPU-resident tensor data for later prepacking.
    pub fn add_tensorref(&mut self, sizes: Vec<i64>, dtype: DType, data: Vec<u8>) -> ValueRef {
        self.push_value(Value::TensorData(TensorData::new(sizes, dtype, data)))
    }

    /// Allocate a staging buffer sized for `numel` elements of `dtype`.
    pub fn add_staging(&mut self, dtype: DType, numel: usize) -> ForgeResult<ValueRef> {
        let staging = self.context.allocate_staging(numel * dtype.element_size())?;
        Ok(self.push_value(Value::Staging(staging)))
    }

    pub fn add_scalar_int(&mut self, v: i64) -> ValueRef {
        self.push_value(Value::Int(v))
    }

    pub fn add_scalar_double(&mut self, v: f64) -> ValueRef {
        self.push_value(Value::Double(v))
    }

    pub fn add_scalar_bool(&mut self, v: bool) -> ValueRef {
        self.push_value(Value::Bool(v))
    }

    fn push_value(&mut self, value: Value) -> ValueRef {
        let vref = ValueRef(self.values.len());
        self.values.push(value);
        vref
    }

    /// Pair a tensor with a fresh staging buffer and register it as a graph
    /// input. Returns the staging reference.
    pub fn set_input_tensor(&mut self, idx: ValueRef) -> ForgeResult<ValueRef> {
        let tensor = self.resolve_tensor(idx)?;
        let (dtype, numel) = (tensor.dtype(), tensor.element_count());
        let staging = self.add_staging(dtype, numel)?;
        self.inputs.push(IOValueRef {
            value: idx,
            staging,
        });
        Ok(staging)
    }

    /// Pair a tensor with a fresh staging buffer and register it as a graph
    /// output. Returns the staging reference.
    pub fn set_output_tensor(&mut self, idx: ValueRef) -> ForgeResult<ValueRef> {
        let tensor = self.resolve_tensor(idx)?;
        let (dtype, numel) = (tensor.dtype(), tensor.element_count());
        let staging = self.add_staging(dtype, numel)?;
        self.outputs.push(IOValueRef {
            value: idx,
            staging,
        });
        Ok(staging)
    }

    /// Convenience: add an input tensor along with its staging buffer.
    pub fn add_input_tensor(&mut self, sizes: Vec<i64>, dtype: DType) -> ForgeResult<IOValueRef> {
        let value = self.add_tensor(sizes, dtype)?;
        let staging = self.set_input_tensor(value)?;
        Ok(IOValueRef { value, staging })
    }

    pub fn add_prepack_node(&mut self, node: PrepackNode) {
        self.prepack_nodes.push(node);
    }

    pub fn add_execute_node(&mut self, node: ExecuteNode) {
        self.execute_nodes.push(node);
    }

    pub fn prepack_node_count(&self) -> usize {
        self.prepack_nodes.len()
    }

    pub fn execute_node_count(&self) -> usize {
        self.execute_nodes.len()
    }

    // ========== Input/Output ==========

    /// Copy host data into a staging value.
    pub fn copy_into_staging(&self, idx: ValueRef, data: &[u8]) -> ForgeResult<()> {
        self.resolve_staging(idx)?.copy_from_host(data)
    }

    /// Copy a staging value's contents out to host memory.
    pub fn copy_from_staging(&self, idx: ValueRef, data: &mut [u8]) -> ForgeResult<()> {
        self.resolve_staging(idx)?.copy_to_host(data)
    }

    // ========== Graph prepacking ==========

    /// Encode every prepack node, in declaration order, into the command
    /// buffer. Any failure aborts the pass.
    pub fn encode_prepack(&mut self) -> ForgeResult<()> {
        tracing::debug!(nodes = self.prepack_nodes.len(), "encoding prepack pass");
        let nodes = std::mem::take(&mut self.prepack_nodes);
        let result = nodes.iter().try_for_each(|node| node.encode(self));
        self.prepack_nodes = nodes;
        result
    }

    /// Submit the recorded prepack commands and wait for completion.
    pub fn prepack(&self) -> ForgeResult<()> {
        let index = self.context.submit()?;
        self.context.wait_for(index)
    }

    // ========== Graph execution ==========

    /// Encode every execute node, in declaration order, into the command
    /// buffer. Any failure aborts the pass.
    pub fn encode_execute(&mut self) -> ForgeResult<()> {
        tracing::debug!(nodes = self.execute_nodes.len(), "encoding execute pass");
        let nodes = std::mem::take(&mut self.execute_nodes);
        let result = nodes.iter().try_for_each(|node| node.encode(self));
        self.execute_nodes = nodes;
        result
    }

    /// Submit the recorded execute commands.
    pub fn execute(&self) -> ForgeResult<SubmitIndex> {
        self.context.submit()
    }
}

impl std::fmt::Debug for ComputeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeGraph")
            .field("values", &self.values.len())
            .field("prepack_nodes", &self.prepack_nodes.len())
            .field("execute_nodes", &self.execute_nodes.len())
            .finish()
    }
}
