//! Tensor-shaped resources held in the value store.

use std::sync::Arc;

use crate::api::buffer::DeviceBuffer;
use crate::api::types::DType;

/// Persistent GPU tensor: shape metadata plus its device allocation.
///
/// The backing buffer is owned by the context; the tensor carries only the
/// handle. `gpu_nbytes` is the allocated footprint, which is the capacity a
/// prepack destination offers.
#[derive(Debug)]
pub struct GpuTensor {
    sizes: Vec<i64>,
    dtype: DType,
    buffer: DeviceBuffer,
}

impl GpuTensor {
    pub(crate) fn new(sizes: Vec<i64>, dtype: DType, buffer: DeviceBuffer) -> Self {
        Self {
            sizes,
            dtype,
            buffer,
        }
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn buffer(&self) -> &DeviceBuffer {
        &self.buffer
    }

    pub fn element_count(&self) -> usize {
        self.sizes.iter().map(|&d| d as usize).product()
    }

    pub fn gpu_nbytes(&self) -> usize {
        self.buffer.nbytes()
    }
}

/// CPU-resident tensor data waiting to be prepacked: raw bytes plus shape
/// and dtype metadata.
///
/// Holds the payload behind an `Arc` so many nodes can reference the same
/// source without copying; the value store governs its lifetime.
#[derive(Debug, Clone)]
pub struct TensorData {
    sizes: Vec<i64>,
    dtype: DType,
    data: Arc<[u8]>,
}

impl TensorData {
    pub fn new(sizes: Vec<i64>, dtype: DType, data: Vec<u8>) -> Self {
        Self {
            sizes,
            dtype,
            data: data.into(),
        }
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn element_count(&self) -> usize {
        self.sizes.iter().map(|&d| d as usize).product()
    }

    /// Byte footprint computed from the metadata: element count times the
    /// element width of the dtype.
    pub fn nbytes(&self) -> usize {
        self.element_count() * self.dtype.element_size()
    }
}
