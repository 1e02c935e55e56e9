//! Buffer handles: device allocations, transient staging memory, and
//! parameter buffers.
//!
//! The context owns all device memory; the handles here never free anything
//! except staging memory, whose bytes return to the context's staging budget
//! when the last handle drops.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ForgeResult, VkForgeError};

/// Stable identity of a context-owned allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Handle to a persistent device allocation.
///
/// Plain handle, no ownership: the context that issued it owns the memory
/// and outlives every handle. Cheap to copy into descriptor bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceBuffer {
    id: BufferId,
    nbytes: usize,
}

impl DeviceBuffer {
    pub(crate) fn new(id: BufferId, nbytes: usize) -> Self {
        Self { id, nbytes }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn nbytes(&self) -> usize {
        self.nbytes
    }
}

/// Host-visible staging memory plus the budget it was drawn from.
#[derive(Debug)]
pub(crate) struct StagingMemory {
    id: BufferId,
    nbytes: usize,
    bytes: Mutex<Vec<u8>>,
    /// Live staging bytes counter shared with the owning context.
    in_use: Arc<AtomicUsize>,
}

impl Drop for StagingMemory {
    fn drop(&mut self) {
        self.in_use.fetch_sub(self.nbytes, Ordering::Relaxed);
        tracing::trace!(id = self.id.0, nbytes = self.nbytes, "staging released");
    }
}

/// Transient, host-writable buffer used to move CPU-resident data into
/// device-visible memory.
///
/// Cloning is cheap and shares the underlying memory: a clone held by a
/// recorded command keeps the memory alive after the encoding scope drops
/// its handle. The bytes return to the staging budget when the last clone
/// drops.
#[derive(Debug, Clone)]
pub struct StagingBuffer {
    memory: Arc<StagingMemory>,
}

impl StagingBuffer {
    pub(crate) fn new(id: BufferId, nbytes: usize, in_use: Arc<AtomicUsize>) -> Self {
        Self {
            memory: Arc::new(StagingMemory {
                id,
                nbytes,
                bytes: Mutex::new(vec![0u8; nbytes]),
                in_use,
            }),
        }
    }

    pub fn id(&self) -> BufferId {
        self.memory.id
    }

    pub fn nbytes(&self) -> usize {
        self.memory.nbytes
    }

    /// Synchronous host-to-device-visible copy. `src` must fit.
    pub fn copy_from_host(&self, src: &[u8]) -> ForgeResult<()> {
        if src.len() > self.memory.nbytes {
            return Err(VkForgeError::CopyBoundsExceeded {
                requested: src.len(),
                capacity: self.memory.nbytes,
            });
        }
        let mut bytes = self.memory.bytes.lock()?;
        bytes[..src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Copy staging contents back out to host memory. `dst` must fit.
    pub fn copy_to_host(&self, dst: &mut [u8]) -> ForgeResult<()> {
        if dst.len() > self.memory.nbytes {
            return Err(VkForgeError::CopyBoundsExceeded {
                requested: dst.len(),
                capacity: self.memory.nbytes,
            });
        }
        let bytes = self.memory.bytes.lock()?;
        dst.copy_from_slice(&bytes[..dst.len()]);
        Ok(())
    }

    /// Number of live handles to this memory, counting this one.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.memory)
    }
}

/// Opaque buffer of scalar shader parameters, bound after all argument
/// slots.
///
/// Fixed at node construction time: parameter buffers cannot be recomputed
/// once the node exists. Re-encoding with changed parameters is
/// unsupported; downstream code relies on per-node parameter immutability.
#[derive(Debug, Clone)]
pub struct ParamsBuffer {
    bytes: Arc<[u8]>,
}

impl ParamsBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// A zero-length parameter buffer for shaders with no scalar params.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn nbytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
