//! Descriptor sets and the context's descriptor-set cache.
//!
//! A descriptor set is an ordered collection of resource bindings sized to
//! the shader's declared layout. Sets are handed out by a cache keyed by
//! (shader, local workgroup size); layout reuse across dispatches of the
//! same shader is the cache's concern, never the node's.

use std::collections::HashMap;

use crate::api::buffer::{DeviceBuffer, ParamsBuffer, StagingBuffer};
use crate::api::types::{MemoryAccess, ShaderInfo, WorkgroupSize};
use crate::error::{ForgeResult, VkForgeError};

/// A resource attached to a descriptor slot.
#[derive(Debug, Clone)]
pub enum BoundResource {
    /// Persistent device tensor storage.
    Tensor(DeviceBuffer),
    /// Transient staging memory; the clone keeps it alive until the command
    /// buffer retires.
    Staging(StagingBuffer),
    /// Scalar parameter buffer, always the final slot.
    Params(ParamsBuffer),
}

/// One filled descriptor slot.
#[derive(Debug, Clone)]
pub struct DescriptorBinding {
    pub slot: usize,
    pub resource: BoundResource,
    pub access: MemoryAccess,
}

/// A descriptor set with a fixed slot capacity.
///
/// Slots are filled in flattened argument order; binding past the shader's
/// declared capacity is a contract violation.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    shader: String,
    capacity: usize,
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorSet {
    pub(crate) fn new(shader: impl Into<String>, capacity: usize) -> Self {
        Self {
            shader: shader.into(),
            capacity,
            bindings: Vec::with_capacity(capacity),
        }
    }

    pub fn shader(&self) -> &str {
        &self.shader
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    /// Attach a resource to the given slot.
    pub fn bind(
        &mut self,
        slot: usize,
        resource: BoundResource,
        access: MemoryAccess,
    ) -> ForgeResult<()> {
        if slot >= self.capacity {
            return Err(VkForgeError::DescriptorCapacityExceeded {
                shader: self.shader.clone(),
                capacity: self.capacity,
                slot,
            });
        }
        tracing::trace!(shader = %self.shader, slot, ?access, "descriptor bind");
        self.bindings.push(DescriptorBinding {
            slot,
            resource,
            access,
        });
        Ok(())
    }

    /// Bind the parameter buffer into the final slot.
    pub fn bind_params(&mut self, slot: usize, params: ParamsBuffer) -> ForgeResult<()> {
        self.bind(slot, BoundResource::Params(params), MemoryAccess::Read)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LayoutKey {
    shader: String,
    local_workgroup_size: WorkgroupSize,
}

#[derive(Debug)]
struct CachedLayout {
    binding_count: usize,
    hits: usize,
}

/// Cache of descriptor-set layouts keyed by (shader, local workgroup size).
///
/// Shared mutable context state; callers must hold the context's dispatch
/// lock while allocating from it.
#[derive(Debug)]
pub(crate) struct DescriptorSetCache {
    layouts: HashMap<LayoutKey, CachedLayout>,
    pool_capacity: Option<usize>,
    sets_allocated: usize,
}

impl DescriptorSetCache {
    pub(crate) fn new(pool_capacity: Option<usize>) -> Self {
        Self {
            layouts: HashMap::new(),
            pool_capacity,
            sets_allocated: 0,
        }
    }

    /// Allocate a descriptor set for the given shader and local size.
    pub(crate) fn get(
        &mut self,
        shader: &ShaderInfo,
        local_workgroup_size: WorkgroupSize,
    ) -> ForgeResult<DescriptorSet> {
        if let Some(capacity) = self.pool_capacity {
            if self.sets_allocated >= capacity {
                return Err(VkForgeError::DescriptorPoolExhausted { capacity });
            }
        }

        let key = LayoutKey {
            shader: shader.name().to_string(),
            local_workgroup_size,
        };
        if let Some(layout) = self.layouts.get_mut(&key) {
            layout.hits += 1;
            tracing::trace!(
                shader = shader.name(),
                local = %local_workgroup_size,
                "descriptor layout cache hit"
            );
            let capacity = layout.binding_count;
            self.sets_allocated += 1;
            return Ok(DescriptorSet::new(shader.name(), capacity));
        }

        tracing::debug!(
            shader = shader.name(),
            local = %local_workgroup_size,
            binding_count = shader.binding_count(),
            "descriptor layout cache miss"
        );
        self.layouts.insert(
            key,
            CachedLayout {
                binding_count: shader.binding_count(),
                hits: 0,
            },
        );
        self.sets_allocated += 1;
        Ok(DescriptorSet::new(shader.name(), shader.binding_count()))
    }

    pub(crate) fn sets_allocated(&self) -> usize {
        self.sets_allocated
    }

    pub(crate) fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    pub(crate) fn cache_hits(&self) -> usize {
        self.layouts.values().map(|l| l.hits).sum()
    }
}
