//! Helpers that attach resolved values to descriptor slots, recording
//! barrier transitions as a side effect.

use crate::api::barrier::PipelineBarrier;
use crate::api::buffer::StagingBuffer;
use crate::api::descriptor::{BoundResource, DescriptorSet};
use crate::api::types::MemoryAccess;
use crate::error::{ForgeResult, VkForgeError};
use crate::graph::compute_graph::ComputeGraph;
use crate::graph::value::{Value, ValueRef};

/// Resolve `vref` and bind it to `slot` with the given access.
///
/// Tensor and staging values are bindable; anything else is a resolution
/// error. A write-capable access records a barrier transition so prior
/// contents become visible to the dispatch.
pub(crate) fn bind_value_to_descriptor_set(
    graph: &ComputeGraph,
    vref: ValueRef,
    pipeline_barrier: &mut PipelineBarrier,
    access: MemoryAccess,
    descriptor_set: &mut DescriptorSet,
    slot: usize,
) -> ForgeResult<()> {
    match graph.get_val(vref)? {
        Value::Tensor(tensor) => {
            if access.includes_write() {
                pipeline_barrier.record(tensor.buffer().id(), access);
            }
            descriptor_set.bind(slot, BoundResource::Tensor(*tensor.buffer()), access)
        }
        Value::Staging(staging) => {
            if access.includes_write() {
                pipeline_barrier.record(staging.id(), access);
            }
            descriptor_set.bind(slot, BoundResource::Staging(staging.clone()), access)
        }
        other => Err(VkForgeError::ValueNotBindable {
            index: vref.0,
            actual: other.type_tag(),
        }),
    }
}

/// Bind a staging buffer the encoding scope allocated itself (not one from
/// the value store). Staging sources are read-only, so no barrier.
pub(crate) fn bind_staging_to_descriptor_set(
    staging: &StagingBuffer,
    descriptor_set: &mut DescriptorSet,
    slot: usize,
) -> ForgeResult<()> {
    descriptor_set.bind(
        slot,
        BoundResource::Staging(staging.clone()),
        MemoryAccess::Read,
    )
}
