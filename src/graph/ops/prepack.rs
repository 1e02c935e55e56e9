//! Prepack nodes: one-time upload of CPU-resident data into a packed GPU
//! tensor.

use crate::api::barrier::PipelineBarrier;
use crate::api::buffer::ParamsBuffer;
use crate::api::descriptor::BoundResource;
use crate::api::types::{MemoryAccess, ShaderInfo, WorkgroupSize};
use crate::error::{ForgeResult, VkForgeError};
use crate::graph::compute_graph::ComputeGraph;
use crate::graph::ops::binding::bind_staging_to_descriptor_set;
use crate::graph::value::ValueRef;

/// A single prepacking op: stages a CPU-resident source into a transient
/// buffer and dispatches a shader that writes the packed result into a
/// persistent GPU tensor.
///
/// Structurally parallel to an execute node, but the binding shape is fixed
/// at three slots (destination tensor, staging buffer, params) because
/// prepacking is always the same upload-then-convert pattern. Intended to
/// encode once at setup time; nothing prevents re-invocation. The parameter
/// buffer is fixed at construction and cannot be recomputed.
#[derive(Debug)]
pub struct PrepackNode {
    shader: ShaderInfo,
    global_workgroup_size: WorkgroupSize,
    local_workgroup_size: WorkgroupSize,
    source_ref: ValueRef,
    dest_ref: ValueRef,
    params: ParamsBuffer,
}

impl PrepackNode {
    pub fn new(
        shader: ShaderInfo,
        global_workgroup_size: WorkgroupSize,
        local_workgroup_size: WorkgroupSize,
        source_ref: ValueRef,
        dest_ref: ValueRef,
        params: ParamsBuffer,
    ) -> Self {
        Self {
            shader,
            global_workgroup_size,
            local_workgroup_size,
            source_ref,
            dest_ref,
            params,
        }
    }

    pub fn shader(&self) -> &ShaderInfo {
        &self.shader
    }

    pub fn source_ref(&self) -> ValueRef {
        self.source_ref
    }

    pub fn dest_ref(&self) -> ValueRef {
        self.dest_ref
    }

    /// Stage the source bytes and record the packing dispatch.
    ///
    /// The source byte count (element count times element width, computed
    /// from the source metadata) must equal the destination's allocated
    /// footprint; a mismatch fails before any staging write or dispatch
    /// registration. The staging buffer lives in this scope; the clone held
    /// by the recorded dispatch keeps its memory alive until the submission
    /// completes.
    pub fn encode(&self, graph: &ComputeGraph) -> ForgeResult<()> {
        let context = graph.context();
        tracing::trace!(shader = self.shader.name(), "encoding prepack node");

        let mut pipeline_barrier = PipelineBarrier::new();

        let tref = graph.resolve_tensor_data(self.source_ref)?;
        let packed = graph.resolve_tensor(self.dest_ref)?;

        let nbytes = tref.nbytes();
        if nbytes != packed.gpu_nbytes() {
            return Err(VkForgeError::StagingSizeMismatch {
                src_nbytes: nbytes,
                dst_nbytes: packed.gpu_nbytes(),
            });
        }
        if tref.data().len() < nbytes {
            return Err(VkForgeError::CopyBoundsExceeded {
                requested: nbytes,
                capacity: tref.data().len(),
            });
        }

        let staging = context.allocate_staging(packed.gpu_nbytes())?;
        staging.copy_from_host(&tref.data()[..nbytes])?;

        let _cmd_lock = context.dispatch_lock()?;

        let mut descriptor_set =
            context.get_descriptor_set(&self.shader, self.local_workgroup_size)?;

        let mut idx = 0;
        pipeline_barrier.record(packed.buffer().id(), MemoryAccess::Write);
        descriptor_set.bind(
            idx,
            BoundResource::Tensor(*packed.buffer()),
            MemoryAccess::Write,
        )?;
        idx += 1;
        bind_staging_to_descriptor_set(&staging, &mut descriptor_set, idx)?;
        idx += 1;
        descriptor_set.bind_params(idx, self.params.clone())?;

        context.register_shader_dispatch(
            descriptor_set,
            pipeline_barrier,
            &self.shader,
            self.global_workgroup_size,
        )
    }
}
