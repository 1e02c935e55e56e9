//! Execute nodes: one shader dispatch over tensor-like arguments.

use crate::api::barrier::PipelineBarrier;
use crate::api::buffer::ParamsBuffer;
use crate::api::types::{MemoryAccess, ShaderInfo, WorkgroupSize};
use crate::error::ForgeResult;
use crate::graph::compute_graph::ComputeGraph;
use crate::graph::ops::binding::bind_value_to_descriptor_set;
use crate::graph::value::ValueRef;

/// A group of shader arguments sharing one access permission.
///
/// Reference order matters: binding slots are assigned by flattening groups
/// in order. A dispatch needing mixed permissions must split its arguments
/// into separate groups.
#[derive(Debug, Clone)]
pub struct ArgGroup {
    refs: Vec<ValueRef>,
    access: MemoryAccess,
}

impl ArgGroup {
    pub fn new(vref: ValueRef, access: MemoryAccess) -> Self {
        Self {
            refs: vec![vref],
            access,
        }
    }

    pub fn from_refs(refs: Vec<ValueRef>, access: MemoryAccess) -> Self {
        assert!(
            !refs.is_empty(),
            "argument group must contain at least one reference"
        );
        Self { refs, access }
    }

    pub fn refs(&self) -> &[ValueRef] {
        &self.refs
    }

    pub fn access(&self) -> MemoryAccess {
        self.access
    }
}

/// A single execution op in a model: shader identity, dispatch sizing, the
/// argument groups to bind, and a parameter buffer.
///
/// Constructed once during graph build and immutable afterwards; `encode`
/// may run once per inference pass and produces structurally identical
/// bindings every time. The parameter buffer is fixed at construction and
/// cannot be recomputed.
#[derive(Debug)]
pub struct ExecuteNode {
    shader: ShaderInfo,
    global_workgroup_size: WorkgroupSize,
    local_workgroup_size: WorkgroupSize,
    args: Vec<ArgGroup>,
    params: ParamsBuffer,
}

impl ExecuteNode {
    pub fn new(
        shader: ShaderInfo,
        global_workgroup_size: WorkgroupSize,
        local_workgroup_size: WorkgroupSize,
        args: Vec<ArgGroup>,
        params: ParamsBuffer,
    ) -> Self {
        Self {
            shader,
            global_workgroup_size,
            local_workgroup_size,
            args,
            params,
        }
    }

    pub fn shader(&self) -> &ShaderInfo {
        &self.shader
    }

    /// Total argument references across all groups; the descriptor set
    /// needs this many slots plus one for the parameter buffer.
    pub fn arg_count(&self) -> usize {
        self.args.iter().map(|g| g.refs().len()).sum()
    }

    /// Record this node's dispatch into the graph's command buffer.
    ///
    /// Resolves every argument reference, binds them in flattened group
    /// order, binds the parameter buffer last, and registers the dispatch
    /// together with the barrier accumulated during binding. Holds the
    /// context's dispatch lock throughout descriptor-set acquisition and
    /// registration.
    pub fn encode(&self, graph: &ComputeGraph) -> ForgeResult<()> {
        let context = graph.context();
        tracing::trace!(shader = self.shader.name(), "encoding execute node");

        let mut pipeline_barrier = PipelineBarrier::new();

        let _cmd_lock = context.dispatch_lock()?;

        let mut descriptor_set =
            context.get_descriptor_set(&self.shader, self.local_workgroup_size)?;

        let mut idx = 0;
        for group in &self.args {
            for vref in group.refs() {
                bind_value_to_descriptor_set(
                    graph,
                    *vref,
                    &mut pipeline_barrier,
                    group.access(),
                    &mut descriptor_set,
                    idx,
                )?;
                idx += 1;
            }
        }
        descriptor_set.bind_params(idx, self.params.clone())?;

        context.register_shader_dispatch(
            descriptor_set,
            pipeline_barrier,
            &self.shader,
            self.global_workgroup_size,
        )
    }
}
