//! vkforge - Vulkan-style compute graph encoding runtime
//!
//! A node-based encoding model for GPU inference graphs: ops are parsed
//! once into execute and prepack nodes, and a command buffer is encoded
//! from them with correct resource binding and barrier insertion. The
//! encoded buffer is replayed per inference instead of re-encoding.

#![allow(clippy::too_many_arguments)] // Node constructors mirror shader signatures

pub mod api;
pub mod config;
pub mod error;
pub mod graph;

pub use api::{
    Context, ContextStats, DType, DescriptorSet, MemoryAccess, ParamsBuffer, PipelineBarrier,
    ShaderInfo, StagingBuffer, SubmitIndex, WorkgroupSize,
};
pub use config::{ContextConfig, GraphConfig};
pub use error::{ErrorCategory, ForgeResult, VkForgeError};
pub use graph::{ArgGroup, ComputeGraph, ExecuteNode, IOValueRef, PrepackNode, Value, ValueRef};
