//! Device-level API: the types and context a node encodes against.
//!
//! Modeled on a Vulkan compute device surface: descriptor sets allocated
//! from a cached pool, pipeline barriers recorded at bind time, staging
//! buffers for host-to-device transfer, and a context that serializes
//! dispatch encoding.

pub mod barrier;
pub mod buffer;
pub mod command;
pub mod context;
pub mod descriptor;
pub mod types;

pub use barrier::{BufferTransition, PipelineBarrier};
pub use buffer::{BufferId, DeviceBuffer, ParamsBuffer, StagingBuffer};
pub use command::{Command, CommandBuffer};
pub use context::{Context, ContextStats, DispatchGuard, SubmitIndex};
pub use descriptor::{BoundResource, DescriptorBinding, DescriptorSet};
pub use types::{DType, MemoryAccess, ShaderInfo, WorkgroupSize};
