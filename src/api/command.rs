//! Command buffer: the ordered sequence of commands an encoding pass
//! produces.
//!
//! Encoding appends commands; device-side execution of the recorded buffer
//! is owned by the queue layer, not by nodes.

use crate::api::barrier::PipelineBarrier;
use crate::api::descriptor::DescriptorSet;
use crate::api::types::WorkgroupSize;

/// One recorded command.
#[derive(Debug, Clone)]
pub enum Command {
    /// Access transitions that must complete before the following command.
    PipelineBarrier(PipelineBarrier),
    /// A shader dispatch with its fully bound descriptor set.
    Dispatch {
        shader: String,
        descriptor_set: DescriptorSet,
        global_workgroup_size: WorkgroupSize,
    },
}

/// Append-only command stream for one submission.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drain all recorded commands for submission.
    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}
