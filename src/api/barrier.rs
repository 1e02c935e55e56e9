//! Pipeline barriers: access transitions recorded at bind time and inserted
//! into the command stream ahead of the dispatch they guard.

use crate::api::buffer::BufferId;
use crate::api::types::MemoryAccess;

/// One recorded access transition for a buffer.
///
/// Makes prior writes to the buffer visible before the next dispatch reads
/// or writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTransition {
    pub buffer: BufferId,
    pub access: MemoryAccess,
}

/// Ordered set of transitions guarding a single dispatch.
///
/// Built up while binding a descriptor set; empty barriers are not inserted
/// into the command buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineBarrier {
    transitions: Vec<BufferTransition>,
}

impl PipelineBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, buffer: BufferId, access: MemoryAccess) {
        self.transitions.push(BufferTransition { buffer, access });
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn transitions(&self) -> &[BufferTransition] {
        &self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_barrier_is_empty() {
        assert!(PipelineBarrier::new().is_empty());
    }

    #[test]
    fn test_transitions_preserve_record_order() {
        let mut barrier = PipelineBarrier::new();
        barrier.record(BufferId(2), MemoryAccess::Write);
        barrier.record(BufferId(5), MemoryAccess::ReadWrite);

        let transitions = barrier.transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].buffer, BufferId(2));
        assert_eq!(transitions[0].access, MemoryAccess::Write);
        assert_eq!(transitions[1].buffer, BufferId(5));
    }
}
