//! The device context: owner of all shared mutable encoding state.
//!
//! One context backs one compute graph. It owns the descriptor-set cache,
//! the active command buffer, the dispatch-serialization lock, and the
//! device/staging budgets. Nodes never touch this state directly; every
//! operation goes through a context handle passed down from the graph, so
//! separate graphs (separate contexts) encode independently.
//!
//! At most one thread may be encoding into a given context's command buffer
//! at any instant. The dispatch lock enforces this; its guard releases on
//! every exit path, including early error returns.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::barrier::PipelineBarrier;
use crate::api::buffer::{BufferId, DeviceBuffer, StagingBuffer};
use crate::api::command::{Command, CommandBuffer};
use crate::api::descriptor::{DescriptorSet, DescriptorSetCache};
use crate::api::types::{ShaderInfo, WorkgroupSize};
use crate::config::ContextConfig;
use crate::error::{ForgeResult, VkForgeError};

/// Index identifying one queue submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitIndex(pub u64);

#[derive(Debug)]
struct SubmittedBatch {
    index: u64,
    /// Held until the submission completes; dropping the batch releases the
    /// resources its commands were keeping alive (staging clones).
    commands: Vec<Command>,
}

/// Snapshot of context counters, for observability and tests.
#[derive(Debug, Clone, Default)]
pub struct ContextStats {
    pub descriptor_sets_allocated: usize,
    pub descriptor_layouts_cached: usize,
    pub descriptor_cache_hits: usize,
    pub dispatches_registered: usize,
    pub staging_allocations: usize,
    /// Submitted batches not yet retired by `wait_for`.
    pub pending_submissions: usize,
    pub device_bytes_in_use: usize,
    pub staging_bytes_in_use: usize,
    /// Highest number of threads ever observed inside the dispatch lock.
    /// Exclusivity holds iff this never exceeds 1.
    pub max_lock_occupancy: usize,
}

/// Scoped dispatch-serialization guard.
///
/// Occupancy is counted so tests can assert strict one-at-a-time entry.
#[derive(Debug)]
pub struct DispatchGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    occupancy: &'a AtomicUsize,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.occupancy.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Device context for one compute graph.
pub struct Context {
    config: ContextConfig,
    descriptor_cache: Mutex<DescriptorSetCache>,
    command_buffer: Mutex<CommandBuffer>,
    submissions: Mutex<Vec<SubmittedBatch>>,
    next_submit_index: AtomicU64,
    dispatch_mutex: Mutex<()>,
    lock_occupancy: AtomicUsize,
    max_lock_occupancy: AtomicUsize,
    next_buffer_id: AtomicU64,
    device_in_use: AtomicUsize,
    staging_in_use: Arc<AtomicUsize>,
    dispatches_registered: AtomicUsize,
    staging_allocations: AtomicUsize,
}

impl Context {
    pub fn new(config: ContextConfig) -> Self {
        tracing::debug!(?config, "creating context");
        Self {
            descriptor_cache: Mutex::new(DescriptorSetCache::new(
                config.descriptor_pool_capacity,
            )),
            config,
            command_buffer: Mutex::new(CommandBuffer::new()),
            submissions: Mutex::new(Vec::new()),
            next_submit_index: AtomicU64::new(0),
            dispatch_mutex: Mutex::new(()),
            lock_occupancy: AtomicUsize::new(0),
            max_lock_occupancy: AtomicUsize::new(0),
            next_buffer_id: AtomicU64::new(0),
            device_in_use: AtomicUsize::new(0),
            staging_in_use: Arc::new(AtomicUsize::new(0)),
            dispatches_registered: AtomicUsize::new(0),
            staging_allocations: AtomicUsize::new(0),
        }
    }

    /// Acquire the dispatch-serialization lock.
    ///
    /// Must be held for the duration of descriptor-set acquisition and
    /// dispatch registration. The guard releases on drop, so early error
    /// returns release it too.
    pub fn dispatch_lock(&self) -> ForgeResult<DispatchGuard<'_>> {
        let guard = self.dispatch_mutex.lock()?;
        let now = self.lock_occupancy.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_lock_occupancy.fetch_max(now, Ordering::SeqCst);
        Ok(DispatchGuard {
            _guard: guard,
            occupancy: &self.lock_occupancy,
        })
    }

    /// Allocate a descriptor set from the cache keyed by
    /// (shader, local workgroup size).
    pub fn get_descriptor_set(
        &self,
        shader: &ShaderInfo,
        local_workgroup_size: WorkgroupSize,
    ) -> ForgeResult<DescriptorSet> {
        self.descriptor_cache
            .lock()?
            .get(shader, local_workgroup_size)
    }

    /// Append the barrier (when non-empty) and the dispatch command to the
    /// active command buffer.
    pub fn register_shader_dispatch(
        &self,
        descriptor_set: DescriptorSet,
        pipeline_barrier: PipelineBarrier,
        shader: &ShaderInfo,
        global_workgroup_size: WorkgroupSize,
    ) -> ForgeResult<()> {
        let mut cb = self.command_buffer.lock()?;
        if !pipeline_barrier.is_empty() {
            cb.push(Command::PipelineBarrier(pipeline_barrier));
        }
        tracing::trace!(
            shader = shader.name(),
            global = %global_workgroup_size,
            bindings = descriptor_set.bindings().len(),
            "dispatch registered"
        );
        cb.push(Command::Dispatch {
            shader: shader.name().to_string(),
            descriptor_set,
            global_workgroup_size,
        });
        self.dispatches_registered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Reserve `nbytes` against an optional budget in one atomic step, so
    /// racing allocations can never jointly overshoot the cap. `Err` carries
    /// the in-use count observed at the failed attempt.
    fn reserve_bytes(
        counter: &AtomicUsize,
        budget: Option<usize>,
        nbytes: usize,
    ) -> Result<(), usize> {
        match budget {
            Some(budget) => counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |in_use| {
                    in_use.checked_add(nbytes).filter(|&total| total <= budget)
                })
                .map(|_| ()),
            None => {
                counter.fetch_add(nbytes, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Allocate a persistent device buffer against the device-memory budget.
    pub fn allocate_buffer(&self, nbytes: usize) -> ForgeResult<DeviceBuffer> {
        let budget = self.config.device_memory_budget;
        Self::reserve_bytes(&self.device_in_use, budget, nbytes).map_err(|in_use| {
            VkForgeError::DeviceOutOfMemory {
                requested: nbytes,
                available: budget.unwrap_or(usize::MAX).saturating_sub(in_use),
            }
        })?;
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(id = id.0, nbytes, "device buffer allocated");
        Ok(DeviceBuffer::new(id, nbytes))
    }

    /// Allocate a transient staging buffer against the staging budget.
    ///
    /// The bytes return to the budget when the last handle to the buffer
    /// drops, which happens once the command buffer referencing it retires.
    pub fn allocate_staging(&self, nbytes: usize) -> ForgeResult<StagingBuffer> {
        let budget = self.config.staging_budget;
        Self::reserve_bytes(&self.staging_in_use, budget, nbytes).map_err(|in_use| {
            VkForgeError::StagingBudgetExceeded {
                requested: nbytes,
                available: budget.unwrap_or(usize::MAX).saturating_sub(in_use),
            }
        })?;
        self.staging_allocations.fetch_add(1, Ordering::Relaxed);
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(id = id.0, nbytes, "staging buffer allocated");
        Ok(StagingBuffer::new(id, nbytes, self.staging_in_use.clone()))
    }

    /// Snapshot of the commands recorded since the last submission.
    pub fn recorded_commands(&self) -> ForgeResult<Vec<Command>> {
        Ok(self.command_buffer.lock()?.commands().to_vec())
    }

    /// Hand the recorded command buffer to the queue.
    pub fn submit(&self) -> ForgeResult<SubmitIndex> {
        let commands = self.command_buffer.lock()?.take();
        let index = self.next_submit_index.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(index, commands = commands.len(), "commands submitted");
        self.submissions.lock()?.push(SubmittedBatch { index, commands });
        Ok(SubmitIndex(index))
    }

    /// Block until the given submission completes, then retire it: the batch
    /// is removed from the in-flight list and dropping it releases the
    /// resources its commands were keeping alive. Waiting again on an
    /// already-retired index is a no-op.
    pub fn wait_for(&self, index: SubmitIndex) -> ForgeResult<()> {
        if index.0 >= self.next_submit_index.load(Ordering::Relaxed) {
            return Err(VkForgeError::UnknownSubmission { index: index.0 });
        }
        let mut submissions = self.submissions.lock()?;
        if let Some(pos) = submissions.iter().position(|b| b.index == index.0) {
            let batch = submissions.swap_remove(pos);
            tracing::debug!(
                index = index.0,
                commands = batch.commands.len(),
                "submission retired"
            );
        }
        Ok(())
    }

    pub fn stats(&self) -> ForgeResult<ContextStats> {
        let cache = self.descriptor_cache.lock()?;
        Ok(ContextStats {
            descriptor_sets_allocated: cache.sets_allocated(),
            descriptor_layouts_cached: cache.layout_count(),
            descriptor_cache_hits: cache.cache_hits(),
            dispatches_registered: self.dispatches_registered.load(Ordering::Relaxed),
            staging_allocations: self.staging_allocations.load(Ordering::Relaxed),
            pending_submissions: self.submissions.lock()?.len(),
            device_bytes_in_use: self.device_in_use.load(Ordering::Relaxed),
            staging_bytes_in_use: self.staging_in_use.load(Ordering::Relaxed),
            max_lock_occupancy: self.max_lock_occupancy.load(Ordering::SeqCst),
        })
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field(
                "dispatches_registered",
                &self.dispatches_registered.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::MemoryAccess;

    fn context() -> Context {
        Context::new(ContextConfig::default())
    }

    #[test]
    fn test_device_budget_enforced() {
        let ctx = Context::new(ContextConfig::new().with_device_memory_budget(100));
        ctx.allocate_buffer(60).unwrap();
        let err = ctx.allocate_buffer(60).unwrap_err();
        assert!(matches!(
            err,
            VkForgeError::DeviceOutOfMemory {
                requested: 60,
                available: 40
            }
        ));
    }

    #[test]
    fn test_staging_budget_recovers_after_release() {
        let ctx = Context::new(ContextConfig::new().with_staging_budget(128));
        let staging = ctx.allocate_staging(128).unwrap();
        assert!(ctx.allocate_staging(1).is_err());

        drop(staging);
        ctx.allocate_staging(128).unwrap();
    }

    #[test]
    fn test_racing_staging_allocations_never_overshoot_budget() {
        let ctx = Context::new(ContextConfig::new().with_staging_budget(256));

        let handles: Vec<StagingBuffer> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| ctx.allocate_staging(64).ok()))
                .collect();
            workers
                .into_iter()
                .filter_map(|w| w.join().unwrap())
                .collect()
        });

        // Exactly four 64-byte reservations fit; the rest must be refused.
        assert_eq!(handles.len(), 4);
        assert_eq!(ctx.stats().unwrap().staging_bytes_in_use, 256);
    }

    #[test]
    fn test_racing_buffer_allocations_never_overshoot_budget() {
        let ctx = Context::new(ContextConfig::new().with_device_memory_budget(100));

        let succeeded: usize = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| ctx.allocate_buffer(40).is_ok() as usize))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).sum()
        });

        assert_eq!(succeeded, 2);
        assert_eq!(ctx.stats().unwrap().device_bytes_in_use, 80);
    }

    #[test]
    fn test_wait_for_retires_completed_submissions() {
        let ctx = context();
        for _ in 0..3 {
            let shader = ShaderInfo::new("relu", 1);
            let set = ctx
                .get_descriptor_set(&shader, WorkgroupSize::new(1, 1, 1))
                .unwrap();
            ctx.register_shader_dispatch(
                set,
                PipelineBarrier::new(),
                &shader,
                WorkgroupSize::new(1, 1, 1),
            )
            .unwrap();
            let index = ctx.submit().unwrap();
            ctx.wait_for(index).unwrap();
        }
        assert_eq!(ctx.stats().unwrap().pending_submissions, 0);
    }

    #[test]
    fn test_waiting_twice_on_a_retired_submission_is_a_no_op() {
        let ctx = context();
        let index = ctx.submit().unwrap();
        ctx.wait_for(index).unwrap();
        ctx.wait_for(index).unwrap();
        assert_eq!(ctx.stats().unwrap().pending_submissions, 0);
    }

    #[test]
    fn test_dispatch_lock_is_scoped() {
        let ctx = context();
        {
            let _guard = ctx.dispatch_lock().unwrap();
            assert_eq!(ctx.lock_occupancy.load(Ordering::SeqCst), 1);
        }
        assert_eq!(ctx.lock_occupancy.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.stats().unwrap().max_lock_occupancy, 1);
    }

    #[test]
    fn test_register_dispatch_skips_empty_barrier() {
        let ctx = context();
        let shader = ShaderInfo::new("relu", 2);
        let set = ctx
            .get_descriptor_set(&shader, WorkgroupSize::new(64, 1, 1))
            .unwrap();
        ctx.register_shader_dispatch(
            set,
            PipelineBarrier::new(),
            &shader,
            WorkgroupSize::new(128, 1, 1),
        )
        .unwrap();

        let commands = ctx.recorded_commands().unwrap();
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], Command::Dispatch { .. }));
    }

    #[test]
    fn test_register_dispatch_inserts_barrier_first() {
        let ctx = context();
        let shader = ShaderInfo::new("pack", 3);
        let mut barrier = PipelineBarrier::new();
        let buffer = ctx.allocate_buffer(64).unwrap();
        barrier.record(buffer.id(), MemoryAccess::Write);

        let set = ctx
            .get_descriptor_set(&shader, WorkgroupSize::new(8, 8, 1))
            .unwrap();
        ctx.register_shader_dispatch(set, barrier, &shader, WorkgroupSize::new(16, 16, 1))
            .unwrap();

        let commands = ctx.recorded_commands().unwrap();
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], Command::PipelineBarrier(_)));
        assert!(matches!(commands[1], Command::Dispatch { .. }));
    }

    #[test]
    fn test_submit_drains_command_buffer() {
        let ctx = context();
        let shader = ShaderInfo::new("relu", 1);
        let set = ctx
            .get_descriptor_set(&shader, WorkgroupSize::new(1, 1, 1))
            .unwrap();
        ctx.register_shader_dispatch(
            set,
            PipelineBarrier::new(),
            &shader,
            WorkgroupSize::new(1, 1, 1),
        )
        .unwrap();

        let index = ctx.submit().unwrap();
        assert!(ctx.recorded_commands().unwrap().is_empty());
        ctx.wait_for(index).unwrap();
    }

    #[test]
    fn test_wait_for_unknown_submission_fails() {
        let ctx = context();
        let err = ctx.wait_for(SubmitIndex(42)).unwrap_err();
        assert!(matches!(
            err,
            VkForgeError::UnknownSubmission { index: 42 }
        ));
    }

    #[test]
    fn test_completed_submission_releases_staging() {
        let ctx = Context::new(ContextConfig::new().with_staging_budget(64));
        let staging = ctx.allocate_staging(64).unwrap();

        let shader = ShaderInfo::new("pack", 2);
        let mut set = ctx
            .get_descriptor_set(&shader, WorkgroupSize::new(1, 1, 1))
            .unwrap();
        set.bind(
            0,
            crate::api::descriptor::BoundResource::Staging(staging.clone()),
            MemoryAccess::Read,
        )
        .unwrap();
        ctx.register_shader_dispatch(
            set,
            PipelineBarrier::new(),
            &shader,
            WorkgroupSize::new(1, 1, 1),
        )
        .unwrap();

        // The encoding scope drops its handle; the recorded command still
        // holds a clone, so the budget stays occupied.
        drop(staging);
        assert!(ctx.allocate_staging(1).is_err());

        let index = ctx.submit().unwrap();
        ctx.wait_for(index).unwrap();
        ctx.allocate_staging(64).unwrap();
    }
}
