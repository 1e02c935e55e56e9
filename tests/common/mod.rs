//! Shared helpers for integration tests.

use once_cell::sync::Lazy;
use vkforge::{ComputeGraph, ContextConfig, DType, GraphConfig, ShaderInfo, ValueRef};

/// Budgeted config shared by tests that want allocation limits.
pub static BUDGETED_CONFIG: Lazy<GraphConfig> = Lazy::new(|| GraphConfig {
    context: ContextConfig::new()
        .with_device_memory_budget(1 << 20)
        .with_staging_budget(1 << 20)
        .with_descriptor_pool_capacity(1024),
});

pub fn graph() -> ComputeGraph {
    ComputeGraph::new(GraphConfig::default())
}

pub fn budgeted_graph() -> ComputeGraph {
    ComputeGraph::new(BUDGETED_CONFIG.clone())
}

pub fn shader(name: &str, binding_count: usize) -> ShaderInfo {
    ShaderInfo::new(name, binding_count)
}

/// Deterministic byte pattern for staging-content assertions.
pub fn patterned_bytes(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}

/// Add an f32 tensor with `numel` elements.
pub fn add_f32_tensor(g: &mut ComputeGraph, numel: i64) -> ValueRef {
    g.add_tensor(vec![numel], DType::F32)
        .expect("tensor allocation should succeed")
}
