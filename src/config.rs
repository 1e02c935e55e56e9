//! Graph and context configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a compute graph and the context it owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Context-level resource budgets.
    #[serde(default)]
    pub context: ContextConfig,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resource budgets for a context. `None` means uncapped.
///
/// Budgets are enforced at allocation time; exceeding one is a
/// resource-exhaustion error with no retry at this layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Cap on total device-tensor bytes allocated through the context.
    pub device_memory_budget: Option<usize>,
    /// Cap on live staging bytes. Released staging buffers return their
    /// bytes to the budget.
    pub staging_budget: Option<usize>,
    /// Cap on descriptor sets allocated from the pool.
    pub descriptor_pool_capacity: Option<usize>,
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_memory_budget(mut self, bytes: usize) -> Self {
        self.device_memory_budget = Some(bytes);
        self
    }

    pub fn with_staging_budget(mut self, bytes: usize) -> Self {
        self.staging_budget = Some(bytes);
        self
    }

    pub fn with_descriptor_pool_capacity(mut self, sets: usize) -> Self {
        self.descriptor_pool_capacity = Some(sets);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_uncapped() {
        let config = GraphConfig::default();
        assert!(config.context.device_memory_budget.is_none());
        assert!(config.context.staging_budget.is_none());
        assert!(config.context.descriptor_pool_capacity.is_none());
    }

    #[test]
    fn test_builder_sets_budgets() {
        let config = ContextConfig::new()
            .with_device_memory_budget(1 << 20)
            .with_staging_budget(4096)
            .with_descriptor_pool_capacity(64);
        assert_eq!(config.device_memory_budget, Some(1 << 20));
        assert_eq!(config.staging_budget, Some(4096));
        assert_eq!(config.descriptor_pool_capacity, Some(64));
    }

    #[test]
    fn test_config_roundtrips_through_serde() {
        let config = GraphConfig {
            context: ContextConfig::new().with_staging_budget(256),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GraphConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.context.staging_budget, Some(256));
    }

    #[test]
    fn test_missing_context_section_defaults() {
        let parsed: GraphConfig = serde_json::from_str("{}").unwrap();
        assert!(parsed.context.staging_budget.is_none());
    }
}
