//! Unified error handling for vkforge
//!
//! This module provides a centralized error type covering every failure mode
//! of the encoding core. It implements error categorization for:
//! - Contract errors (programming-contract violations, fatal for the graph build)
//! - Exhaustion errors (pool/budget limits, no retry at this layer)
//! - Internal errors (bugs, poisoned locks)

use std::fmt;

use crate::graph::value::TypeTag;

/// Unified error type for vkforge
///
/// Every encode path propagates this type. There is no local recovery
/// anywhere in the encoding core: a failed encode aborts the current
/// graph-build pass and the caller must abandon it.
#[derive(Debug, thiserror::Error)]
pub enum VkForgeError {
    // ========== Resolution Errors ==========
    /// A value reference resolved to the wrong kind of resource
    #[error("value v{index} has type {actual}, expected {expected}")]
    ValueTypeMismatch {
        index: usize,
        expected: TypeTag,
        actual: TypeTag,
    },

    /// A value reference does not point into the value store
    #[error("value reference v{index} is out of range (store holds {len} values)")]
    ValueOutOfRange { index: usize, len: usize },

    /// A shader argument resolved to a value that cannot occupy a
    /// descriptor slot
    #[error("value v{index} has type {actual}, expected TENSOR or STAGING")]
    ValueNotBindable { index: usize, actual: TypeTag },

    // ========== Capacity/Layout Errors ==========
    /// More bindings were requested than the descriptor set can hold
    #[error("descriptor set for shader '{shader}' has {capacity} slots, binding to slot {slot} requested")]
    DescriptorCapacityExceeded {
        shader: String,
        capacity: usize,
        slot: usize,
    },

    /// Prepack source byte count disagrees with the destination tensor
    #[error("prepack source is {src_nbytes} bytes but destination tensor holds {dst_nbytes} bytes")]
    StagingSizeMismatch {
        src_nbytes: usize,
        dst_nbytes: usize,
    },

    /// A host copy would run past the end of a buffer
    #[error("copy of {requested} bytes exceeds buffer capacity {capacity}")]
    CopyBoundsExceeded { requested: usize, capacity: usize },

    // ========== Exhaustion Errors ==========
    /// Device memory budget exhausted
    #[error("device memory budget exhausted: requested {requested} bytes, {available} available")]
    DeviceOutOfMemory { requested: usize, available: usize },

    /// Staging budget exhausted
    #[error("staging budget exhausted: requested {requested} bytes, {available} available")]
    StagingBudgetExceeded { requested: usize, available: usize },

    /// Descriptor pool exhausted
    #[error("descriptor pool exhausted: {capacity} sets already allocated")]
    DescriptorPoolExhausted { capacity: usize },

    // ========== Internal Errors ==========
    /// A submission index was never recorded by the queue
    #[error("submission {index} was never recorded")]
    UnknownSubmission { index: u64 },

    /// Lock poisoned (indicates a bug or a panicking encoder thread)
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl VkForgeError {
    /// Categorize the error for handling decisions
    ///
    /// Contract errors mean the graph was built incorrectly and the whole
    /// build attempt must be abandoned. Exhaustion errors may be retried by
    /// a layer that owns the budgets; this layer never retries.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VkForgeError::ValueTypeMismatch { .. }
            | VkForgeError::ValueOutOfRange { .. }
            | VkForgeError::ValueNotBindable { .. }
            | VkForgeError::DescriptorCapacityExceeded { .. }
            | VkForgeError::StagingSizeMismatch { .. }
            | VkForgeError::CopyBoundsExceeded { .. }
            | VkForgeError::InvalidConfiguration(_) => ErrorCategory::Contract,

            VkForgeError::DeviceOutOfMemory { .. }
            | VkForgeError::StagingBudgetExceeded { .. }
            | VkForgeError::DescriptorPoolExhausted { .. } => ErrorCategory::Exhaustion,

            VkForgeError::UnknownSubmission { .. } | VkForgeError::LockPoisoned(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Check if this error is a programming-contract violation
    pub fn is_contract_violation(&self) -> bool {
        matches!(self.category(), ErrorCategory::Contract)
    }

    /// Check if this error is a resource-exhaustion condition
    pub fn is_exhaustion(&self) -> bool {
        matches!(self.category(), ErrorCategory::Exhaustion)
    }

    /// Check if this is an internal error (indicates a bug)
    pub fn is_internal_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Internal)
    }
}

/// Error category for handling decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Programming-contract violation - the graph build must be abandoned
    Contract,
    /// Resource exhaustion - retry policy belongs to the budget owner
    Exhaustion,
    /// Internal error - indicates a bug
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Contract => write!(f, "Contract"),
            ErrorCategory::Exhaustion => write!(f, "Exhaustion"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for VkForgeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        VkForgeError::LockPoisoned(err.to_string())
    }
}

/// Helper type alias for Results using VkForgeError
pub type ForgeResult<T> = std::result::Result<T, VkForgeError>;
