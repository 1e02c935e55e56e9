//! Shared device-level types: shader identity, workgroup sizing, access
//! permissions, scalar types.

use std::fmt;

/// Identity of a compiled compute kernel plus its declared descriptor layout.
///
/// The binding count is the total number of descriptor slots the shader
/// declares, including the trailing parameter-buffer slot. Descriptor sets
/// allocated for this shader are sized to exactly this count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInfo {
    name: String,
    binding_count: usize,
}

impl ShaderInfo {
    pub fn new(name: impl Into<String>, binding_count: usize) -> Self {
        Self {
            name: name.into(),
            binding_count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding_count(&self) -> usize {
        self.binding_count
    }
}

/// 3-D workgroup dimensions for a shader dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Access permission shared by every reference in an argument group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryAccess {
    Read,
    Write,
    ReadWrite,
}

impl MemoryAccess {
    /// Write and ReadWrite bindings must record a pipeline-barrier
    /// transition; Read-only bindings record none.
    pub fn includes_write(self) -> bool {
        matches!(self, MemoryAccess::Write | MemoryAccess::ReadWrite)
    }
}

/// Scalar element types supported by the value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F16,
    I32,
    U32,
    U8,
}

impl DType {
    pub fn element_size(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I32 => 4,
            DType::U32 => 4,
            DType::U8 => 1,
        }
    }
}
