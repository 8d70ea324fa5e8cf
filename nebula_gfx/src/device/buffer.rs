/// Buffer usage flags and creation info

use bitflags::bitflags;

bitflags! {
    /// Buffer usage flags, bitwise-combinable
    ///
    /// # Example
    ///
    /// ```
    /// use nebula_gfx::BufferUsage;
    ///
    /// let usage = BufferUsage::VERTEX | BufferUsage::INDEX;
    /// assert!(usage.contains(BufferUsage::VERTEX));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Uniform/constant buffer
        const UNIFORM = 0x1;
        /// Vertex buffer
        const VERTEX = 0x2;
        /// Index buffer
        const INDEX = 0x4;
    }
}

/// Descriptor for creating a buffer
///
/// The buffer is created with `data.len()` bytes and initialized with the
/// supplied contents; use `update_buffer` for re-uploads.
#[derive(Debug, Clone)]
pub struct BufferInfo {
    /// Buffer usage flags (must not be empty)
    pub usage: BufferUsage,
    /// Initial contents; determines the buffer size
    pub data: Vec<u8>,
}

impl BufferInfo {
    pub fn new(usage: BufferUsage, data: Vec<u8>) -> Self {
        Self { usage, data }
    }
}
