//! Opaque typed handles for GPU resources
//!
//! Every resource the backend owns is referred to through a small, copyable
//! handle. Handles are versioned slot-map keys: reusing a freed slot bumps the
//! version, so a stale handle is detected on lookup instead of silently
//! aliasing the new resource. `Default` is the reserved null sentinel.
//!
//! Identifiers are only unique within their own kind; a `Shader` and a
//! `Buffer` may carry the same underlying slot value.

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a compiled shader stage
    pub struct Shader;

    /// Handle to GPU-resident linear memory
    pub struct Buffer;

    /// Handle to a GPU image with its sampler
    pub struct Texture;

    /// Handle to a presentation surface and its back-buffer chain
    pub struct Window;

    /// Handle to a bound-resource group for one descriptor set
    pub struct InputSet;

    /// Handle to a compiled graphics pipeline with its render pass
    pub struct RenderPass;

    /// Handle to a finalized, replayable sequence of recorded commands
    pub struct CommandBuffer;
}

/// Common behavior of all handle kinds.
///
/// # Example
///
/// ```
/// use nebula_gfx::{Handle, Shader};
///
/// let null = Shader::default();
/// assert!(!null.is_valid());
/// ```
pub trait Handle: slotmap::Key {
    /// Whether this handle is non-null.
    ///
    /// A valid handle was returned by a `create_*` call and has not been
    /// passed to the matching `free_*` yet. Validity of a non-null handle is
    /// ultimately decided by the backend registry on lookup.
    fn is_valid(&self) -> bool {
        !slotmap::Key::is_null(self)
    }
}

impl<K: slotmap::Key> Handle for K {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
