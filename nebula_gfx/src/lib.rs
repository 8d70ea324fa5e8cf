/*!
# Nebula GFX

Core types and the abstraction contract for the Nebula graphics layer.

This crate provides a thin, retained-resource graphics API: opaque typed
handles, plain creation-info structs, and the [`GraphicsDevice`] trait that
backend implementations fulfill. The one production backend lives in the
`nebula_gfx_renderer_vulkan` crate; a mock implementation exists for tests.

## Architecture

- **Handles**: versioned, typed identifiers for every GPU resource
- **Info structs**: the only input surface, one per entity kind
- **GraphicsDevice**: factory + single-recording command interface
- **WindowSource**: the window-system collaborator contract
- **log**: the in-crate logging subsystem used by all backends

The caller creates resources, opens the one command-buffer recording, issues
state-setting and draw commands against the bound render pass, closes the
recording, executes it and presents. Ownership of all GPU-side state stays
behind the device.
*/

// Internal modules
mod error;
mod handle;
pub mod log;
pub mod device;

// Re-export error types
pub use error::{Error, Result};

// Re-export handle types
pub use handle::{Buffer, CommandBuffer, Handle, InputSet, RenderPass, Shader, Texture, Window};

// Re-export the device contract and all info/enum types
pub use device::*;

// Re-export the key trait backing the handle types
pub use slotmap;
