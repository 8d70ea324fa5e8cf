/// Device module - the graphics abstraction contract and its input types

// Module declarations
pub mod graphics_device;
pub mod shader;
pub mod buffer;
pub mod texture;
pub mod window;
pub mod render_pass;
pub mod input_set;
pub mod command_buffer;

#[cfg(test)]
pub mod mock_device;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use shader::*;
pub use buffer::*;
pub use texture::*;
pub use window::*;
pub use render_pass::*;
pub use input_set::*;
pub use command_buffer::*;
