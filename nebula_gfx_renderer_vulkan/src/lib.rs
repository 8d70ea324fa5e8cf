/*!
# Nebula GFX - Vulkan Renderer Backend

Vulkan implementation of the Nebula graphics abstraction.

This crate provides the one production backend for the `nebula_gfx`
[`GraphicsDevice`](nebula_gfx::GraphicsDevice) trait, using the Ash library
for Vulkan bindings and gpu-allocator for memory management.

Every caller-visible resource lives in a handle-indexed registry owned by
[`VulkanGraphicsDevice`]; the caller only ever holds opaque handles. The
backend keeps exactly one command-buffer recording open at a time and
performs all host-to-device transfers through staging buffers on a dedicated
transfer queue.
*/

// Vulkan implementation modules
mod registry;
mod recording;
mod vulkan_context;
mod vulkan_resources;
mod vulkan_format;
mod vulkan_memory;
mod vulkan_pipeline;
mod vulkan_swapchain;
mod vulkan_device;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_device::VulkanGraphicsDevice;
