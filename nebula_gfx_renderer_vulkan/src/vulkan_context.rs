/// GpuContext - Shared GPU state for the Vulkan backend
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics and transfer queues for command submission
/// - Command pools for recording and one-shot upload operations
///
/// The context performs no teardown of its own; destruction order is handled
/// by `VulkanGraphicsDevice::drop()` so the allocator is always released
/// before the device and instance go away.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use nebula_gfx::{Error, Result};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

/// Upper bound for any blocking wait on bounded GPU work. Exceeding it is a
/// fatal synchronization failure, not a retry.
pub(crate) const GPU_WAIT_TIMEOUT_NS: u64 = 10_000_000_000;

pub(crate) struct GpuContext {
    /// Vulkan function entry (kept alive for the instance)
    pub entry: ash::Entry,

    /// Vulkan instance
    pub instance: ash::Instance,

    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub device: ash::Device,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Transfer queue for staged uploads (may alias the graphics queue)
    pub transfer_queue: vk::Queue,

    /// Transfer queue family index
    pub transfer_queue_family: u32,

    /// GPU memory allocator (shared, requires mutex for thread safety).
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed.
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Command pool for caller-visible recordings
    pub graphics_cmd_pool: vk::CommandPool,

    /// Transient command pool for one-shot upload operations
    pub transfer_cmd_pool: vk::CommandPool,

    /// Surface loader; present only when the device was created presentable
    pub surface_loader: Option<ash::khr::surface::Instance>,

    /// Swapchain loader; present only when the device was created presentable
    pub swapchain_loader: Option<ash::khr::swapchain::Device>,

    /// Debug messenger (validation builds only)
    pub debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl GpuContext {
    /// Concurrent-sharing queue family list when graphics and transfer differ
    pub fn sharing_families(&self) -> Vec<u32> {
        if self.graphics_queue_family == self.transfer_queue_family {
            Vec::new()
        } else {
            vec![self.graphics_queue_family, self.transfer_queue_family]
        }
    }

    /// Block until all queues are idle
    ///
    /// Resource teardown waits here so the GPU cannot still be reading memory
    /// that is about to be destroyed.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle().map_err(|e| {
                Error::BackendError(format!("Failed to wait for device idle: {:?}", e))
            })
        }
    }
}
