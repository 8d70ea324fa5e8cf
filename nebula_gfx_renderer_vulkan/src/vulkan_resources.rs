/// Backing state behind each handle kind, plus its destruction
///
/// Entries are plain data: they hold the native objects and are destroyed
/// explicitly through the GpuContext methods below, never implicitly. The
/// device registries own the entries; callers only ever see handles.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use nebula_gfx::{BufferUsage, RenderPass, RenderTarget, ShaderType, WindowSource};

use crate::vulkan_context::GpuContext;

// ============================================================================
// Entries
// ============================================================================

pub(crate) struct ShaderEntry {
    pub module: vk::ShaderModule,
    pub ty: ShaderType,
}

pub(crate) struct BufferEntry {
    pub buffer: vk::Buffer,
    /// GPU memory allocation; taken out on destruction
    pub allocation: Option<Allocation>,
    pub size: u64,
    #[allow(dead_code)]
    pub usage: BufferUsage,
}

pub(crate) struct TextureEntry {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub allocation: Option<Allocation>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

/// Depth image paired 1:1 with a texture or window render target.
/// Lifetime follows the paired target.
pub(crate) struct DepthBufferEntry {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub allocation: Option<Allocation>,
    pub format: vk::Format,
}

pub(crate) struct WindowEntry {
    pub surface: vk::SurfaceKHR,
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    /// One acquire semaphore per frame slot
    pub image_available: Vec<vk::Semaphore>,
    /// One render semaphore per back-buffer image
    pub render_finished: Vec<vk::Semaphore>,
    /// One pacing fence per frame slot, created signaled
    pub in_flight: Vec<vk::Fence>,
    /// Frame slot cursor, advanced by `present`
    pub current_frame: usize,
    /// Back-buffer acquired by `next_frame`, pending `present`
    pub acquired_image: Option<u32>,
    /// Window-system collaborator backing this surface
    pub source: Arc<dyn WindowSource>,
}

pub(crate) struct InputSetEntry {
    pub pool: vk::DescriptorPool,
    pub descriptor_set: vk::DescriptorSet,
    pub target_render_pass: RenderPass,
    pub set_index: u32,
}

pub(crate) struct RenderPassEntry {
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    /// One framebuffer per back-buffer for window targets, one for textures
    pub framebuffers: Vec<vk::Framebuffer>,
    pub extent: vk::Extent2D,
    pub target: RenderTarget,
    pub clear_values: Vec<vk::ClearValue>,
}

pub(crate) struct CommandBufferEntry {
    pub cmd: vk::CommandBuffer,
    /// Render pass the commands were recorded against (the last one bound)
    pub render_pass: Option<RenderPass>,
}

// ============================================================================
// Destruction
// ============================================================================

impl GpuContext {
    pub fn destroy_shader_entry(&self, entry: ShaderEntry) {
        unsafe {
            self.device.destroy_shader_module(entry.module, None);
        }
    }

    pub fn destroy_buffer_entry(&self, mut entry: BufferEntry) {
        unsafe {
            if let Some(allocation) = entry.allocation.take() {
                if let Ok(mut allocator) = self.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.device.destroy_buffer(entry.buffer, None);
        }
    }

    pub fn destroy_texture_entry(&self, mut entry: TextureEntry) {
        unsafe {
            self.device.destroy_sampler(entry.sampler, None);
            self.device.destroy_image_view(entry.view, None);
            if let Some(allocation) = entry.allocation.take() {
                if let Ok(mut allocator) = self.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.device.destroy_image(entry.image, None);
        }
    }

    pub fn destroy_depth_buffer_entry(&self, mut entry: DepthBufferEntry) {
        unsafe {
            self.device.destroy_image_view(entry.view, None);
            if let Some(allocation) = entry.allocation.take() {
                if let Ok(mut allocator) = self.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.device.destroy_image(entry.image, None);
        }
    }

    pub fn destroy_window_entry(&self, entry: WindowEntry) {
        unsafe {
            for &semaphore in entry.image_available.iter().chain(&entry.render_finished) {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &fence in &entry.in_flight {
                self.device.destroy_fence(fence, None);
            }
            for &view in &entry.views {
                self.device.destroy_image_view(view, None);
            }
            if let Some(swapchain_loader) = &self.swapchain_loader {
                swapchain_loader.destroy_swapchain(entry.swapchain, None);
            }
            if let Some(surface_loader) = &self.surface_loader {
                surface_loader.destroy_surface(entry.surface, None);
            }
        }
    }

    pub fn destroy_input_set_entry(&self, entry: InputSetEntry) {
        unsafe {
            // Destroying the pool releases the set allocated from it.
            self.device.destroy_descriptor_pool(entry.pool, None);
        }
    }

    pub fn destroy_render_pass_entry(&self, entry: RenderPassEntry) {
        unsafe {
            for &framebuffer in &entry.framebuffers {
                self.device.destroy_framebuffer(framebuffer, None);
            }
            self.device.destroy_pipeline(entry.pipeline, None);
            self.device.destroy_pipeline_layout(entry.pipeline_layout, None);
            for &layout in &entry.set_layouts {
                self.device.destroy_descriptor_set_layout(layout, None);
            }
            self.device.destroy_render_pass(entry.render_pass, None);
        }
    }

    pub fn destroy_command_buffer_entry(&self, entry: CommandBufferEntry) {
        unsafe {
            self.device
                .free_command_buffers(self.graphics_cmd_pool, &[entry.cmd]);
        }
    }
}
