/// Window surface and swapchain construction
///
/// Builds the per-window backing state: surface from the collaborator's raw
/// handles, swapchain with the requested back-buffer count and present mode,
/// image views, and the per-frame synchronization objects that pace
/// acquire/execute/present.

use ash::vk;
use nebula_gfx::gfx_warn;
use nebula_gfx::{Error, Result, WindowInfo, WindowSource};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::present_mode_to_vk;
use crate::vulkan_resources::WindowEntry;

const SOURCE: &str = "nebula::vulkan";

impl GpuContext {
    /// Create the full backing state of a window
    ///
    /// Fails if the device was created without presentation support or the
    /// surface cannot be presented from the graphics queue. On failure every
    /// partially created native object is destroyed.
    pub fn build_window_entry(
        &self,
        info: &WindowInfo,
        source: Arc<dyn WindowSource>,
    ) -> Result<WindowEntry> {
        let (Some(surface_loader), Some(swapchain_loader)) =
            (&self.surface_loader, &self.swapchain_loader)
        else {
            return Err(Error::InitializationFailed(
                "device was created without presentation support".to_string(),
            ));
        };

        unsafe {
            let display_handle = source.display_handle().map_err(|e| {
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let window_handle = source.window_handle().map_err(|e| {
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

            let surface = ash_window::create_surface(
                &self.entry,
                &self.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::InitializationFailed(format!("Failed to create surface: {:?}", e)))?;

            // Everything below must destroy the surface on failure.
            match self.build_swapchain_state(surface, surface_loader, swapchain_loader, info, source)
            {
                Ok(entry) => Ok(entry),
                Err(e) => {
                    surface_loader.destroy_surface(surface, None);
                    Err(e)
                }
            }
        }
    }

    unsafe fn build_swapchain_state(
        &self,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        swapchain_loader: &ash::khr::swapchain::Device,
        info: &WindowInfo,
        source: Arc<dyn WindowSource>,
    ) -> Result<WindowEntry> {
        let supported = surface_loader
            .get_physical_device_surface_support(
                self.physical_device,
                self.graphics_queue_family,
                surface,
            )
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to query surface support: {:?}", e))
            })?;
        if !supported {
            return Err(Error::InitializationFailed(
                "surface is not presentable from the graphics queue".to_string(),
            ));
        }

        let capabilities = surface_loader
            .get_physical_device_surface_capabilities(self.physical_device, surface)
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
            })?;

        let formats = surface_loader
            .get_physical_device_surface_formats(self.physical_device, surface)
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
            })?;

        let surface_format = formats
            .iter()
            .find(|f| {
                f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB
            })
            .unwrap_or(&formats[0]);

        // Vsync (FIFO) is always available; immediate may not be.
        let present_modes = surface_loader
            .get_physical_device_surface_present_modes(self.physical_device, surface)
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
            })?;
        let mut present_mode = present_mode_to_vk(info.present_mode);
        if !present_modes.contains(&present_mode) {
            gfx_warn!(
                SOURCE,
                "Present mode {:?} unavailable, falling back to FIFO",
                info.present_mode
            );
            present_mode = vk::PresentModeKHR::FIFO;
        }

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: info.width.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: info.height.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };

        // Requested back-buffer count, minimum 1, clamped to surface limits
        let mut image_count = info.framebuffer_count.max(1).max(capabilities.min_image_count);
        if capabilities.max_image_count > 0 {
            image_count = image_count.min(capabilities.max_image_count);
        }

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let swapchain = swapchain_loader
            .create_swapchain(&swapchain_create_info, None)
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

        match self.build_swapchain_images(swapchain, swapchain_loader, surface_format.format) {
            Ok((images, views, image_available, render_finished, in_flight)) => Ok(WindowEntry {
                surface,
                swapchain,
                images,
                views,
                format: surface_format.format,
                extent,
                image_available,
                render_finished,
                in_flight,
                current_frame: 0,
                acquired_image: None,
                source,
            }),
            Err(e) => {
                swapchain_loader.destroy_swapchain(swapchain, None);
                Err(e)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    unsafe fn build_swapchain_images(
        &self,
        swapchain: vk::SwapchainKHR,
        swapchain_loader: &ash::khr::swapchain::Device,
        format: vk::Format,
    ) -> Result<(
        Vec<vk::Image>,
        Vec<vk::ImageView>,
        Vec<vk::Semaphore>,
        Vec<vk::Semaphore>,
        Vec<vk::Fence>,
    )> {
        let images = swapchain_loader.get_swapchain_images(swapchain).map_err(|e| {
            Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
        })?;

        let mut views: Vec<vk::ImageView> = Vec::with_capacity(images.len());
        let mut image_available: Vec<vk::Semaphore> = Vec::with_capacity(images.len());
        let mut render_finished: Vec<vk::Semaphore> = Vec::with_capacity(images.len());
        let mut in_flight: Vec<vk::Fence> = Vec::with_capacity(images.len());

        let cleanup = |ctx: &Self,
                       views: &[vk::ImageView],
                       semaphores_a: &[vk::Semaphore],
                       semaphores_b: &[vk::Semaphore],
                       fences: &[vk::Fence]| {
            for &view in views {
                ctx.device.destroy_image_view(view, None);
            }
            for &semaphore in semaphores_a.iter().chain(semaphores_b) {
                ctx.device.destroy_semaphore(semaphore, None);
            }
            for &fence in fences {
                ctx.device.destroy_fence(fence, None);
            }
        };

        for &image in &images {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            match self.device.create_image_view(&create_info, None) {
                Ok(view) => views.push(view),
                Err(e) => {
                    cleanup(self, &views, &image_available, &render_finished, &in_flight);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create swapchain image view: {:?}",
                        e
                    )));
                }
            }
        }

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        // Fences start signaled so the first acquire of each frame slot
        // does not wait forever.
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        for _ in 0..images.len() {
            match self.device.create_semaphore(&semaphore_info, None) {
                Ok(semaphore) => image_available.push(semaphore),
                Err(e) => {
                    cleanup(self, &views, &image_available, &render_finished, &in_flight);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create semaphore: {:?}",
                        e
                    )));
                }
            }
            match self.device.create_semaphore(&semaphore_info, None) {
                Ok(semaphore) => render_finished.push(semaphore),
                Err(e) => {
                    cleanup(self, &views, &image_available, &render_finished, &in_flight);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create semaphore: {:?}",
                        e
                    )));
                }
            }
            match self.device.create_fence(&fence_info, None) {
                Ok(fence) => in_flight.push(fence),
                Err(e) => {
                    cleanup(self, &views, &image_available, &render_finished, &in_flight);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create fence: {:?}",
                        e
                    )));
                }
            }
        }

        Ok((images, views, image_available, render_finished, in_flight))
    }
}
