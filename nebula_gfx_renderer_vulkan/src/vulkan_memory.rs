/// Memory and transfer management
///
/// Buffer/image allocation through gpu-allocator, host-to-device uploads via
/// staging buffers and one-time command buffers on the transfer queue, and
/// image layout transitions. All blocking waits are bounded by
/// `GPU_WAIT_TIMEOUT_NS`; exceeding it is fatal.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use nebula_gfx::{Error, Result};

use crate::vulkan_context::{GpuContext, GPU_WAIT_TIMEOUT_NS};
use crate::vulkan_format::{access_stage_flags, layout_access_flags};
use crate::vulkan_resources::{BufferEntry, DepthBufferEntry};

impl GpuContext {
    /// Create a buffer and bind freshly allocated memory to it
    ///
    /// The memory location encodes the requested memory properties:
    /// `CpuToGpu` is host-visible, `GpuOnly` is device-local. On any failure
    /// the partially created objects are rolled back.
    pub fn allocate_buffer(
        &self,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<(vk::Buffer, Allocation)> {
        unsafe {
            let families = self.sharing_families();
            let create_info = vk::BufferCreateInfo::default().size(size).usage(usage);
            let create_info = if families.is_empty() {
                create_info.sharing_mode(vk::SharingMode::EXCLUSIVE)
            } else {
                create_info
                    .sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&families)
            };

            let buffer = self
                .device
                .create_buffer(&create_info, None)
                .map_err(|e| Error::BackendError(format!("Failed to create buffer: {:?}", e)))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);

            let allocation = match self.allocator.lock().unwrap().allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(_) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) =
                self.device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                self.allocator.lock().unwrap().free(allocation).ok();
                self.device.destroy_buffer(buffer, None);
                return Err(Error::BackendError(format!(
                    "Failed to bind buffer memory: {:?}",
                    e
                )));
            }

            Ok((buffer, allocation))
        }
    }

    /// Create an image and bind freshly allocated device-local memory to it
    pub fn allocate_image(
        &self,
        create_info: &vk::ImageCreateInfo,
        name: &str,
    ) -> Result<(vk::Image, Allocation)> {
        unsafe {
            let image = self
                .device
                .create_image(create_info, None)
                .map_err(|e| Error::BackendError(format!("Failed to create image: {:?}", e)))?;

            let requirements = self.device.get_image_memory_requirements(image);

            let allocation = match self.allocator.lock().unwrap().allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(_) => {
                    self.device.destroy_image(image, None);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) =
                self.device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
            {
                self.allocator.lock().unwrap().free(allocation).ok();
                self.device.destroy_image(image, None);
                return Err(Error::BackendError(format!(
                    "Failed to bind image memory: {:?}",
                    e
                )));
            }

            Ok((image, allocation))
        }
    }

    /// Upload bytes into a buffer at the given offset
    ///
    /// Host-visible memory is mapped and written directly; device-local
    /// memory goes through a staging buffer and a one-time transfer command.
    /// Bytes outside the written range are preserved by both paths.
    pub fn fill_buffer(&self, data: &[u8], offset: u64, entry: &BufferEntry) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        if let Some(mapped) = entry.allocation.as_ref().and_then(|a| a.mapped_ptr()) {
            unsafe {
                std::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    (mapped.as_ptr() as *mut u8).add(offset as usize),
                    data.len(),
                );
            }
            return Ok(());
        }

        self.staged_buffer_write(data, offset, entry.buffer)
    }

    /// Read the full contents of a buffer back to host memory
    ///
    /// Used by readback tooling and tests; host-visible buffers are read from
    /// their mapping, device-local ones through a round-trip transfer.
    pub fn read_buffer_bytes(&self, entry: &BufferEntry) -> Result<Vec<u8>> {
        let size = entry.size as usize;

        if let Some(mapped) = entry.allocation.as_ref().and_then(|a| a.mapped_ptr()) {
            let mut out = vec![0u8; size];
            unsafe {
                std::ptr::copy_nonoverlapping(mapped.as_ptr() as *const u8, out.as_mut_ptr(), size);
            }
            return Ok(out);
        }

        let (staging, staging_allocation) = self.allocate_buffer(
            entry.size,
            vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuToCpu,
            "readback",
        )?;

        let copied = (|| -> Result<()> {
            let cmd = self.begin_one_time_commands(self.transfer_cmd_pool)?;
            unsafe {
                let region = vk::BufferCopy::default()
                    .src_offset(0)
                    .dst_offset(0)
                    .size(entry.size);
                self.device.cmd_copy_buffer(cmd, entry.buffer, staging, &[region]);
            }
            self.end_one_time_commands(cmd, self.transfer_cmd_pool, self.transfer_queue)
        })();

        let result = match copied {
            Ok(()) => match staging_allocation.mapped_ptr() {
                Some(mapped) => {
                    let mut out = vec![0u8; size];
                    unsafe {
                        std::ptr::copy_nonoverlapping(
                            mapped.as_ptr() as *const u8,
                            out.as_mut_ptr(),
                            size,
                        );
                    }
                    Ok(out)
                }
                None => Err(Error::BackendError(
                    "Readback buffer is not host-visible".to_string(),
                )),
            },
            Err(e) => Err(e),
        };

        self.release_staging(staging, staging_allocation);
        result
    }

    fn staged_buffer_write(&self, data: &[u8], offset: u64, target: vk::Buffer) -> Result<()> {
        let (staging, staging_allocation) = self.allocate_buffer(
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging",
        )?;

        let result = (|| -> Result<()> {
            let mapped = staging_allocation.mapped_ptr().ok_or_else(|| {
                Error::BackendError("Staging buffer is not host-visible".to_string())
            })?;
            unsafe {
                std::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    mapped.as_ptr() as *mut u8,
                    data.len(),
                );
            }

            let cmd = self.begin_one_time_commands(self.transfer_cmd_pool)?;
            unsafe {
                let region = vk::BufferCopy::default()
                    .src_offset(0)
                    .dst_offset(offset)
                    .size(data.len() as u64);
                self.device.cmd_copy_buffer(cmd, staging, target, &[region]);
            }
            self.end_one_time_commands(cmd, self.transfer_cmd_pool, self.transfer_queue)
        })();

        self.release_staging(staging, staging_allocation);
        result
    }

    /// Upload pixel data into an image, leaving it shader-readable
    ///
    /// Performs the layout transition sequence undefined -> transfer-dst ->
    /// shader-read-only around the staging copy.
    pub fn fill_texture(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        image: vk::Image,
    ) -> Result<()> {
        let (staging, staging_allocation) = self.allocate_buffer(
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging",
        )?;

        let result = (|| -> Result<()> {
            let mapped = staging_allocation.mapped_ptr().ok_or_else(|| {
                Error::BackendError("Staging buffer is not host-visible".to_string())
            })?;
            unsafe {
                std::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    mapped.as_ptr() as *mut u8,
                    data.len(),
                );
            }

            let cmd = self.begin_one_time_commands(self.transfer_cmd_pool)?;
            self.transition_image_layout(
                cmd,
                image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageAspectFlags::COLOR,
            );
            unsafe {
                let region = vk::BufferImageCopy::default()
                    .buffer_offset(0)
                    .buffer_row_length(0)
                    .buffer_image_height(0)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                    .image_extent(vk::Extent3D {
                        width,
                        height,
                        depth: 1,
                    });
                self.device.cmd_copy_buffer_to_image(
                    cmd,
                    staging,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }
            self.transition_image_layout(
                cmd,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::ImageAspectFlags::COLOR,
            );
            self.end_one_time_commands(cmd, self.transfer_cmd_pool, self.transfer_queue)
        })();

        self.release_staging(staging, staging_allocation);
        result
    }

    /// Move an uninitialized image straight to the shader-readable layout
    pub fn init_image_layout(&self, image: vk::Image) -> Result<()> {
        let cmd = self.begin_one_time_commands(self.transfer_cmd_pool)?;
        self.transition_image_layout(
            cmd,
            image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageAspectFlags::COLOR,
        );
        self.end_one_time_commands(cmd, self.transfer_cmd_pool, self.transfer_queue)
    }

    /// Record a layout transition barrier
    ///
    /// Access masks come from the per-layout lookup; the barrier waits on the
    /// source layout's stages and blocks the destination layout's stages.
    pub fn transition_image_layout(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        aspect: vk::ImageAspectFlags,
    ) {
        let src_access = layout_access_flags(old_layout);
        let dst_access = layout_access_flags(new_layout);

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                access_stage_flags(src_access),
                access_stage_flags(dst_access),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Allocate and begin a one-time command buffer from the given pool
    pub fn begin_one_time_commands(&self, pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let cmd = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    Error::BackendError(format!("Failed to allocate command buffer: {:?}", e))
                })?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            if let Err(e) = self.device.begin_command_buffer(cmd, &begin_info) {
                self.device.free_command_buffers(pool, &[cmd]);
                return Err(Error::BackendError(format!(
                    "Failed to begin command buffer: {:?}",
                    e
                )));
            }

            Ok(cmd)
        }
    }

    /// End, submit and wait out a one-time command buffer
    ///
    /// Blocks the calling thread on a fence until the submitted work
    /// completes, then releases the command buffer.
    pub fn end_one_time_commands(
        &self,
        cmd: vk::CommandBuffer,
        pool: vk::CommandPool,
        queue: vk::Queue,
    ) -> Result<()> {
        unsafe {
            if let Err(e) = self.device.end_command_buffer(cmd) {
                self.device.free_command_buffers(pool, &[cmd]);
                return Err(Error::BackendError(format!(
                    "Failed to end command buffer: {:?}",
                    e
                )));
            }

            let fence = match self
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
            {
                Ok(fence) => fence,
                Err(e) => {
                    self.device.free_command_buffers(pool, &[cmd]);
                    return Err(Error::BackendError(format!(
                        "Failed to create fence: {:?}",
                        e
                    )));
                }
            };

            let cmds = [cmd];
            let submit_info = vk::SubmitInfo::default().command_buffers(&cmds);

            let result = self
                .device
                .queue_submit(queue, &[submit_info], fence)
                .map_err(|e| Error::BackendError(format!("Failed to submit queue: {:?}", e)))
                .and_then(|_| {
                    self.device
                        .wait_for_fences(&[fence], true, GPU_WAIT_TIMEOUT_NS)
                        .map_err(|e| match e {
                            vk::Result::TIMEOUT => Error::SyncTimeout(
                                "Timed out waiting for one-time command completion".to_string(),
                            ),
                            other => Error::BackendError(format!(
                                "Failed to wait for fence: {:?}",
                                other
                            )),
                        })
                });

            self.device.destroy_fence(fence, None);
            self.device.free_command_buffers(pool, &[cmd]);

            result
        }
    }

    /// Find a depth format the device supports for optimal-tiling attachments
    pub fn find_depth_format(&self) -> Result<vk::Format> {
        let candidates = [
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ];
        for format in candidates {
            let props = unsafe {
                self.instance
                    .get_physical_device_format_properties(self.physical_device, format)
            };
            if props
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            {
                return Ok(format);
            }
        }
        Err(Error::UnsupportedFormat(
            "no depth format with optimal-tiling attachment support".to_string(),
        ))
    }

    /// Create a depth buffer sized to a render target
    pub fn create_depth_buffer(&self, width: u32, height: u32) -> Result<DepthBufferEntry> {
        let format = self.find_depth_format()?;

        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let (image, allocation) = self.allocate_image(&create_info, "depth buffer")?;

        let mut aspect = vk::ImageAspectFlags::DEPTH;
        if format != vk::Format::D32_SFLOAT {
            aspect |= vk::ImageAspectFlags::STENCIL;
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = match unsafe { self.device.create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    self.allocator.lock().unwrap().free(allocation).ok();
                    self.device.destroy_image(image, None);
                }
                return Err(Error::BackendError(format!(
                    "Failed to create depth image view: {:?}",
                    e
                )));
            }
        };

        Ok(DepthBufferEntry {
            image,
            view,
            allocation: Some(allocation),
            format,
        })
    }

    fn release_staging(&self, buffer: vk::Buffer, allocation: Allocation) {
        self.allocator.lock().unwrap().free(allocation).ok();
        unsafe {
            self.device.destroy_buffer(buffer, None);
        }
    }
}
