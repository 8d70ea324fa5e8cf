/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// This is the main Vulkan backend. It owns the handle registries for every
/// resource kind, the single command-buffer recording session, and all core
/// Vulkan objects, and it delegates construction to the memory, pipeline and
/// swapchain modules.

use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::HasDisplayHandle;
use rustc_hash::FxHashMap;

use nebula_gfx::{gfx_bail, gfx_info, gfx_violation};
use nebula_gfx::{
    BindingResource, Buffer, BufferInfo, BufferUsage, CommandBuffer, CommandBufferInfo,
    DeviceConfig, Error, GraphicsDevice, InputSet, InputSetInfo, Key, RenderPass, RenderPassInfo,
    RenderTarget, Result, Shader, ShaderInfo, Texture, TextureInfo, Window, WindowInfo,
    WindowSource,
};

use crate::recording::RecordingState;
use crate::registry::Registry;
use crate::vulkan_context::{GpuContext, GPU_WAIT_TIMEOUT_NS};
use crate::vulkan_format::{
    buffer_usage_to_vk, format_to_vk, repeat_mode_to_vk, sampler_mode_to_vk,
};
use crate::vulkan_resources::{
    BufferEntry, CommandBufferEntry, DepthBufferEntry, InputSetEntry, RenderPassEntry,
    ShaderEntry, TextureEntry, WindowEntry,
};

const SOURCE: &str = "nebula::vulkan";

/// The single open recording session
struct CurrentRecording {
    cmd: vk::CommandBuffer,
    state: RecordingState,
}

/// Vulkan graphics device implementation
pub struct VulkanGraphicsDevice {
    pub(crate) ctx: GpuContext,

    // Bookkeeping: one registry per entity kind
    pub(crate) shaders: Registry<Shader, ShaderEntry>,
    pub(crate) buffers: Registry<Buffer, BufferEntry>,
    pub(crate) textures: Registry<Texture, TextureEntry>,
    pub(crate) windows: Registry<Window, WindowEntry>,
    pub(crate) input_sets: Registry<InputSet, InputSetEntry>,
    pub(crate) render_passes: Registry<RenderPass, RenderPassEntry>,
    pub(crate) command_buffers: Registry<CommandBuffer, CommandBufferEntry>,

    // Depth buffers paired 1:1 with their render target
    pub(crate) texture_depth_buffers: FxHashMap<Texture, DepthBufferEntry>,
    pub(crate) window_depth_buffers: FxHashMap<Window, DepthBufferEntry>,

    recording: Option<CurrentRecording>,
}

impl VulkanGraphicsDevice {
    /// Create a new Vulkan graphics device
    ///
    /// # Arguments
    ///
    /// * `config` - Device configuration
    /// * `display` - Display the device should be able to present to;
    ///   `None` creates a headless device that cannot create windows
    pub fn new(config: DeviceConfig, display: Option<&dyn HasDisplayHandle>) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| Error::InitializationFailed(format!("Failed to load Vulkan: {}", e)))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| Error::InitializationFailed(format!("Invalid app name: {}", e)))?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(
                    0,
                    config.app_version.0,
                    config.app_version.1,
                    config.app_version.2,
                ))
                .engine_name(c"NebulaGFX")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_1);

            let presentable = display.is_some();
            let mut extension_names: Vec<*const std::ffi::c_char> = Vec::new();
            if let Some(display) = display {
                let display_handle = display.display_handle().map_err(|e| {
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
                extension_names.extend_from_slice(
                    ash_window::enumerate_required_extensions(display_handle.as_raw()).map_err(
                        |e| {
                            Error::InitializationFailed(format!(
                                "Failed to get required extensions: {:?}",
                                e
                            ))
                        },
                    )?,
                );
            }

            let validation = cfg!(feature = "vulkan-validation") && config.enable_validation;
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names: Vec<*const std::ffi::c_char> = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                Vec::new()
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if validation {
                Some(crate::debug::create_debug_messenger(&entry, &instance)?)
            } else {
                None
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let debug_messenger = None;

            // Pick a physical device, preferring a discrete GPU
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                Error::InitializationFailed(format!(
                    "Failed to enumerate physical devices: {:?}",
                    e
                ))
            })?;

            let physical_device = physical_devices
                .iter()
                .copied()
                .find(|&pd| {
                    instance.get_physical_device_properties(pd).device_type
                        == vk::PhysicalDeviceType::DISCRETE_GPU
                })
                .or_else(|| physical_devices.first().copied())
                .ok_or_else(|| {
                    Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
                })?;

            // Queue families: graphics, plus a dedicated transfer family when
            // the hardware has one
            let queue_families =
                instance.get_physical_device_queue_family_properties(physical_device);

            let graphics_family = queue_families
                .iter()
                .enumerate()
                .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|(i, _)| i as u32)
                .ok_or_else(|| {
                    Error::InitializationFailed("No graphics queue family found".to_string())
                })?;

            let transfer_family = queue_families
                .iter()
                .enumerate()
                .find(|(_, qf)| {
                    qf.queue_flags.contains(vk::QueueFlags::TRANSFER)
                        && !qf.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                })
                .map(|(i, _)| i as u32)
                .unwrap_or(graphics_family);

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family)
                .queue_priorities(&queue_priorities)];
            if transfer_family != graphics_family {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(transfer_family)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = if presentable {
                vec![ash::khr::swapchain::NAME.as_ptr()]
            } else {
                Vec::new()
            };

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family, 0);
            let transfer_queue = device.get_device_queue(transfer_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let graphics_cmd_pool = device
                .create_command_pool(
                    &vk::CommandPoolCreateInfo::default()
                        .queue_family_index(graphics_family)
                        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER),
                    None,
                )
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;

            let transfer_cmd_pool = device
                .create_command_pool(
                    &vk::CommandPoolCreateInfo::default()
                        .queue_family_index(transfer_family)
                        .flags(
                            vk::CommandPoolCreateFlags::TRANSIENT
                                | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                        ),
                    None,
                )
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;

            let (surface_loader, swapchain_loader) = if presentable {
                (
                    Some(ash::khr::surface::Instance::new(&entry, &instance)),
                    Some(ash::khr::swapchain::Device::new(&instance, &device)),
                )
            } else {
                (None, None)
            };

            gfx_info!(
                SOURCE,
                "Vulkan device initialized (graphics family {}, transfer family {}, presentable: {})",
                graphics_family,
                transfer_family,
                presentable
            );

            Ok(Self {
                ctx: GpuContext {
                    entry,
                    instance,
                    physical_device,
                    device,
                    graphics_queue,
                    graphics_queue_family: graphics_family,
                    transfer_queue,
                    transfer_queue_family: transfer_family,
                    allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
                    graphics_cmd_pool,
                    transfer_cmd_pool,
                    surface_loader,
                    swapchain_loader,
                    debug_messenger,
                },
                shaders: Registry::new("Shader"),
                buffers: Registry::new("Buffer"),
                textures: Registry::new("Texture"),
                windows: Registry::new("Window"),
                input_sets: Registry::new("InputSet"),
                render_passes: Registry::new("RenderPass"),
                command_buffers: Registry::new("CommandBuffer"),
                texture_depth_buffers: FxHashMap::default(),
                window_depth_buffers: FxHashMap::default(),
                recording: None,
            })
        }
    }

    /// Read back the current contents of a buffer
    ///
    /// Readback utility for tooling and tests; device-local buffers go
    /// through a blocking round-trip transfer.
    pub fn read_buffer(&self, buffer: Buffer) -> Result<Vec<u8>> {
        let entry = self.buffers.get(buffer)?;
        self.ctx.read_buffer_bytes(entry)
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_shader(&mut self, info: &ShaderInfo) -> Result<Shader> {
        if info.src.is_empty() || info.src.len() % 4 != 0 {
            return Err(Error::BackendError(
                "Shader binary must be a non-empty multiple of 4 bytes".to_string(),
            ));
        }

        // Re-align the bytes; SPIR-V is consumed as 32-bit words
        let code: Vec<u32> = info
            .src
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe { self.ctx.device.create_shader_module(&create_info, None) }
            .map_err(|e| {
                Error::BackendError(format!("Failed to create shader module: {:?}", e))
            })?;

        Ok(self.shaders.insert(ShaderEntry {
            module,
            ty: info.ty,
        }))
    }

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Buffer> {
        if info.usage.is_empty() {
            gfx_bail!(SOURCE, "create_buffer: empty usage flags");
        }
        if info.data.is_empty() {
            gfx_bail!(SOURCE, "create_buffer: empty initial data");
        }

        // Uniform buffers live in host-visible memory for cheap re-upload;
        // vertex/index data goes device-local through the staging path.
        let location = if info.usage.contains(BufferUsage::UNIFORM) {
            MemoryLocation::CpuToGpu
        } else {
            MemoryLocation::GpuOnly
        };

        let usage = buffer_usage_to_vk(info.usage)
            | vk::BufferUsageFlags::TRANSFER_DST
            | vk::BufferUsageFlags::TRANSFER_SRC;

        let size = info.data.len() as u64;
        let (buffer, allocation) = self.ctx.allocate_buffer(size, usage, location, "buffer")?;

        let entry = BufferEntry {
            buffer,
            allocation: Some(allocation),
            size,
            usage: info.usage,
        };

        if let Err(e) = self.ctx.fill_buffer(&info.data, 0, &entry) {
            self.ctx.destroy_buffer_entry(entry);
            return Err(e);
        }

        Ok(self.buffers.insert(entry))
    }

    fn create_texture(&mut self, info: &TextureInfo) -> Result<Texture> {
        if info.width == 0 || info.height == 0 {
            gfx_bail!(SOURCE, "create_texture: zero-sized texture");
        }

        let expected =
            info.width as usize * info.height as usize * info.format.bytes_per_pixel() as usize;
        if !info.data.is_empty() && info.data.len() != expected {
            gfx_bail!(
                SOURCE,
                "create_texture: data size {} does not match {}x{} {:?} ({} bytes)",
                info.data.len(),
                info.width,
                info.height,
                info.format,
                expected
            );
        }

        let format = format_to_vk(info.format);
        let props = unsafe {
            self.ctx
                .instance
                .get_physical_device_format_properties(self.ctx.physical_device, format)
        };
        let required =
            vk::FormatFeatureFlags::SAMPLED_IMAGE | vk::FormatFeatureFlags::TRANSFER_DST;
        if !props.optimal_tiling_features.contains(required) {
            return Err(Error::UnsupportedFormat(format!(
                "{:?} is not supported for sampled textures on this device",
                info.format
            )));
        }

        let mut usage = vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST;
        if props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::COLOR_ATTACHMENT)
        {
            usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }

        let families = self.ctx.sharing_families();
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: info.width,
                height: info.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image_info = if families.is_empty() {
            image_info.sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            image_info
                .sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        };

        let (image, allocation) = self.ctx.allocate_image(&image_info, "texture")?;

        let view_info = vk::ImageViewCreateInfo::default()
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

        let view = match unsafe { self.ctx.device.create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                self.ctx.allocator.lock().unwrap().free(allocation).ok();
                unsafe { self.ctx.device.destroy_image(image, None) };
                return Err(Error::BackendError(format!(
                    "Failed to create image view: {:?}",
                    e
                )));
            }
        };

        let filter = sampler_mode_to_vk(info.sampler_mode);
        let address_mode = repeat_mode_to_vk(info.repeat_mode);
        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .anisotropy_enable(false)
            .unnormalized_coordinates(false);

        let sampler = match unsafe { self.ctx.device.create_sampler(&sampler_info, None) } {
            Ok(sampler) => sampler,
            Err(e) => {
                unsafe { self.ctx.device.destroy_image_view(view, None) };
                self.ctx.allocator.lock().unwrap().free(allocation).ok();
                unsafe { self.ctx.device.destroy_image(image, None) };
                return Err(Error::BackendError(format!(
                    "Failed to create sampler: {:?}",
                    e
                )));
            }
        };

        let entry = TextureEntry {
            image,
            view,
            sampler,
            allocation: Some(allocation),
            format,
            extent: vk::Extent2D {
                width: info.width,
                height: info.height,
            },
        };

        let upload = if info.data.is_empty() {
            self.ctx.init_image_layout(image)
        } else {
            self.ctx
                .fill_texture(&info.data, info.width, info.height, image)
        };
        if let Err(e) = upload {
            self.ctx.destroy_texture_entry(entry);
            return Err(e);
        }

        Ok(self.textures.insert(entry))
    }

    fn create_window(
        &mut self,
        info: &WindowInfo,
        source: Arc<dyn WindowSource>,
    ) -> Result<Window> {
        let entry = self.ctx.build_window_entry(info, source)?;
        Ok(self.windows.insert(entry))
    }

    fn create_input_set(&mut self, info: &InputSetInfo) -> Result<InputSet> {
        let pass = self.render_passes.get(info.target_render_pass)?;
        if info.set_index as usize >= pass.set_layouts.len() {
            gfx_bail!(
                SOURCE,
                "create_input_set: set index {} out of range (layout has {} sets)",
                info.set_index,
                pass.set_layouts.len()
            );
        }
        let set_layout = pass.set_layouts[info.set_index as usize];

        // Resolve bound resources up front so stale handles fail here
        enum Resolved {
            Buffer(vk::Buffer, u64),
            Image(vk::ImageView, vk::Sampler),
        }
        let mut resolved = Vec::with_capacity(info.bindings.len());
        for binding in &info.bindings {
            let resource = match binding.resource {
                BindingResource::Buffer(buffer) => {
                    let entry = self.buffers.get(buffer)?;
                    Resolved::Buffer(entry.buffer, entry.size)
                }
                BindingResource::Texture(texture) => {
                    let entry = self.textures.get(texture)?;
                    Resolved::Image(entry.view, entry.sampler)
                }
            };
            resolved.push((binding.slot, binding.array_element, resource));
        }

        let uniform_count = resolved
            .iter()
            .filter(|(_, _, r)| matches!(r, Resolved::Buffer(..)))
            .count() as u32;
        let sampler_count = resolved.len() as u32 - uniform_count;

        let mut pool_sizes = Vec::new();
        if uniform_count > 0 {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: uniform_count,
            });
        }
        if sampler_count > 0 {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: sampler_count,
            });
        }
        if pool_sizes.is_empty() {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1,
            });
        }

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        let pool = unsafe { self.ctx.device.create_descriptor_pool(&pool_info, None) }
            .map_err(|e| {
                Error::BackendError(format!("Failed to create descriptor pool: {:?}", e))
            })?;

        let set_layouts = [set_layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        let descriptor_set = match unsafe { self.ctx.device.allocate_descriptor_sets(&alloc_info) }
        {
            Ok(sets) => sets[0],
            Err(e) => {
                unsafe { self.ctx.device.destroy_descriptor_pool(pool, None) };
                return Err(Error::BackendError(format!(
                    "Failed to allocate descriptor set: {:?}",
                    e
                )));
            }
        };

        // Descriptor writes reference the info arrays by index, so build the
        // arrays first and keep them alive past the update call.
        let buffer_infos: Vec<vk::DescriptorBufferInfo> = resolved
            .iter()
            .filter_map(|(_, _, r)| match r {
                Resolved::Buffer(buffer, size) => Some(
                    vk::DescriptorBufferInfo::default()
                        .buffer(*buffer)
                        .offset(0)
                        .range(*size),
                ),
                Resolved::Image(..) => None,
            })
            .collect();
        let image_infos: Vec<vk::DescriptorImageInfo> = resolved
            .iter()
            .filter_map(|(_, _, r)| match r {
                Resolved::Image(view, sampler) => Some(
                    vk::DescriptorImageInfo::default()
                        .sampler(*sampler)
                        .image_view(*view)
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                ),
                Resolved::Buffer(..) => None,
            })
            .collect();

        let mut writes = Vec::with_capacity(resolved.len());
        let mut buffer_index = 0;
        let mut image_index = 0;
        for (slot, array_element, resource) in &resolved {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(*slot)
                .dst_array_element(*array_element);
            match resource {
                Resolved::Buffer(..) => {
                    writes.push(
                        write
                            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                            .buffer_info(std::slice::from_ref(&buffer_infos[buffer_index])),
                    );
                    buffer_index += 1;
                }
                Resolved::Image(..) => {
                    writes.push(
                        write
                            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                            .image_info(std::slice::from_ref(&image_infos[image_index])),
                    );
                    image_index += 1;
                }
            }
        }

        unsafe { self.ctx.device.update_descriptor_sets(&writes, &[]) };

        Ok(self.input_sets.insert(InputSetEntry {
            pool,
            descriptor_set,
            target_render_pass: info.target_render_pass,
            set_index: info.set_index,
        }))
    }

    fn create_render_pass(&mut self, info: &RenderPassInfo) -> Result<RenderPass> {
        let entry = self.build_render_pass_entry(info)?;
        Ok(self.render_passes.insert(entry))
    }

    fn begin_command_buffer(&mut self, _info: &CommandBufferInfo) -> Result<()> {
        if self.recording.is_some() {
            gfx_bail!(SOURCE, "begin_command_buffer: a recording is already open");
        }

        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.ctx.graphics_cmd_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let cmd = self
                .ctx
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    Error::BackendError(format!("Failed to allocate command buffer: {:?}", e))
                })?[0];

            // No one-time flag: a finalized command buffer is replayable
            let begin_info = vk::CommandBufferBeginInfo::default();
            if let Err(e) = self.ctx.device.begin_command_buffer(cmd, &begin_info) {
                self.ctx
                    .device
                    .free_command_buffers(self.ctx.graphics_cmd_pool, &[cmd]);
                return Err(Error::BackendError(format!(
                    "Failed to begin command buffer: {:?}",
                    e
                )));
            }

            self.recording = Some(CurrentRecording {
                cmd,
                state: RecordingState::new(),
            });
        }

        Ok(())
    }

    fn set_render_pass(&mut self, render_pass: RenderPass, framebuffer_index: u32) -> Result<()> {
        let Some(recording) = &self.recording else {
            gfx_bail!(SOURCE, "set_render_pass: no open recording");
        };
        let cmd = recording.cmd;
        let had_pass = recording.state.render_pass().is_some();

        let entry = self.render_passes.get(render_pass)?;
        if framebuffer_index as usize >= entry.framebuffers.len() {
            gfx_bail!(
                SOURCE,
                "set_render_pass: framebuffer index {} out of range (count: {})",
                framebuffer_index,
                entry.framebuffers.len()
            );
        }
        let framebuffer = entry.framebuffers[framebuffer_index as usize];
        let vk_render_pass = entry.render_pass;
        let pipeline = entry.pipeline;
        let extent = entry.extent;
        let clear_values = entry.clear_values.clone();

        unsafe {
            // Switching passes mid-recording ends the previous native scope
            if had_pass {
                self.ctx.device.cmd_end_render_pass(cmd);
            }

            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(vk_render_pass)
                .framebuffer(framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);

            self.ctx
                .device
                .cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
            self.ctx
                .device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }

        if let Some(recording) = self.recording.as_mut() {
            recording.state.bind_render_pass(render_pass);
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: Buffer) -> Result<()> {
        let Some(recording) = &self.recording else {
            gfx_bail!(SOURCE, "bind_vertex_buffer: no open recording");
        };
        recording.state.require_render_pass("bind_vertex_buffer")?;
        let cmd = recording.cmd;

        let vk_buffer = self.buffers.get(buffer)?.buffer;
        unsafe {
            self.ctx
                .device
                .cmd_bind_vertex_buffers(cmd, 0, &[vk_buffer], &[0]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: Buffer) -> Result<()> {
        let Some(recording) = &self.recording else {
            gfx_bail!(SOURCE, "bind_index_buffer: no open recording");
        };
        recording.state.require_render_pass("bind_index_buffer")?;
        let cmd = recording.cmd;

        let vk_buffer = self.buffers.get(buffer)?.buffer;
        unsafe {
            self.ctx
                .device
                .cmd_bind_index_buffer(cmd, vk_buffer, 0, vk::IndexType::UINT32);
        }

        if let Some(recording) = self.recording.as_mut() {
            recording.state.note_index_buffer();
        }
        Ok(())
    }

    fn bind_input_set(&mut self, input_set: InputSet) -> Result<()> {
        let set_entry = self.input_sets.get(input_set)?;
        let descriptor_set = set_entry.descriptor_set;
        let target = set_entry.target_render_pass;
        let set_index = set_entry.set_index;

        let Some(recording) = &self.recording else {
            gfx_bail!(SOURCE, "bind_input_set: no open recording");
        };
        recording.state.check_input_set_pairing(target)?;
        let cmd = recording.cmd;

        let pipeline_layout = self.render_passes.get(target)?.pipeline_layout;
        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline_layout,
                set_index,
                &[descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        let Some(recording) = &self.recording else {
            gfx_bail!(SOURCE, "draw: no open recording");
        };
        recording.state.require_render_pass("draw")?;
        unsafe {
            self.ctx
                .device
                .cmd_draw(recording.cmd, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        vertex_offset: u32,
    ) -> Result<()> {
        let Some(recording) = &self.recording else {
            gfx_bail!(SOURCE, "draw_indexed: no open recording");
        };
        recording.state.require_render_pass("draw_indexed")?;
        recording.state.require_index_buffer("draw_indexed")?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                recording.cmd,
                index_count,
                1,
                first_index,
                vertex_offset as i32,
                0,
            );
        }
        Ok(())
    }

    fn end_command_buffer(&mut self) -> Result<CommandBuffer> {
        let Some(recording) = self.recording.take() else {
            gfx_bail!(SOURCE, "end_command_buffer: no open recording");
        };

        unsafe {
            if recording.state.render_pass().is_some() {
                self.ctx.device.cmd_end_render_pass(recording.cmd);
            }
            if let Err(e) = self.ctx.device.end_command_buffer(recording.cmd) {
                self.ctx
                    .device
                    .free_command_buffers(self.ctx.graphics_cmd_pool, &[recording.cmd]);
                return Err(Error::BackendError(format!(
                    "Failed to end command buffer: {:?}",
                    e
                )));
            }
        }

        Ok(self.command_buffers.insert(CommandBufferEntry {
            cmd: recording.cmd,
            render_pass: recording.state.render_pass(),
        }))
    }

    fn execute(&mut self, command_buffer: CommandBuffer) -> Result<()> {
        let entry = self.command_buffers.get(command_buffer)?;
        let cmd = entry.cmd;
        let target = match entry.render_pass {
            Some(render_pass) => Some(self.render_passes.get(render_pass)?.target),
            None => None,
        };

        match target {
            Some(RenderTarget::Window(window)) => {
                // Window rendering is paced by the window's frame sync: wait
                // the acquire semaphore, signal the image's render semaphore
                // and the frame fence that `next_frame` waits on.
                let win = self.windows.get(window)?;
                let Some(image) = win.acquired_image else {
                    gfx_bail!(
                        SOURCE,
                        "execute: no back-buffer acquired for the target window"
                    );
                };
                let wait_semaphores = [win.image_available[win.current_frame]];
                let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
                let signal_semaphores = [win.render_finished[image as usize]];
                let fence = win.in_flight[win.current_frame];
                let cmds = [cmd];

                let submit_info = vk::SubmitInfo::default()
                    .wait_semaphores(&wait_semaphores)
                    .wait_dst_stage_mask(&wait_stages)
                    .command_buffers(&cmds)
                    .signal_semaphores(&signal_semaphores);

                unsafe {
                    self.ctx
                        .device
                        .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                        .map_err(|e| {
                            Error::BackendError(format!("Failed to submit queue: {:?}", e))
                        })?;
                }
            }
            _ => {
                let cmds = [cmd];
                let submit_info = vk::SubmitInfo::default().command_buffers(&cmds);
                unsafe {
                    self.ctx
                        .device
                        .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                        .map_err(|e| {
                            Error::BackendError(format!("Failed to submit queue: {:?}", e))
                        })?;
                }
            }
        }

        Ok(())
    }

    fn update_buffer(&mut self, buffer: Buffer, data: &[u8], offset: u64) -> Result<()> {
        let entry = self.buffers.get(buffer)?;
        let end = offset + data.len() as u64;
        if end > entry.size {
            return Err(gfx_violation!(
                SOURCE,
                "update_buffer: range [{}, {}) exceeds buffer size {}",
                offset,
                end,
                entry.size
            ));
        }
        self.ctx.fill_buffer(data, offset, entry)
    }

    fn backbuffer_count(&self, window: Window) -> Result<u32> {
        Ok(self.windows.get(window)?.images.len() as u32)
    }

    fn next_frame(&mut self, window: Window) -> Result<u32> {
        let Some(swapchain_loader) = self.ctx.swapchain_loader.clone() else {
            return Err(Error::InitializationFailed(
                "device was created without presentation support".to_string(),
            ));
        };

        let entry = self.windows.get_mut(window)?;
        let frame = entry.current_frame;

        unsafe {
            // Wait out the frame slot's previous submission before reusing
            // its synchronization objects
            self.ctx
                .device
                .wait_for_fences(&[entry.in_flight[frame]], true, GPU_WAIT_TIMEOUT_NS)
                .map_err(|e| match e {
                    vk::Result::TIMEOUT => Error::SyncTimeout(
                        "Timed out waiting for the previous frame".to_string(),
                    ),
                    other => Error::BackendError(format!("Failed to wait for fence: {:?}", other)),
                })?;
            self.ctx
                .device
                .reset_fences(&[entry.in_flight[frame]])
                .map_err(|e| Error::BackendError(format!("Failed to reset fence: {:?}", e)))?;

            let (image_index, _suboptimal) = swapchain_loader
                .acquire_next_image(
                    entry.swapchain,
                    u64::MAX,
                    entry.image_available[frame],
                    vk::Fence::null(),
                )
                .map_err(|e| {
                    Error::BackendError(format!("Failed to acquire next image: {:?}", e))
                })?;

            entry.acquired_image = Some(image_index);
            Ok(image_index)
        }
    }

    fn present(&mut self, window: Window) -> Result<()> {
        let Some(swapchain_loader) = self.ctx.swapchain_loader.clone() else {
            return Err(Error::InitializationFailed(
                "device was created without presentation support".to_string(),
            ));
        };

        let entry = self.windows.get_mut(window)?;
        let Some(image) = entry.acquired_image.take() else {
            gfx_bail!(SOURCE, "present: no back-buffer acquired via next_frame");
        };

        let wait_semaphores = [entry.render_finished[image as usize]];
        let swapchains = [entry.swapchain];
        let image_indices = [image];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result =
            unsafe { swapchain_loader.queue_present(self.ctx.graphics_queue, &present_info) };

        // Advance the chain regardless; the next acquire paces against it
        entry.current_frame = (entry.current_frame + 1) % entry.in_flight.len();

        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(Error::BackendError(format!("Failed to present: {:?}", e))),
        }
    }

    fn set_window_title(&mut self, window: Window, title: &str) -> Result<()> {
        self.windows.get(window)?.source.set_title(title);
        Ok(())
    }

    fn window_should_close(&self, window: Window) -> Result<bool> {
        Ok(self.windows.get(window)?.source.should_close())
    }

    fn key_down(&self, window: Window, key: Key) -> Result<bool> {
        Ok(self.windows.get(window)?.source.key_down(key))
    }

    fn mouse_position(&self, window: Window) -> Result<(i32, i32)> {
        Ok(self.windows.get(window)?.source.mouse_position())
    }

    fn free_shader(&mut self, shader: Shader) -> Result<()> {
        let entry = self.shaders.remove(shader)?;
        self.ctx.destroy_shader_entry(entry);
        Ok(())
    }

    fn free_buffer(&mut self, buffer: Buffer) -> Result<()> {
        let entry = self.buffers.remove(buffer)?;
        self.ctx.wait_idle()?;
        self.ctx.destroy_buffer_entry(entry);
        Ok(())
    }

    fn free_texture(&mut self, texture: Texture) -> Result<()> {
        let entry = self.textures.remove(texture)?;
        self.ctx.wait_idle()?;
        self.ctx.destroy_texture_entry(entry);
        if let Some(depth_buffer) = self.texture_depth_buffers.remove(&texture) {
            self.ctx.destroy_depth_buffer_entry(depth_buffer);
        }
        Ok(())
    }

    fn free_window(&mut self, window: Window) -> Result<()> {
        let entry = self.windows.remove(window)?;
        self.ctx.wait_idle()?;
        self.ctx.destroy_window_entry(entry);
        if let Some(depth_buffer) = self.window_depth_buffers.remove(&window) {
            self.ctx.destroy_depth_buffer_entry(depth_buffer);
        }
        Ok(())
    }

    fn free_input_set(&mut self, input_set: InputSet) -> Result<()> {
        let entry = self.input_sets.remove(input_set)?;
        self.ctx.wait_idle()?;
        self.ctx.destroy_input_set_entry(entry);
        Ok(())
    }

    fn free_render_pass(&mut self, render_pass: RenderPass) -> Result<()> {
        let entry = self.render_passes.remove(render_pass)?;
        self.ctx.wait_idle()?;
        self.ctx.destroy_render_pass_entry(entry);
        Ok(())
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBuffer) -> Result<()> {
        let entry = self.command_buffers.remove(command_buffer)?;
        self.ctx.wait_idle()?;
        self.ctx.destroy_command_buffer_entry(entry);
        Ok(())
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for the GPU to finish everything still referencing the
            // resources about to be destroyed
            self.ctx.device.device_wait_idle().ok();

            // Abandon any open recording
            if let Some(recording) = self.recording.take() {
                self.ctx
                    .device
                    .free_command_buffers(self.ctx.graphics_cmd_pool, &[recording.cmd]);
            }

            // Drain registries in dependency order
            for (_, entry) in self.command_buffers.take_all() {
                self.ctx.destroy_command_buffer_entry(entry);
            }
            for (_, entry) in self.input_sets.take_all() {
                self.ctx.destroy_input_set_entry(entry);
            }
            for (_, entry) in self.render_passes.take_all() {
                self.ctx.destroy_render_pass_entry(entry);
            }
            for (_, entry) in self.windows.take_all() {
                self.ctx.destroy_window_entry(entry);
            }
            for (_, entry) in self.texture_depth_buffers.drain() {
                self.ctx.destroy_depth_buffer_entry(entry);
            }
            for (_, entry) in self.window_depth_buffers.drain() {
                self.ctx.destroy_depth_buffer_entry(entry);
            }
            for (_, entry) in self.textures.take_all() {
                self.ctx.destroy_texture_entry(entry);
            }
            for (_, entry) in self.buffers.take_all() {
                self.ctx.destroy_buffer_entry(entry);
            }
            for (_, entry) in self.shaders.take_all() {
                self.ctx.destroy_shader_entry(entry);
            }

            self.ctx
                .device
                .destroy_command_pool(self.ctx.graphics_cmd_pool, None);
            self.ctx
                .device
                .destroy_command_pool(self.ctx.transfer_cmd_pool, None);

            // Drop the allocator explicitly before destroying the device so
            // all GPU memory is released while the device is still valid
            ManuallyDrop::drop(&mut self.ctx.allocator);

            self.ctx.device.destroy_device(None);

            if let Some((loader, messenger)) = self.ctx.debug_messenger.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.ctx.instance.destroy_instance(None);
        }
    }
}
