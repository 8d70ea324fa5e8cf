/// Render pass and graphics pipeline construction
///
/// Translates a declarative `RenderPassInfo` into the native objects behind a
/// `RenderPassEntry`: render pass, descriptor set layouts, pipeline layout,
/// graphics pipeline and per-back-buffer framebuffers. Creation either fully
/// succeeds or rolls back every partially constructed native object.

use ash::vk;
use nebula_gfx::gfx_bail;
use nebula_gfx::{
    ClearOperation, CompareOperation, Error, InputLayout, RasterizerConfig, RenderPassInfo,
    RenderTarget, Result, VertexLayout,
};

use crate::vulkan_context::GpuContext;
use crate::vulkan_device::VulkanGraphicsDevice;
use crate::vulkan_format::{
    binding_type_to_vk, blend_factor_to_vk, compare_op_to_vk, cull_mode_to_vk, format_to_vk,
    front_face_to_vk, polygon_mode_to_vk, shader_type_to_vk,
};
use crate::vulkan_resources::RenderPassEntry;

const SOURCE: &str = "nebula::vulkan";

impl GpuContext {
    /// Build a native render pass with one color attachment and an optional
    /// depth attachment
    ///
    /// The load operations derive from the clear policy; a non-cleared
    /// attachment is loaded from its final layout so pass chaining keeps
    /// previous contents.
    pub fn make_render_pass(
        &self,
        color_format: vk::Format,
        clear_ops: ClearOperation,
        final_layout: vk::ImageLayout,
        depth_format: Option<vk::Format>,
    ) -> Result<vk::RenderPass> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(if clear_ops.clears_color() {
                vk::AttachmentLoadOp::CLEAR
            } else {
                vk::AttachmentLoadOp::LOAD
            })
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(if clear_ops.clears_color() {
                vk::ImageLayout::UNDEFINED
            } else {
                final_layout
            })
            .final_layout(final_layout);

        let mut attachments = vec![color_attachment];

        if let Some(depth_format) = depth_format {
            attachments.push(
                vk::AttachmentDescription::default()
                    .format(depth_format)
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(if clear_ops.clears_depth() {
                        vk::AttachmentLoadOp::CLEAR
                    } else {
                        vk::AttachmentLoadOp::LOAD
                    })
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(if clear_ops.clears_depth() {
                        vk::ImageLayout::UNDEFINED
                    } else {
                        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
                    })
                    .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
            );
        }

        let color_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        let depth_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_ref));
        if depth_format.is_some() {
            subpass = subpass.depth_stencil_attachment(&depth_ref);
        }

        let mut stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
        let mut access = vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
        if depth_format.is_some() {
            stages |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
            access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        }

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stages)
            .dst_access_mask(access);

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        unsafe {
            self.device
                .create_render_pass(&create_info, None)
                .map_err(|e| Error::BackendError(format!("Failed to create render pass: {:?}", e)))
        }
    }

    /// Translate an input layout into native descriptor set layouts
    ///
    /// Binding slots are numbered by their position within the set layout.
    pub fn decode_input_layout(
        &self,
        input_layout: &InputLayout,
    ) -> Result<Vec<vk::DescriptorSetLayout>> {
        let mut set_layouts = Vec::with_capacity(input_layout.set_layouts.len());

        for set_layout in &input_layout.set_layouts {
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = set_layout
                .binding_layouts
                .iter()
                .enumerate()
                .map(|(slot, binding)| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(slot as u32)
                        .descriptor_type(binding_type_to_vk(binding.ty))
                        .descriptor_count(binding.count)
                        .stage_flags(vk::ShaderStageFlags::ALL)
                })
                .collect();

            let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

            match unsafe { self.device.create_descriptor_set_layout(&create_info, None) } {
                Ok(layout) => set_layouts.push(layout),
                Err(e) => {
                    self.destroy_set_layouts(&set_layouts);
                    return Err(Error::BackendError(format!(
                        "Failed to create descriptor set layout: {:?}",
                        e
                    )));
                }
            }
        }

        Ok(set_layouts)
    }

    /// Build a pipeline layout compatible with the given set layouts
    pub fn make_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<vk::PipelineLayout> {
        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(set_layouts);
        unsafe {
            self.device
                .create_pipeline_layout(&create_info, None)
                .map_err(|e| {
                    Error::BackendError(format!("Failed to create pipeline layout: {:?}", e))
                })
        }
    }

    /// Link shader stages and fixed-function state into one graphics pipeline
    ///
    /// The viewport is static, sized to the render target; a render pass is
    /// one fixed pipeline configuration.
    pub fn make_graphics_pipeline(
        &self,
        stages: &[(vk::ShaderStageFlags, vk::ShaderModule)],
        vertex_layout: &VertexLayout,
        rasterizer: &RasterizerConfig,
        pipeline_layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        has_depth: bool,
    ) -> Result<vk::Pipeline> {
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = stages
            .iter()
            .map(|&(stage, module)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage)
                    .module(module)
                    .name(c"main")
            })
            .collect();

        // Vertex input state
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> =
            if vertex_layout.vertex_size > 0 {
                vec![vk::VertexInputBindingDescription {
                    binding: 0,
                    stride: vertex_layout.vertex_size,
                    input_rate: vk::VertexInputRate::VERTEX,
                }]
            } else {
                Vec::new()
            };

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = vertex_layout
            .attributes
            .iter()
            .enumerate()
            .map(|(location, attribute)| vk::VertexInputAttributeDescription {
                location: location as u32,
                binding: 0,
                format: format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        // Input assembly state
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Static viewport sized to the target
        let viewports = [vk::Viewport::default()
            .x(0.0)
            .y(0.0)
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0)];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        // Rasterization state
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(rasterizer.polygon_mode))
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(rasterizer.cull_mode))
            .front_face(front_face_to_vk(rasterizer.front_face))
            .depth_bias_enable(false);

        // Multisample state
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        // Depth state; testing is off when the comparison is Ignore
        let depth_test = rasterizer.depth_compare != CompareOperation::Ignore;
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(depth_test)
            .depth_write_enable(depth_test)
            .depth_compare_op(compare_op_to_vk(rasterizer.depth_compare))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        // Color blend state
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(rasterizer.blend_enabled)
            .src_color_blend_factor(blend_factor_to_vk(rasterizer.src_blend))
            .dst_color_blend_factor(blend_factor_to_vk(rasterizer.dst_blend))
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD);

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let mut pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .layout(pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);
        if has_depth {
            pipeline_create_info = pipeline_create_info.depth_stencil_state(&depth_stencil_state);
        }

        let pipelines = unsafe {
            self.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
                .map_err(|e| {
                    Error::BackendError(format!("Failed to create graphics pipeline: {:?}", e.1))
                })?
        };

        Ok(pipelines[0])
    }

    pub fn destroy_set_layouts(&self, set_layouts: &[vk::DescriptorSetLayout]) {
        unsafe {
            for &layout in set_layouts {
                self.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}

impl VulkanGraphicsDevice {
    /// Construct the full backing state of a render pass from its info
    ///
    /// Performs, in order: target resolution, native render pass, descriptor
    /// set layouts + pipeline layout, graphics pipeline, framebuffers. Any
    /// failure rolls the earlier steps back before returning.
    pub(crate) fn build_render_pass_entry(
        &mut self,
        info: &RenderPassInfo,
    ) -> Result<RenderPassEntry> {
        if info.shader_stages.is_empty() {
            gfx_bail!(SOURCE, "create_render_pass: empty shader stage list");
        }

        // Resolve shader stage modules
        let mut stages = Vec::with_capacity(info.shader_stages.len());
        for &shader in &info.shader_stages {
            let entry = self.shaders.get(shader)?;
            stages.push((shader_type_to_vk(entry.ty), entry.module));
        }

        // Resolve the render target's format, extent and final layout
        let (color_format, extent, final_layout) = match info.render_target {
            RenderTarget::Texture(texture) => {
                let entry = self.textures.get(texture)?;
                let props = unsafe {
                    self.ctx.instance.get_physical_device_format_properties(
                        self.ctx.physical_device,
                        entry.format,
                    )
                };
                if !props
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::COLOR_ATTACHMENT)
                {
                    return Err(Error::UnsupportedFormat(format!(
                        "{:?} is not usable as a color attachment",
                        entry.format
                    )));
                }
                (
                    entry.format,
                    entry.extent,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                )
            }
            RenderTarget::Window(window) => {
                let entry = self.windows.get(window)?;
                (entry.format, entry.extent, vk::ImageLayout::PRESENT_SRC_KHR)
            }
        };

        // Depth buffers are paired lazily with the target when requested
        let wants_depth = info.rasterizer_config.depth_compare != CompareOperation::Ignore
            || info.clear_operations.clears_depth();
        let depth = if wants_depth {
            Some(self.depth_buffer_for_target(info.render_target, extent)?)
        } else {
            None
        };

        let render_pass = self.ctx.make_render_pass(
            color_format,
            info.clear_operations,
            final_layout,
            depth.map(|(_, format)| format),
        )?;

        let set_layouts = match self.ctx.decode_input_layout(&info.input_layout) {
            Ok(set_layouts) => set_layouts,
            Err(e) => {
                unsafe { self.ctx.device.destroy_render_pass(render_pass, None) };
                return Err(e);
            }
        };

        let pipeline_layout = match self.ctx.make_pipeline_layout(&set_layouts) {
            Ok(layout) => layout,
            Err(e) => {
                self.ctx.destroy_set_layouts(&set_layouts);
                unsafe { self.ctx.device.destroy_render_pass(render_pass, None) };
                return Err(e);
            }
        };

        let pipeline = match self.ctx.make_graphics_pipeline(
            &stages,
            &info.vertex_layout,
            &info.rasterizer_config,
            pipeline_layout,
            render_pass,
            extent,
            depth.is_some(),
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                unsafe {
                    self.ctx.device.destroy_pipeline_layout(pipeline_layout, None);
                }
                self.ctx.destroy_set_layouts(&set_layouts);
                unsafe { self.ctx.device.destroy_render_pass(render_pass, None) };
                return Err(e);
            }
        };

        // One framebuffer per back-buffer for windows, one for textures
        let target_views: Vec<vk::ImageView> = match info.render_target {
            RenderTarget::Texture(texture) => vec![self.textures.get(texture)?.view],
            RenderTarget::Window(window) => self.windows.get(window)?.views.clone(),
        };

        let mut framebuffers = Vec::with_capacity(target_views.len());
        for &view in &target_views {
            let mut attachments = vec![view];
            if let Some((depth_view, _)) = depth {
                attachments.push(depth_view);
            }
            let fb_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            match unsafe { self.ctx.device.create_framebuffer(&fb_info, None) } {
                Ok(framebuffer) => framebuffers.push(framebuffer),
                Err(e) => {
                    unsafe {
                        for &framebuffer in &framebuffers {
                            self.ctx.device.destroy_framebuffer(framebuffer, None);
                        }
                        self.ctx.device.destroy_pipeline(pipeline, None);
                        self.ctx.device.destroy_pipeline_layout(pipeline_layout, None);
                    }
                    self.ctx.destroy_set_layouts(&set_layouts);
                    unsafe { self.ctx.device.destroy_render_pass(render_pass, None) };
                    return Err(Error::BackendError(format!(
                        "Failed to create framebuffer: {:?}",
                        e
                    )));
                }
            }
        }

        let mut clear_values = vec![vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        }];
        if depth.is_some() {
            clear_values.push(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            });
        }

        Ok(RenderPassEntry {
            render_pass,
            pipeline,
            pipeline_layout,
            set_layouts,
            framebuffers,
            extent,
            target: info.render_target,
            clear_values,
        })
    }

    /// View and format of the depth buffer paired with a render target,
    /// creating it on first use. Lifetime follows the paired target.
    fn depth_buffer_for_target(
        &mut self,
        target: RenderTarget,
        extent: vk::Extent2D,
    ) -> Result<(vk::ImageView, vk::Format)> {
        match target {
            RenderTarget::Texture(texture) => {
                if let Some(existing) = self.texture_depth_buffers.get(&texture) {
                    return Ok((existing.view, existing.format));
                }
                let depth_buffer = self.ctx.create_depth_buffer(extent.width, extent.height)?;
                let result = (depth_buffer.view, depth_buffer.format);
                self.texture_depth_buffers.insert(texture, depth_buffer);
                Ok(result)
            }
            RenderTarget::Window(window) => {
                if let Some(existing) = self.window_depth_buffers.get(&window) {
                    return Ok((existing.view, existing.format));
                }
                let depth_buffer = self.ctx.create_depth_buffer(extent.width, extent.height)?;
                let result = (depth_buffer.view, depth_buffer.format);
                self.window_depth_buffers.insert(window, depth_buffer);
                Ok(result)
            }
        }
    }
}
