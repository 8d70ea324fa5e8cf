/// Converters between abstraction enums and Vulkan types
///
/// All functions in here are pure lookups. The layout/access/stage tables at
/// the bottom drive every image-layout transition barrier the backend records.

use ash::vk;
use nebula_gfx::{
    BindingType, BlendFactor, BufferUsage, CompareOperation, CullMode, Format, FrontFace,
    PolygonMode, PresentMode, RepeatMode, SamplerMode, ShaderType,
};

/// Convert an abstraction format to the Vulkan format
pub(crate) fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::R8_UINT => vk::Format::R8_UINT,
        Format::R8_SINT => vk::Format::R8_SINT,
        Format::R8_SRGB => vk::Format::R8_SRGB,
        Format::R8_UNORM => vk::Format::R8_UNORM,
        Format::R8_SNORM => vk::Format::R8_SNORM,
        Format::R8G8_UINT => vk::Format::R8G8_UINT,
        Format::R8G8_SINT => vk::Format::R8G8_SINT,
        Format::R8G8_SRGB => vk::Format::R8G8_SRGB,
        Format::R8G8_UNORM => vk::Format::R8G8_UNORM,
        Format::R8G8_SNORM => vk::Format::R8G8_SNORM,
        Format::R8G8B8_UINT => vk::Format::R8G8B8_UINT,
        Format::R8G8B8_SINT => vk::Format::R8G8B8_SINT,
        Format::R8G8B8_SRGB => vk::Format::R8G8B8_SRGB,
        Format::R8G8B8_UNORM => vk::Format::R8G8B8_UNORM,
        Format::R8G8B8_SNORM => vk::Format::R8G8B8_SNORM,
        Format::R8G8B8A8_UINT => vk::Format::R8G8B8A8_UINT,
        Format::R8G8B8A8_SINT => vk::Format::R8G8B8A8_SINT,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8_SNORM => vk::Format::R8G8B8A8_SNORM,
        Format::R32_UINT => vk::Format::R32_UINT,
        Format::R32_SINT => vk::Format::R32_SINT,
        Format::R32_SFLOAT => vk::Format::R32_SFLOAT,
        Format::R32G32_UINT => vk::Format::R32G32_UINT,
        Format::R32G32_SINT => vk::Format::R32G32_SINT,
        Format::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32_UINT => vk::Format::R32G32B32_UINT,
        Format::R32G32B32_SINT => vk::Format::R32G32B32_SINT,
        Format::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32A32_UINT => vk::Format::R32G32B32A32_UINT,
        Format::R32G32B32A32_SINT => vk::Format::R32G32B32A32_SINT,
        Format::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
    }
}

/// Convert a shader stage kind to Vulkan stage flags
pub(crate) fn shader_type_to_vk(ty: ShaderType) -> vk::ShaderStageFlags {
    match ty {
        ShaderType::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderType::Fragment => vk::ShaderStageFlags::FRAGMENT,
        ShaderType::Compute => vk::ShaderStageFlags::COMPUTE,
    }
}

/// Convert buffer usage flags to Vulkan usage flags
///
/// Transfer usage is added by the caller depending on the upload path.
pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    flags
}

/// Convert a depth comparison to the Vulkan compare op
///
/// `Ignore` disables depth testing; the returned op is only meaningful when
/// testing is enabled.
pub(crate) fn compare_op_to_vk(op: CompareOperation) -> vk::CompareOp {
    match op {
        CompareOperation::Ignore => vk::CompareOp::ALWAYS,
        CompareOperation::Equal => vk::CompareOp::EQUAL,
        CompareOperation::Greater => vk::CompareOp::GREATER,
        CompareOperation::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOperation::Less => vk::CompareOp::LESS,
        CompareOperation::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
    }
}

/// Convert a blend factor to the Vulkan blend factor
pub(crate) fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
    }
}

/// Convert a cull mode to Vulkan cull flags
pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
        CullMode::All => vk::CullModeFlags::FRONT_AND_BACK,
    }
}

/// Convert a winding order to the Vulkan front face
pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
    }
}

/// Convert a polygon fill mode to the Vulkan polygon mode
pub(crate) fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Solid => vk::PolygonMode::FILL,
        PolygonMode::Wireframe => vk::PolygonMode::LINE,
    }
}

/// Convert a sampler filter mode to the Vulkan filter
pub(crate) fn sampler_mode_to_vk(mode: SamplerMode) -> vk::Filter {
    match mode {
        SamplerMode::Nearest => vk::Filter::NEAREST,
        SamplerMode::Linear => vk::Filter::LINEAR,
    }
}

/// Convert an edge-repeat mode to the Vulkan address mode
pub(crate) fn repeat_mode_to_vk(mode: RepeatMode) -> vk::SamplerAddressMode {
    match mode {
        RepeatMode::ClampBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        RepeatMode::ClampEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        RepeatMode::Repeat => vk::SamplerAddressMode::REPEAT,
        RepeatMode::RepeatMirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
    }
}

/// Convert a binding type to the Vulkan descriptor type
pub(crate) fn binding_type_to_vk(ty: BindingType) -> vk::DescriptorType {
    match ty {
        BindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        BindingType::Sampler2D => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

/// Convert a present mode to the Vulkan present mode
///
/// FIFO is the vsync mode every Vulkan surface supports; IMMEDIATE
/// availability is checked against the surface at window creation.
pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Vsync => vk::PresentModeKHR::FIFO,
    }
}

// ============================================================================
// Layout transition tables
// ============================================================================

/// Access masks associated with an image layout
///
/// Fixed lookup: each layout maps to the accesses that touch the image while
/// it is in that layout. A transition barrier takes its source access mask
/// from the old layout and its destination access mask from the new one.
pub(crate) fn layout_access_flags(layout: vk::ImageLayout) -> vk::AccessFlags {
    match layout {
        vk::ImageLayout::UNDEFINED => vk::AccessFlags::empty(),
        vk::ImageLayout::PREINITIALIZED => vk::AccessFlags::HOST_WRITE,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => {
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        }
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => vk::AccessFlags::TRANSFER_READ,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => vk::AccessFlags::TRANSFER_WRITE,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => vk::AccessFlags::SHADER_READ,
        vk::ImageLayout::PRESENT_SRC_KHR => vk::AccessFlags::MEMORY_READ,
        _ => vk::AccessFlags::empty(),
    }
}

/// Pipeline stages that produce or consume the given accesses
///
/// Fixed lookup used to derive a barrier's stage masks from its access masks.
/// An empty access mask resolves to TOP_OF_PIPE so the barrier stays valid.
pub(crate) fn access_stage_flags(access: vk::AccessFlags) -> vk::PipelineStageFlags {
    let mut stages = vk::PipelineStageFlags::empty();
    if access.contains(vk::AccessFlags::HOST_WRITE) {
        stages |= vk::PipelineStageFlags::HOST;
    }
    if access.contains(vk::AccessFlags::TRANSFER_READ)
        || access.contains(vk::AccessFlags::TRANSFER_WRITE)
    {
        stages |= vk::PipelineStageFlags::TRANSFER;
    }
    if access.contains(vk::AccessFlags::SHADER_READ) {
        stages |= vk::PipelineStageFlags::FRAGMENT_SHADER;
    }
    if access.contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE) {
        stages |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    }
    if access.contains(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE) {
        stages |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
    }
    if access.contains(vk::AccessFlags::MEMORY_READ) {
        stages |= vk::PipelineStageFlags::BOTTOM_OF_PIPE;
    }
    if stages.is_empty() {
        stages = vk::PipelineStageFlags::TOP_OF_PIPE;
    }
    stages
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
