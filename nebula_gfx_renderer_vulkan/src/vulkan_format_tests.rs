use super::*;

// ============================================================================
// Format conversion tests
// ============================================================================

#[test]
fn test_format_to_vk_spot_checks() {
    assert_eq!(format_to_vk(Format::R8_UNORM), vk::Format::R8_UNORM);
    assert_eq!(format_to_vk(Format::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(format_to_vk(Format::R32_SFLOAT), vk::Format::R32_SFLOAT);
    assert_eq!(
        format_to_vk(Format::R32G32B32A32_SFLOAT),
        vk::Format::R32G32B32A32_SFLOAT
    );
}

#[test]
fn test_bytes_per_pixel_matches_format_width() {
    assert_eq!(Format::R8_UNORM.bytes_per_pixel(), 1);
    assert_eq!(Format::R8G8_UNORM.bytes_per_pixel(), 2);
    assert_eq!(Format::R8G8B8_SRGB.bytes_per_pixel(), 3);
    assert_eq!(Format::R8G8B8A8_SRGB.bytes_per_pixel(), 4);
    assert_eq!(Format::R32_SFLOAT.bytes_per_pixel(), 4);
    assert_eq!(Format::R32G32_SFLOAT.bytes_per_pixel(), 8);
    assert_eq!(Format::R32G32B32_SFLOAT.bytes_per_pixel(), 12);
    assert_eq!(Format::R32G32B32A32_SFLOAT.bytes_per_pixel(), 16);
}

#[test]
fn test_buffer_usage_combines_bitwise() {
    let flags = buffer_usage_to_vk(BufferUsage::VERTEX | BufferUsage::INDEX);
    assert!(flags.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    assert!(flags.contains(vk::BufferUsageFlags::INDEX_BUFFER));
    assert!(!flags.contains(vk::BufferUsageFlags::UNIFORM_BUFFER));

    assert_eq!(
        buffer_usage_to_vk(BufferUsage::UNIFORM),
        vk::BufferUsageFlags::UNIFORM_BUFFER
    );
}

#[test]
fn test_rasterizer_conversions() {
    assert_eq!(compare_op_to_vk(CompareOperation::Less), vk::CompareOp::LESS);
    assert_eq!(
        compare_op_to_vk(CompareOperation::GreaterEqual),
        vk::CompareOp::GREATER_OR_EQUAL
    );
    assert_eq!(cull_mode_to_vk(CullMode::All), vk::CullModeFlags::FRONT_AND_BACK);
    assert_eq!(front_face_to_vk(FrontFace::Clockwise), vk::FrontFace::CLOCKWISE);
    assert_eq!(polygon_mode_to_vk(PolygonMode::Wireframe), vk::PolygonMode::LINE);
    assert_eq!(
        blend_factor_to_vk(BlendFactor::OneMinusSrcAlpha),
        vk::BlendFactor::ONE_MINUS_SRC_ALPHA
    );
}

#[test]
fn test_sampler_conversions() {
    assert_eq!(sampler_mode_to_vk(SamplerMode::Linear), vk::Filter::LINEAR);
    assert_eq!(
        repeat_mode_to_vk(RepeatMode::RepeatMirror),
        vk::SamplerAddressMode::MIRRORED_REPEAT
    );
    assert_eq!(
        repeat_mode_to_vk(RepeatMode::ClampBorder),
        vk::SamplerAddressMode::CLAMP_TO_BORDER
    );
}

#[test]
fn test_present_mode_conversions() {
    assert_eq!(
        present_mode_to_vk(PresentMode::Immediate),
        vk::PresentModeKHR::IMMEDIATE
    );
    assert_eq!(present_mode_to_vk(PresentMode::Vsync), vk::PresentModeKHR::FIFO);
}

// ============================================================================
// Layout transition table tests
// ============================================================================

#[test]
fn test_layout_access_lookup() {
    assert_eq!(
        layout_access_flags(vk::ImageLayout::UNDEFINED),
        vk::AccessFlags::empty()
    );
    assert_eq!(
        layout_access_flags(vk::ImageLayout::TRANSFER_DST_OPTIMAL),
        vk::AccessFlags::TRANSFER_WRITE
    );
    assert_eq!(
        layout_access_flags(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        vk::AccessFlags::SHADER_READ
    );
}

#[test]
fn test_access_stage_lookup() {
    assert_eq!(
        access_stage_flags(vk::AccessFlags::empty()),
        vk::PipelineStageFlags::TOP_OF_PIPE
    );
    assert_eq!(
        access_stage_flags(vk::AccessFlags::TRANSFER_WRITE),
        vk::PipelineStageFlags::TRANSFER
    );
    assert_eq!(
        access_stage_flags(vk::AccessFlags::SHADER_READ),
        vk::PipelineStageFlags::FRAGMENT_SHADER
    );
}

#[test]
fn test_upload_transition_sequence_barriers() {
    // undefined -> transfer-dst: no prior access, transfer write after.
    let src = layout_access_flags(vk::ImageLayout::UNDEFINED);
    let dst = layout_access_flags(vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(access_stage_flags(src), vk::PipelineStageFlags::TOP_OF_PIPE);
    assert_eq!(access_stage_flags(dst), vk::PipelineStageFlags::TRANSFER);

    // transfer-dst -> shader-read-only: transfer write before, shader read after.
    let src = layout_access_flags(vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    let dst = layout_access_flags(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(access_stage_flags(src), vk::PipelineStageFlags::TRANSFER);
    assert_eq!(
        access_stage_flags(dst),
        vk::PipelineStageFlags::FRAGMENT_SHADER
    );
}
