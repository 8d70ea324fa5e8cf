use super::*;
use crate::device::{
    BindingLayout, BindingType, ClearOperation, InputLayout, PresentMode, SetLayout,
};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

// ============================================================================
// Test fixtures
// ============================================================================

/// Window-system stand-in; never asked for real native handles by the mock
struct FakeWindowSource;

impl HasWindowHandle for FakeWindowSource {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for FakeWindowSource {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl WindowSource for FakeWindowSource {
    fn drawable_size(&self) -> (u32, u32) {
        (800, 600)
    }
    fn set_title(&self, _title: &str) {}
    fn should_close(&self) -> bool {
        false
    }
    fn key_down(&self, _key: Key) -> bool {
        false
    }
    fn mouse_position(&self) -> (i32, i32) {
        (0, 0)
    }
}

fn spirv_stub() -> Vec<u8> {
    vec![0; 16]
}

fn make_shader(device: &mut MockDevice) -> Shader {
    device
        .create_shader(&ShaderInfo::new(crate::ShaderType::Vertex, spirv_stub()))
        .unwrap()
}

fn make_vertex_buffer(device: &mut MockDevice, data: Vec<u8>) -> Buffer {
    device
        .create_buffer(&BufferInfo::new(BufferUsage::VERTEX, data))
        .unwrap()
}

fn make_window(device: &mut MockDevice, framebuffer_count: u32) -> Window {
    let mut info = WindowInfo::new(800, 600);
    info.present_mode = PresentMode::Vsync;
    info.framebuffer_count = framebuffer_count;
    device
        .create_window(&info, Arc::new(FakeWindowSource))
        .unwrap()
}

fn make_window_pass(device: &mut MockDevice, window: Window) -> RenderPass {
    let shader = make_shader(device);
    let fragment = device
        .create_shader(&ShaderInfo::new(crate::ShaderType::Fragment, spirv_stub()))
        .unwrap();
    let mut info = RenderPassInfo::new(vec![shader, fragment], RenderTarget::Window(window));
    info.clear_operations = ClearOperation::Color;
    device.create_render_pass(&info).unwrap()
}

// ============================================================================
// Registry lifecycle
// ============================================================================

#[test]
fn test_free_after_create_leaves_no_references() {
    let mut device = MockDevice::new();
    let buffer = make_vertex_buffer(&mut device, vec![1, 2, 3, 4]);
    assert_eq!(device.live_resources(), 1);

    device.free_buffer(buffer).unwrap();
    assert_eq!(device.live_resources(), 0);

    // Subsequent use of the freed handle is detected as invalid.
    assert!(matches!(
        device.read_buffer(buffer),
        Err(Error::InvalidHandle { kind: "Buffer" })
    ));
    assert!(matches!(
        device.update_buffer(buffer, &[0], 0),
        Err(Error::InvalidHandle { kind: "Buffer" })
    ));
}

#[test]
fn test_double_free_is_reported() {
    let mut device = MockDevice::new();
    let shader = make_shader(&mut device);
    device.free_shader(shader).unwrap();
    assert!(matches!(
        device.free_shader(shader),
        Err(Error::InvalidHandle { kind: "Shader" })
    ));
}

#[test]
fn test_stale_handle_does_not_alias_new_resource() {
    let mut device = MockDevice::new();
    let old = make_vertex_buffer(&mut device, vec![1, 1]);
    device.free_buffer(old).unwrap();

    let new = make_vertex_buffer(&mut device, vec![2, 2]);
    assert!(device.read_buffer(old).is_err());
    assert_eq!(device.read_buffer(new).unwrap(), vec![2, 2]);
}

// ============================================================================
// Buffer contents
// ============================================================================

#[test]
fn test_create_buffer_roundtrip() {
    let mut device = MockDevice::new();
    let data: Vec<u8> = (0..64).collect();
    let buffer = make_vertex_buffer(&mut device, data.clone());
    assert_eq!(device.read_buffer(buffer).unwrap(), data);
}

#[test]
fn test_create_buffer_roundtrip_from_vertex_data() {
    let mut device = MockDevice::new();
    let positions: [f32; 6] = [0.0, -0.5, 0.5, 0.5, -0.5, 0.5];
    let bytes = bytemuck::cast_slice(&positions).to_vec();

    let buffer = make_vertex_buffer(&mut device, bytes.clone());
    let readback = device.read_buffer(buffer).unwrap();
    assert_eq!(readback, bytes);
    assert_eq!(bytemuck::cast_slice::<u8, f32>(&readback), positions);
}

#[test]
fn test_update_buffer_preserves_bytes_outside_range() {
    let mut device = MockDevice::new();
    let buffer = make_vertex_buffer(&mut device, vec![1, 2, 3, 4]);

    device.update_buffer(buffer, &[9, 9], 1).unwrap();
    assert_eq!(device.read_buffer(buffer).unwrap(), vec![1, 9, 9, 4]);
}

#[test]
fn test_update_buffer_out_of_range_fails() {
    let mut device = MockDevice::new();
    let buffer = make_vertex_buffer(&mut device, vec![0; 4]);
    assert!(matches!(
        device.update_buffer(buffer, &[1, 2, 3], 2),
        Err(Error::ContractViolation(_))
    ));
    // Contents untouched on failure.
    assert_eq!(device.read_buffer(buffer).unwrap(), vec![0; 4]);
}

#[test]
fn test_create_buffer_rejects_empty_usage_and_data() {
    let mut device = MockDevice::new();
    assert!(device
        .create_buffer(&BufferInfo::new(BufferUsage::empty(), vec![1]))
        .is_err());
    assert!(device
        .create_buffer(&BufferInfo::new(BufferUsage::VERTEX, vec![]))
        .is_err());
}

// ============================================================================
// Recording state machine
// ============================================================================

#[test]
fn test_second_begin_fails_without_side_effects() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let pass = make_window_pass(&mut device, window);

    device.begin_command_buffer(&CommandBufferInfo).unwrap();
    assert!(matches!(
        device.begin_command_buffer(&CommandBufferInfo),
        Err(Error::ContractViolation(_))
    ));

    // The first recording is still intact and usable.
    let index = device.next_frame(window).unwrap();
    device.set_render_pass(pass, index).unwrap();
    device.draw(3, 0).unwrap();
    let cmd = device.end_command_buffer().unwrap();
    assert_eq!(
        device.recorded_commands(cmd).unwrap(),
        vec!["begin", "set_render_pass[0]", "draw(3, 0)", "end"]
    );
}

#[test]
fn test_draw_without_render_pass_fails() {
    let mut device = MockDevice::new();
    device.begin_command_buffer(&CommandBufferInfo).unwrap();
    assert!(matches!(
        device.draw(3, 0),
        Err(Error::ContractViolation(_))
    ));
}

#[test]
fn test_draw_indexed_without_index_buffer_fails() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let pass = make_window_pass(&mut device, window);

    device.begin_command_buffer(&CommandBufferInfo).unwrap();
    let index = device.next_frame(window).unwrap();
    device.set_render_pass(pass, index).unwrap();
    assert!(matches!(
        device.draw_indexed(3, 0, 0),
        Err(Error::ContractViolation(_))
    ));

    // Binding the index buffer lifts the restriction.
    let indices = device
        .create_buffer(&BufferInfo::new(BufferUsage::INDEX, vec![0; 12]))
        .unwrap();
    device.bind_index_buffer(indices).unwrap();
    device.draw_indexed(3, 0, 0).unwrap();
}

#[test]
fn test_switching_render_pass_resets_index_buffer_binding() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let pass_a = make_window_pass(&mut device, window);
    let pass_b = make_window_pass(&mut device, window);
    let indices = device
        .create_buffer(&BufferInfo::new(BufferUsage::INDEX, vec![0; 12]))
        .unwrap();

    device.begin_command_buffer(&CommandBufferInfo).unwrap();
    let index = device.next_frame(window).unwrap();
    device.set_render_pass(pass_a, index).unwrap();
    device.bind_index_buffer(indices).unwrap();
    device.draw_indexed(3, 0, 0).unwrap();

    // The index binding belongs to the previous pass scope.
    device.set_render_pass(pass_b, index).unwrap();
    assert!(device.draw_indexed(3, 0, 0).is_err());
}

#[test]
fn test_end_without_begin_fails() {
    let mut device = MockDevice::new();
    assert!(matches!(
        device.end_command_buffer(),
        Err(Error::ContractViolation(_))
    ));
}

#[test]
fn test_input_set_render_pass_pairing_is_enforced() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let pass_a = make_window_pass(&mut device, window);
    let pass_b = make_window_pass(&mut device, window);

    let uniform = device
        .create_buffer(&BufferInfo::new(BufferUsage::UNIFORM, vec![0; 16]))
        .unwrap();
    let set = device
        .create_input_set(&InputSetInfo::new(
            pass_a,
            0,
            vec![Binding::new(BindingResource::Buffer(uniform), 0)],
        ))
        .unwrap();

    device.begin_command_buffer(&CommandBufferInfo).unwrap();
    let index = device.next_frame(window).unwrap();
    device.set_render_pass(pass_b, index).unwrap();
    assert!(matches!(
        device.bind_input_set(set),
        Err(Error::ContractViolation(_))
    ));

    device.set_render_pass(pass_a, index).unwrap();
    device.bind_input_set(set).unwrap();
}

// ============================================================================
// Render pass independence
// ============================================================================

#[test]
fn test_identical_render_pass_infos_yield_independent_handles() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let shader = make_shader(&mut device);
    let info = RenderPassInfo::new(vec![shader], RenderTarget::Window(window));

    let pass_a = device.create_render_pass(&info).unwrap();
    let pass_b = device.create_render_pass(&info).unwrap();
    assert_ne!(pass_a, pass_b);

    // Freeing one leaves the other usable.
    device.free_render_pass(pass_a).unwrap();
    device.begin_command_buffer(&CommandBufferInfo).unwrap();
    let index = device.next_frame(window).unwrap();
    device.set_render_pass(pass_b, index).unwrap();
    device.end_command_buffer().unwrap();
}

#[test]
fn test_create_render_pass_rejects_empty_shader_stages() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let info = RenderPassInfo::new(vec![], RenderTarget::Window(window));
    assert!(matches!(
        device.create_render_pass(&info),
        Err(Error::ContractViolation(_))
    ));
}

#[test]
fn test_input_set_rejects_out_of_range_set_index() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let shader = make_shader(&mut device);
    let mut info = RenderPassInfo::new(vec![shader], RenderTarget::Window(window));
    info.input_layout = InputLayout::new(vec![SetLayout::new(vec![BindingLayout::new(
        BindingType::UniformBuffer,
    )])]);
    let pass = device.create_render_pass(&info).unwrap();

    assert!(device
        .create_input_set(&InputSetInfo::new(pass, 1, vec![]))
        .is_err());
}

// ============================================================================
// Window and presentation
// ============================================================================

#[test]
fn test_end_to_end_frame() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    let pass = make_window_pass(&mut device, window);
    assert_eq!(device.backbuffer_count(window).unwrap(), 2);

    device.begin_command_buffer(&CommandBufferInfo).unwrap();
    let first = device.next_frame(window).unwrap();
    device.set_render_pass(pass, first).unwrap();
    device.draw(3, 0).unwrap();
    let cmd = device.end_command_buffer().unwrap();
    device.execute(cmd).unwrap();
    device.present(window).unwrap();

    // The next acquire rotates to a distinct back-buffer.
    let second = device.next_frame(window).unwrap();
    assert_ne!(first, second);
    assert!(second < 2);
}

#[test]
fn test_present_before_acquire_fails() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    assert!(matches!(
        device.present(window),
        Err(Error::ContractViolation(_))
    ));

    // After a proper acquire/present cycle, presenting again also fails.
    device.next_frame(window).unwrap();
    device.present(window).unwrap();
    assert!(device.present(window).is_err());
}

#[test]
fn test_backbuffer_count_clamps_to_one() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 0);
    assert_eq!(device.backbuffer_count(window).unwrap(), 1);
    assert_eq!(device.next_frame(window).unwrap(), 0);
    assert_eq!(device.next_frame(window).unwrap(), 0);
}

#[test]
fn test_window_passthrough_queries() {
    let mut device = MockDevice::new();
    let window = make_window(&mut device, 2);
    assert!(!device.window_should_close(window).unwrap());
    assert!(!device.key_down(window, Key::Escape).unwrap());
    assert_eq!(device.mouse_position(window).unwrap(), (0, 0));
    device.set_window_title(window, "nebula").unwrap();
}
