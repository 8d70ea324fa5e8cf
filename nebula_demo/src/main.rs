//! Triangle demo for the Nebula graphics layer
//!
//! Drives the full stack: a winit window wrapped as the window-system
//! collaborator, a vsync swapchain with two back-buffers, an interleaved
//! vertex/index buffer, a uniform-buffer input set updated every frame, and
//! the acquire -> record -> execute -> present loop.
//!
//! The pipeline consumes precompiled SPIR-V next to the GLSL sources:
//!
//! ```text
//! glslangValidator -V shaders/triangle.vert -o shaders/triangle.vert.spv
//! glslangValidator -V shaders/triangle.frag -o shaders/triangle.frag.spv
//! ```

use std::sync::{Arc, Mutex};
use std::time::Instant;

use glam::{Vec2, Vec3};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use nebula_gfx::{
    Binding, BindingLayout, BindingResource, BindingType, BufferInfo, BufferUsage, ClearOperation,
    CommandBufferInfo, DeviceConfig, Error, Format, GraphicsDevice, InputLayout, InputSetInfo,
    InputTracker, Key, PresentMode, RenderPassInfo, RenderTarget, Result, SetLayout, ShaderInfo,
    ShaderType, VertexAttribute, VertexLayout, WindowInfo, WindowSource,
};
use nebula_gfx_renderer_vulkan::VulkanGraphicsDevice;

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;

// ============================================================================
// Window-system collaborator
// ============================================================================

/// winit window wrapped as the backend's window-system collaborator
struct DemoWindow {
    window: winit::window::Window,
    input: Mutex<InputTracker>,
}

impl HasWindowHandle for DemoWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}

impl HasDisplayHandle for DemoWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}

impl WindowSource for DemoWindow {
    fn drawable_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    fn should_close(&self) -> bool {
        self.input.lock().unwrap().close_requested()
    }

    fn key_down(&self, key: Key) -> bool {
        self.input.lock().unwrap().key_down(key)
    }

    fn mouse_position(&self) -> (i32, i32) {
        self.input.lock().unwrap().mouse_position()
    }
}

/// Map the winit keys the demo cares about onto the abstraction's key set
fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,
        KeyCode::Digit0 => Key::Num0,
        KeyCode::Digit1 => Key::Num1,
        KeyCode::Digit2 => Key::Num2,
        KeyCode::Digit3 => Key::Num3,
        KeyCode::Digit4 => Key::Num4,
        KeyCode::Digit5 => Key::Num5,
        KeyCode::Digit6 => Key::Num6,
        KeyCode::Digit7 => Key::Num7,
        KeyCode::Digit8 => Key::Num8,
        KeyCode::Digit9 => Key::Num9,
        KeyCode::Space => Key::Space,
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => return None,
    })
}

// ============================================================================
// Geometry
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: Vec2,
    color: Vec3,
}

const VERTICES: [Vertex; 3] = [
    Vertex {
        position: Vec2::new(0.0, -0.6),
        color: Vec3::new(1.0, 0.2, 0.2),
    },
    Vertex {
        position: Vec2::new(0.6, 0.6),
        color: Vec3::new(0.2, 1.0, 0.2),
    },
    Vertex {
        position: Vec2::new(-0.6, 0.6),
        color: Vec3::new(0.2, 0.2, 1.0),
    },
];

const INDICES: [u32; 3] = [0, 1, 2];

fn load_shader(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        Error::InitializationFailed(format!(
            "Failed to read shader binary '{}': {} (compile the GLSL sources with glslangValidator first)",
            path, e
        ))
    })
}

// ============================================================================
// Application
// ============================================================================

struct GfxState {
    // Field order matters: the device must drop before the winit window so
    // the surface is destroyed while the native window is still alive.
    device: VulkanGraphicsDevice,
    demo_window: Arc<DemoWindow>,
    window: nebula_gfx::Window,
    render_pass: nebula_gfx::RenderPass,
    vertex_buffer: nebula_gfx::Buffer,
    index_buffer: nebula_gfx::Buffer,
    uniform_buffer: nebula_gfx::Buffer,
    input_set: nebula_gfx::InputSet,
    start: Instant,
}

impl GfxState {
    fn new(event_loop: &ActiveEventLoop) -> Result<Self> {
        let winit_window = event_loop
            .create_window(
                winit::window::Window::default_attributes()
                    .with_title("Nebula Triangle")
                    .with_inner_size(winit::dpi::LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT)),
            )
            .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))?;

        let demo_window = Arc::new(DemoWindow {
            window: winit_window,
            input: Mutex::new(InputTracker::new()),
        });

        let config = DeviceConfig {
            app_name: "Nebula Triangle".to_string(),
            ..DeviceConfig::default()
        };
        let mut device =
            VulkanGraphicsDevice::new(config, Some(event_loop as &dyn HasDisplayHandle))?;

        let window = device.create_window(
            &WindowInfo {
                width: WINDOW_WIDTH,
                height: WINDOW_HEIGHT,
                present_mode: PresentMode::Vsync,
                framebuffer_count: 2,
            },
            demo_window.clone(),
        )?;

        let vertex_shader = device.create_shader(&ShaderInfo::new(
            ShaderType::Vertex,
            load_shader(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/shaders/triangle.vert.spv"
            ))?,
        ))?;
        let fragment_shader = device.create_shader(&ShaderInfo::new(
            ShaderType::Fragment,
            load_shader(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/shaders/triangle.frag.spv"
            ))?,
        ))?;

        let vertex_buffer = device.create_buffer(&BufferInfo::new(
            BufferUsage::VERTEX,
            bytemuck::cast_slice(&VERTICES).to_vec(),
        ))?;
        let index_buffer = device.create_buffer(&BufferInfo::new(
            BufferUsage::INDEX,
            bytemuck::cast_slice(&INDICES).to_vec(),
        ))?;
        let uniform_buffer = device.create_buffer(&BufferInfo::new(
            BufferUsage::UNIFORM,
            bytemuck::cast_slice(&[1.0f32, 1.0, 1.0, 1.0]).to_vec(),
        ))?;

        let mut pass_info = RenderPassInfo::new(
            vec![vertex_shader, fragment_shader],
            RenderTarget::Window(window),
        );
        pass_info.clear_operations = ClearOperation::Color;
        pass_info.vertex_layout = VertexLayout::new(
            std::mem::size_of::<Vertex>() as u32,
            vec![
                VertexAttribute::new(
                    std::mem::offset_of!(Vertex, position) as u32,
                    Format::R32G32_SFLOAT,
                ),
                VertexAttribute::new(
                    std::mem::offset_of!(Vertex, color) as u32,
                    Format::R32G32B32_SFLOAT,
                ),
            ],
        );
        pass_info.input_layout = InputLayout::new(vec![SetLayout::new(vec![BindingLayout::new(
            BindingType::UniformBuffer,
        )])]);

        let render_pass = device.create_render_pass(&pass_info)?;

        let input_set = device.create_input_set(&InputSetInfo::new(
            render_pass,
            0,
            vec![Binding::new(BindingResource::Buffer(uniform_buffer), 0)],
        ))?;

        // The shader modules are linked into the pipeline; the handles are
        // not needed past this point.
        device.free_shader(vertex_shader)?;
        device.free_shader(fragment_shader)?;

        Ok(Self {
            device,
            demo_window,
            window,
            render_pass,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            input_set,
            start: Instant::now(),
        })
    }

    fn render_frame(&mut self) -> Result<()> {
        let t = self.start.elapsed().as_secs_f32();
        let tint = [
            (t.sin() * 0.5 + 0.5).max(0.2),
            ((t * 0.7).sin() * 0.5 + 0.5).max(0.2),
            ((t * 1.3).sin() * 0.5 + 0.5).max(0.2),
            1.0f32,
        ];
        self.device
            .update_buffer(self.uniform_buffer, bytemuck::cast_slice(&tint), 0)?;

        let frame = self.device.next_frame(self.window)?;

        self.device.begin_command_buffer(&CommandBufferInfo)?;
        self.device.set_render_pass(self.render_pass, frame)?;
        self.device.bind_vertex_buffer(self.vertex_buffer)?;
        self.device.bind_index_buffer(self.index_buffer)?;
        self.device.bind_input_set(self.input_set)?;
        self.device
            .draw_indexed(INDICES.len() as u32, 0, 0)?;
        let cmd = self.device.end_command_buffer()?;

        self.device.execute(cmd)?;
        self.device.present(self.window)?;
        self.device.free_command_buffer(cmd)?;

        Ok(())
    }
}

#[derive(Default)]
struct DemoApp {
    gfx: Option<GfxState>,
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gfx.is_some() {
            return;
        }
        match GfxState::new(event_loop) {
            Ok(gfx) => self.gfx = Some(gfx),
            Err(e) => {
                eprintln!("Failed to initialize: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                gfx.demo_window.input.lock().unwrap().request_close();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        gfx.demo_window
                            .input
                            .lock()
                            .unwrap()
                            .set_key(key, event.state == ElementState::Pressed);
                    }
                    if code == KeyCode::Escape {
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let key = match button {
                    MouseButton::Left => Some(Key::MouseLeft),
                    MouseButton::Right => Some(Key::MouseRight),
                    MouseButton::Middle => Some(Key::MouseMiddle),
                    _ => None,
                };
                if let Some(key) = key {
                    gfx.demo_window
                        .input
                        .lock()
                        .unwrap()
                        .set_key(key, state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                gfx.demo_window
                    .input
                    .lock()
                    .unwrap()
                    .set_mouse_position(position.x as i32, position.y as i32);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = gfx.render_frame() {
                    eprintln!("Frame failed: {}", e);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gfx) = &self.gfx {
            gfx.demo_window.window.request_redraw();
        }
    }
}

fn main() {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::default();
    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {}", e);
        std::process::exit(1);
    }
}
