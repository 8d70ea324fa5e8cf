/// GraphicsDevice trait - the graphics abstraction contract
///
/// This is the retained-resource API every backend implements: resource
/// creation through opaque handles, a single command-buffer recording
/// session, submission, and window presentation.

use std::sync::Arc;

use crate::device::{
    BufferInfo, CommandBufferInfo, InputSetInfo, Key, RenderPassInfo, ShaderInfo, TextureInfo,
    WindowInfo, WindowSource,
};
use crate::error::Result;
use crate::handle::{Buffer, CommandBuffer, InputSet, RenderPass, Shader, Texture, Window};

// ============================================================================
// Configuration
// ============================================================================

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Nebula Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Main graphics device trait
///
/// The central factory and command interface of the abstraction. Implemented
/// by backend-specific devices (e.g., `VulkanGraphicsDevice`); a mock
/// implementation exists for testing.
///
/// All GPU-side state lives behind the device; callers hold only handles.
/// Every entity is created by an explicit `create_*` call and destroyed only
/// by the matching `free_*` call - there is no implicit garbage collection of
/// GPU resources. Using a freed or null handle is reported as an error.
pub trait GraphicsDevice {
    // ------------------------------------------------------------------
    // Resource creation
    // ------------------------------------------------------------------

    /// Create a shader from a compiled binary
    ///
    /// # Arguments
    ///
    /// * `info` - Shader descriptor (stage kind and binary)
    fn create_shader(&mut self, info: &ShaderInfo) -> Result<Shader>;

    /// Create a buffer initialized with the supplied bytes
    ///
    /// The creation either fully succeeds (the handle is usable and holds the
    /// bytes) or fully fails with no native object left behind.
    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Buffer>;

    /// Create a texture with its sampler, optionally uploading initial pixels
    fn create_texture(&mut self, info: &TextureInfo) -> Result<Texture>;

    /// Create a window with a back-buffer chain of the requested count
    ///
    /// # Arguments
    ///
    /// * `info` - Window descriptor
    /// * `source` - Window-system collaborator supplying the native surface;
    ///   it must outlive the returned handle
    fn create_window(&mut self, info: &WindowInfo, source: Arc<dyn WindowSource>)
        -> Result<Window>;

    /// Create an input set against one render pass's binding layout
    fn create_input_set(&mut self, info: &InputSetInfo) -> Result<InputSet>;

    /// Create a render pass: one compiled pipeline plus its native pass
    ///
    /// An empty shader-stage list or an unsupported render-target format is
    /// an error here, not at draw time.
    fn create_render_pass(&mut self, info: &RenderPassInfo) -> Result<RenderPass>;

    // ------------------------------------------------------------------
    // Command recording
    // ------------------------------------------------------------------

    /// Open the single command-buffer recording session
    ///
    /// Exactly one recording may be open at a time; beginning a second one
    /// fails without side effects on the first.
    fn begin_command_buffer(&mut self, info: &CommandBufferInfo) -> Result<()>;

    /// Bind a render pass and select the target framebuffer slot
    ///
    /// Must be called before any bind or draw call. Calling it again within
    /// the same recording switches the active render pass. For a window
    /// target, `framebuffer_index` is the index returned by `next_frame`.
    fn set_render_pass(&mut self, render_pass: RenderPass, framebuffer_index: u32) -> Result<()>;

    /// Bind a vertex buffer (requires a bound render pass)
    fn bind_vertex_buffer(&mut self, buffer: Buffer) -> Result<()>;

    /// Bind an index buffer (requires a bound render pass)
    fn bind_index_buffer(&mut self, buffer: Buffer) -> Result<()>;

    /// Bind an input set (requires the render pass it was created against)
    fn bind_input_set(&mut self, input_set: InputSet) -> Result<()>;

    /// Issue a non-indexed draw (requires a bound render pass)
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Issue an indexed draw
    ///
    /// Requires an index buffer bound since the current render pass was set.
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: u32)
        -> Result<()>;

    /// Close the recording and return the finalized command buffer
    fn end_command_buffer(&mut self) -> Result<CommandBuffer>;

    /// Submit a finalized command buffer to the graphics queue
    ///
    /// Does not block on completion; GPU execution is asynchronous relative
    /// to the caller. Presentation ordering is enforced internally.
    fn execute(&mut self, command_buffer: CommandBuffer) -> Result<()>;

    // ------------------------------------------------------------------
    // Data upload
    // ------------------------------------------------------------------

    /// Re-upload bytes into a region of an existing buffer
    ///
    /// Bytes outside `[offset, offset + data.len())` are preserved. Blocks
    /// until the upload is visible to the GPU.
    fn update_buffer(&mut self, buffer: Buffer, data: &[u8], offset: u64) -> Result<()>;

    // ------------------------------------------------------------------
    // Window functions
    // ------------------------------------------------------------------

    /// Number of back-buffers in the window's chain
    fn backbuffer_count(&self, window: Window) -> Result<u32>;

    /// Block until a back-buffer is available for writing and return its index
    ///
    /// The returned index is the `framebuffer_index` to pass into
    /// `set_render_pass` for passes targeting this window.
    fn next_frame(&mut self, window: Window) -> Result<u32>;

    /// Submit the currently written back-buffer for display
    ///
    /// Presenting before acquiring via `next_frame` is an error. The frame is
    /// not displayed before its rendering commands complete.
    fn present(&mut self, window: Window) -> Result<()>;

    /// Set the window title
    fn set_window_title(&mut self, window: Window, title: &str) -> Result<()>;

    /// Whether the user requested the window to close
    fn window_should_close(&self, window: Window) -> Result<bool>;

    /// Whether the given key is held down, scoped to the window
    fn key_down(&self, window: Window, key: Key) -> Result<bool>;

    /// Current mouse position in window coordinates
    fn mouse_position(&self, window: Window) -> Result<(i32, i32)>;

    // ------------------------------------------------------------------
    // Resource teardown
    // ------------------------------------------------------------------

    /// Free a shader
    fn free_shader(&mut self, shader: Shader) -> Result<()>;

    /// Free a buffer, waiting out any GPU work still referencing it
    fn free_buffer(&mut self, buffer: Buffer) -> Result<()>;

    /// Free a texture and its depth-buffer companion, if any
    fn free_texture(&mut self, texture: Texture) -> Result<()>;

    /// Free a window, its back-buffer chain and its depth-buffer companion
    fn free_window(&mut self, window: Window) -> Result<()>;

    /// Free an input set
    fn free_input_set(&mut self, input_set: InputSet) -> Result<()>;

    /// Free a render pass and its pipeline
    fn free_render_pass(&mut self, render_pass: RenderPass) -> Result<()>;

    /// Free a finalized command buffer
    fn free_command_buffer(&mut self, command_buffer: CommandBuffer) -> Result<()>;
}
