/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Implements the full abstraction contract in memory: byte-accurate buffers,
/// the single-recording state machine, back-buffer rotation and registry
/// bookkeeping. Used to test the contract without a graphics backend.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::device::{
    Binding, BindingResource, BufferInfo, BufferUsage, CommandBufferInfo, GraphicsDevice,
    InputSetInfo, Key, RenderPassInfo, RenderTarget, ShaderInfo, TextureInfo, WindowInfo,
    WindowSource,
};
use crate::error::{Error, Result};
use crate::handle::{Buffer, CommandBuffer, InputSet, RenderPass, Shader, Texture, Window};
use crate::{gfx_bail, gfx_violation};

const SOURCE: &str = "nebula::mock";

// ============================================================================
// Mock resource entries
// ============================================================================

struct MockShader {
    #[allow(dead_code)]
    info: ShaderInfo,
}

struct MockBuffer {
    usage: BufferUsage,
    bytes: Vec<u8>,
}

struct MockTexture {
    #[allow(dead_code)]
    info: TextureInfo,
}

struct MockWindow {
    backbuffer_count: u32,
    source: Arc<dyn WindowSource>,
    /// Back-buffer acquired by `next_frame`, pending `present`
    acquired: Option<u32>,
    /// Next back-buffer in rotation
    next_image: u32,
}

struct MockInputSet {
    target_render_pass: RenderPass,
    #[allow(dead_code)]
    set_index: u32,
}

struct MockRenderPass {
    target: RenderTarget,
    set_count: u32,
}

struct MockCommandBuffer {
    /// Human-readable command log, in recording order
    commands: Vec<String>,
    #[allow(dead_code)]
    render_pass: Option<RenderPass>,
}

struct MockRecording {
    commands: Vec<String>,
    render_pass: Option<RenderPass>,
    index_buffer_bound: bool,
}

// ============================================================================
// Mock device
// ============================================================================

/// In-memory GraphicsDevice implementation
pub struct MockDevice {
    shaders: SlotMap<Shader, MockShader>,
    buffers: SlotMap<Buffer, MockBuffer>,
    textures: SlotMap<Texture, MockTexture>,
    windows: SlotMap<Window, MockWindow>,
    input_sets: SlotMap<InputSet, MockInputSet>,
    render_passes: SlotMap<RenderPass, MockRenderPass>,
    command_buffers: SlotMap<CommandBuffer, MockCommandBuffer>,
    recording: Option<MockRecording>,
    /// Command buffers submitted via `execute`, in order
    pub executed: Vec<CommandBuffer>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            shaders: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            windows: SlotMap::with_key(),
            input_sets: SlotMap::with_key(),
            render_passes: SlotMap::with_key(),
            command_buffers: SlotMap::with_key(),
            recording: None,
            executed: Vec::new(),
        }
    }

    /// Read back the current contents of a buffer
    pub fn read_buffer(&self, buffer: Buffer) -> Result<Vec<u8>> {
        Ok(self
            .buffers
            .get(buffer)
            .ok_or(Error::InvalidHandle { kind: "Buffer" })?
            .bytes
            .clone())
    }

    /// Command log of a finalized command buffer
    pub fn recorded_commands(&self, command_buffer: CommandBuffer) -> Result<Vec<String>> {
        Ok(self
            .command_buffers
            .get(command_buffer)
            .ok_or(Error::InvalidHandle {
                kind: "CommandBuffer",
            })?
            .commands
            .clone())
    }

    /// Total number of live resource entries across all kinds
    pub fn live_resources(&self) -> usize {
        self.shaders.len()
            + self.buffers.len()
            + self.textures.len()
            + self.windows.len()
            + self.input_sets.len()
            + self.render_passes.len()
            + self.command_buffers.len()
    }

    fn framebuffer_count_of(&self, target: RenderTarget) -> Result<u32> {
        match target {
            RenderTarget::Texture(texture) => {
                self.textures
                    .get(texture)
                    .ok_or(Error::InvalidHandle { kind: "Texture" })?;
                Ok(1)
            }
            RenderTarget::Window(window) => Ok(self
                .windows
                .get(window)
                .ok_or(Error::InvalidHandle { kind: "Window" })?
                .backbuffer_count),
        }
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockDevice {
    fn create_shader(&mut self, info: &ShaderInfo) -> Result<Shader> {
        if info.src.is_empty() || info.src.len() % 4 != 0 {
            return Err(Error::BackendError(
                "Shader binary must be a non-empty multiple of 4 bytes".to_string(),
            ));
        }
        Ok(self.shaders.insert(MockShader { info: info.clone() }))
    }

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Buffer> {
        if info.usage.is_empty() {
            gfx_bail!(SOURCE, "create_buffer: empty usage flags");
        }
        if info.data.is_empty() {
            gfx_bail!(SOURCE, "create_buffer: empty initial data");
        }
        Ok(self.buffers.insert(MockBuffer {
            usage: info.usage,
            bytes: info.data.clone(),
        }))
    }

    fn create_texture(&mut self, info: &TextureInfo) -> Result<Texture> {
        let expected = info.width as usize * info.height as usize
            * info.format.bytes_per_pixel() as usize;
        if !info.data.is_empty() && info.data.len() != expected {
            gfx_bail!(
                SOURCE,
                "create_texture: data size {} does not match {}x{} ({} bytes)",
                info.data.len(),
                info.width,
                info.height,
                expected
            );
        }
        Ok(self.textures.insert(MockTexture { info: info.clone() }))
    }

    fn create_window(
        &mut self,
        info: &WindowInfo,
        source: Arc<dyn WindowSource>,
    ) -> Result<Window> {
        Ok(self.windows.insert(MockWindow {
            backbuffer_count: info.framebuffer_count.max(1),
            source,
            acquired: None,
            next_image: 0,
        }))
    }

    fn create_input_set(&mut self, info: &InputSetInfo) -> Result<InputSet> {
        let pass = self
            .render_passes
            .get(info.target_render_pass)
            .ok_or(Error::InvalidHandle { kind: "RenderPass" })?;
        if info.set_index >= pass.set_count {
            gfx_bail!(
                SOURCE,
                "create_input_set: set index {} out of range (layout has {} sets)",
                info.set_index,
                pass.set_count
            );
        }
        for binding in &info.bindings {
            match binding.resource {
                BindingResource::Buffer(buffer) => {
                    self.buffers
                        .get(buffer)
                        .ok_or(Error::InvalidHandle { kind: "Buffer" })?;
                }
                BindingResource::Texture(texture) => {
                    self.textures
                        .get(texture)
                        .ok_or(Error::InvalidHandle { kind: "Texture" })?;
                }
            }
        }
        Ok(self.input_sets.insert(MockInputSet {
            target_render_pass: info.target_render_pass,
            set_index: info.set_index,
        }))
    }

    fn create_render_pass(&mut self, info: &RenderPassInfo) -> Result<RenderPass> {
        if info.shader_stages.is_empty() {
            gfx_bail!(SOURCE, "create_render_pass: empty shader stage list");
        }
        for &shader in &info.shader_stages {
            self.shaders
                .get(shader)
                .ok_or(Error::InvalidHandle { kind: "Shader" })?;
        }
        self.framebuffer_count_of(info.render_target)?;
        Ok(self.render_passes.insert(MockRenderPass {
            target: info.render_target,
            set_count: info.input_layout.set_layouts.len() as u32,
        }))
    }

    fn begin_command_buffer(&mut self, _info: &CommandBufferInfo) -> Result<()> {
        if self.recording.is_some() {
            gfx_bail!(SOURCE, "begin_command_buffer: a recording is already open");
        }
        self.recording = Some(MockRecording {
            commands: vec!["begin".to_string()],
            render_pass: None,
            index_buffer_bound: false,
        });
        Ok(())
    }

    fn set_render_pass(&mut self, render_pass: RenderPass, framebuffer_index: u32) -> Result<()> {
        let target = self
            .render_passes
            .get(render_pass)
            .ok_or(Error::InvalidHandle { kind: "RenderPass" })?
            .target;
        let framebuffer_count = self.framebuffer_count_of(target)?;
        if framebuffer_index >= framebuffer_count {
            gfx_bail!(
                SOURCE,
                "set_render_pass: framebuffer index {} out of range (count: {})",
                framebuffer_index,
                framebuffer_count
            );
        }
        let Some(recording) = self.recording.as_mut() else {
            gfx_bail!(SOURCE, "set_render_pass: no open recording");
        };
        recording
            .commands
            .push(format!("set_render_pass[{}]", framebuffer_index));
        recording.render_pass = Some(render_pass);
        recording.index_buffer_bound = false;
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: Buffer) -> Result<()> {
        let entry = self
            .buffers
            .get(buffer)
            .ok_or(Error::InvalidHandle { kind: "Buffer" })?;
        if !entry.usage.contains(BufferUsage::VERTEX) {
            gfx_bail!(SOURCE, "bind_vertex_buffer: buffer lacks VERTEX usage");
        }
        let Some(recording) = self.recording.as_mut() else {
            gfx_bail!(SOURCE, "bind_vertex_buffer: no open recording");
        };
        if recording.render_pass.is_none() {
            gfx_bail!(SOURCE, "bind_vertex_buffer: no render pass bound");
        }
        recording.commands.push("bind_vertex_buffer".to_string());
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: Buffer) -> Result<()> {
        let entry = self
            .buffers
            .get(buffer)
            .ok_or(Error::InvalidHandle { kind: "Buffer" })?;
        if !entry.usage.contains(BufferUsage::INDEX) {
            gfx_bail!(SOURCE, "bind_index_buffer: buffer lacks INDEX usage");
        }
        let Some(recording) = self.recording.as_mut() else {
            gfx_bail!(SOURCE, "bind_index_buffer: no open recording");
        };
        if recording.render_pass.is_none() {
            gfx_bail!(SOURCE, "bind_index_buffer: no render pass bound");
        }
        recording.commands.push("bind_index_buffer".to_string());
        recording.index_buffer_bound = true;
        Ok(())
    }

    fn bind_input_set(&mut self, input_set: InputSet) -> Result<()> {
        let target = self
            .input_sets
            .get(input_set)
            .ok_or(Error::InvalidHandle { kind: "InputSet" })?
            .target_render_pass;
        let Some(recording) = self.recording.as_mut() else {
            gfx_bail!(SOURCE, "bind_input_set: no open recording");
        };
        match recording.render_pass {
            None => gfx_bail!(SOURCE, "bind_input_set: no render pass bound"),
            Some(bound) if bound != target => gfx_bail!(
                SOURCE,
                "bind_input_set: input set targets a different render pass"
            ),
            Some(_) => {}
        }
        recording.commands.push("bind_input_set".to_string());
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        let Some(recording) = self.recording.as_mut() else {
            gfx_bail!(SOURCE, "draw: no open recording");
        };
        if recording.render_pass.is_none() {
            gfx_bail!(SOURCE, "draw: no render pass bound");
        }
        recording
            .commands
            .push(format!("draw({}, {})", vertex_count, first_vertex));
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        vertex_offset: u32,
    ) -> Result<()> {
        let Some(recording) = self.recording.as_mut() else {
            gfx_bail!(SOURCE, "draw_indexed: no open recording");
        };
        if recording.render_pass.is_none() {
            gfx_bail!(SOURCE, "draw_indexed: no render pass bound");
        }
        if !recording.index_buffer_bound {
            gfx_bail!(SOURCE, "draw_indexed: no index buffer bound");
        }
        recording.commands.push(format!(
            "draw_indexed({}, {}, {})",
            index_count, first_index, vertex_offset
        ));
        Ok(())
    }

    fn end_command_buffer(&mut self) -> Result<CommandBuffer> {
        let Some(mut recording) = self.recording.take() else {
            gfx_bail!(SOURCE, "end_command_buffer: no open recording");
        };
        recording.commands.push("end".to_string());
        Ok(self.command_buffers.insert(MockCommandBuffer {
            commands: recording.commands,
            render_pass: recording.render_pass,
        }))
    }

    fn execute(&mut self, command_buffer: CommandBuffer) -> Result<()> {
        self.command_buffers
            .get(command_buffer)
            .ok_or(Error::InvalidHandle {
                kind: "CommandBuffer",
            })?;
        self.executed.push(command_buffer);
        Ok(())
    }

    fn update_buffer(&mut self, buffer: Buffer, data: &[u8], offset: u64) -> Result<()> {
        let entry = self
            .buffers
            .get_mut(buffer)
            .ok_or(Error::InvalidHandle { kind: "Buffer" })?;
        let end = offset as usize + data.len();
        if end > entry.bytes.len() {
            return Err(gfx_violation!(
                SOURCE,
                "update_buffer: range [{}, {}) exceeds buffer size {}",
                offset,
                end,
                entry.bytes.len()
            ));
        }
        entry.bytes[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn backbuffer_count(&self, window: Window) -> Result<u32> {
        Ok(self
            .windows
            .get(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?
            .backbuffer_count)
    }

    fn next_frame(&mut self, window: Window) -> Result<u32> {
        let entry = self
            .windows
            .get_mut(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?;
        let index = entry.next_image;
        entry.acquired = Some(index);
        entry.next_image = (index + 1) % entry.backbuffer_count;
        Ok(index)
    }

    fn present(&mut self, window: Window) -> Result<()> {
        let entry = self
            .windows
            .get_mut(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?;
        if entry.acquired.take().is_none() {
            gfx_bail!(SOURCE, "present: no back-buffer acquired via next_frame");
        }
        Ok(())
    }

    fn set_window_title(&mut self, window: Window, title: &str) -> Result<()> {
        let entry = self
            .windows
            .get_mut(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?;
        entry.source.set_title(title);
        Ok(())
    }

    fn window_should_close(&self, window: Window) -> Result<bool> {
        Ok(self
            .windows
            .get(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?
            .source
            .should_close())
    }

    fn key_down(&self, window: Window, key: Key) -> Result<bool> {
        Ok(self
            .windows
            .get(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?
            .source
            .key_down(key))
    }

    fn mouse_position(&self, window: Window) -> Result<(i32, i32)> {
        Ok(self
            .windows
            .get(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?
            .source
            .mouse_position())
    }

    fn free_shader(&mut self, shader: Shader) -> Result<()> {
        self.shaders
            .remove(shader)
            .ok_or(Error::InvalidHandle { kind: "Shader" })?;
        Ok(())
    }

    fn free_buffer(&mut self, buffer: Buffer) -> Result<()> {
        self.buffers
            .remove(buffer)
            .ok_or(Error::InvalidHandle { kind: "Buffer" })?;
        Ok(())
    }

    fn free_texture(&mut self, texture: Texture) -> Result<()> {
        self.textures
            .remove(texture)
            .ok_or(Error::InvalidHandle { kind: "Texture" })?;
        Ok(())
    }

    fn free_window(&mut self, window: Window) -> Result<()> {
        self.windows
            .remove(window)
            .ok_or(Error::InvalidHandle { kind: "Window" })?;
        Ok(())
    }

    fn free_input_set(&mut self, input_set: InputSet) -> Result<()> {
        self.input_sets
            .remove(input_set)
            .ok_or(Error::InvalidHandle { kind: "InputSet" })?;
        Ok(())
    }

    fn free_render_pass(&mut self, render_pass: RenderPass) -> Result<()> {
        self.render_passes
            .remove(render_pass)
            .ok_or(Error::InvalidHandle { kind: "RenderPass" })?;
        Ok(())
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBuffer) -> Result<()> {
        self.command_buffers
            .remove(command_buffer)
            .ok_or(Error::InvalidHandle {
                kind: "CommandBuffer",
            })?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
