/// Command recording state machine
///
/// Tracks the sub-state of the single open recording: whether a render pass
/// is bound, and whether an index buffer has been bound since. The state
/// transitions are pure bookkeeping so the rules can be tested without a
/// device; the Vulkan command emission sits on top of this in
/// `vulkan_device.rs`.

use nebula_gfx::gfx_violation;
use nebula_gfx::{RenderPass, Result};

const SOURCE: &str = "nebula::vulkan";

/// Render-pass-bound/unbound sub-state of an open recording
#[derive(Debug)]
pub(crate) struct RecordingState {
    render_pass: Option<RenderPass>,
    index_buffer_bound: bool,
}

impl RecordingState {
    pub fn new() -> Self {
        Self {
            render_pass: None,
            index_buffer_bound: false,
        }
    }

    /// Currently bound render pass, if any
    pub fn render_pass(&self) -> Option<RenderPass> {
        self.render_pass
    }

    /// Enter the bound sub-state for `render_pass`
    ///
    /// Bindings belong to the pass scope, so switching passes drops the
    /// index-buffer binding.
    pub fn bind_render_pass(&mut self, render_pass: RenderPass) {
        self.render_pass = Some(render_pass);
        self.index_buffer_bound = false;
    }

    /// Record that an index buffer was bound in the current pass scope
    pub fn note_index_buffer(&mut self) {
        self.index_buffer_bound = true;
    }

    /// The render pass required by a bind or draw call
    pub fn require_render_pass(&self, operation: &str) -> Result<RenderPass> {
        self.render_pass
            .ok_or_else(|| gfx_violation!(SOURCE, "{}: no render pass bound", operation))
    }

    /// The index buffer required by `draw_indexed`
    pub fn require_index_buffer(&self, operation: &str) -> Result<()> {
        if !self.index_buffer_bound {
            return Err(gfx_violation!(
                SOURCE,
                "{}: no index buffer bound in the current render pass scope",
                operation
            ));
        }
        Ok(())
    }

    /// An input set may only be bound while its target render pass is active
    pub fn check_input_set_pairing(&self, target: RenderPass) -> Result<()> {
        let bound = self.require_render_pass("bind_input_set")?;
        if bound != target {
            return Err(gfx_violation!(
                SOURCE,
                "bind_input_set: input set was created against a different render pass"
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "recording_tests.rs"]
mod tests;
