/// Input set creation info: resource bindings for one descriptor set

use crate::handle::{Buffer, RenderPass, Texture};

/// Resource bound at one slot: exactly one of a buffer or a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    Buffer(Buffer),
    Texture(Texture),
}

/// One resource binding within an input set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// The bound resource
    pub resource: BindingResource,
    /// Binding slot within the set
    pub slot: u32,
    /// Array element at the slot (0 for non-arrays)
    pub array_element: u32,
}

impl Binding {
    pub fn new(resource: BindingResource, slot: u32) -> Self {
        Self {
            resource,
            slot,
            array_element: 0,
        }
    }
}

/// Descriptor for creating an input set
///
/// The set is created against one render pass's binding layout and may only
/// be bound while that render pass is active.
#[derive(Debug, Clone)]
pub struct InputSetInfo {
    /// Render pass whose layout this set is allocated against
    pub target_render_pass: RenderPass,
    /// Descriptor-set index within the render pass's input layout
    pub set_index: u32,
    /// Ordered resource bindings
    pub bindings: Vec<Binding>,
}

impl InputSetInfo {
    pub fn new(target_render_pass: RenderPass, set_index: u32, bindings: Vec<Binding>) -> Self {
        Self {
            target_render_pass,
            set_index,
            bindings,
        }
    }
}
