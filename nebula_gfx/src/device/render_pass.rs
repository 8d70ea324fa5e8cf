/// Render pass creation info: render target, vertex layout, rasterizer and
/// binding layout configuration

use crate::device::texture::Format;
use crate::handle::{Shader, Texture, Window};

/// Depth comparison operation
///
/// `Ignore` disables depth testing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareOperation {
    #[default]
    Ignore,
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

/// Blend factor for color blending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Which attachments are cleared when the render pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearOperation {
    /// Keep previous contents
    #[default]
    None,
    /// Clear the color attachment
    Color,
    /// Clear the depth attachment
    Depth,
    /// Clear color and depth
    All,
}

impl ClearOperation {
    /// Whether the color attachment is cleared
    pub fn clears_color(self) -> bool {
        matches!(self, ClearOperation::Color | ClearOperation::All)
    }

    /// Whether the depth attachment is cleared
    pub fn clears_depth(self) -> bool {
        matches!(self, ClearOperation::Depth | ClearOperation::All)
    }
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
    All,
}

/// Winding order considered front-facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    Clockwise,
    CounterClockwise,
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonMode {
    #[default]
    Solid,
    Wireframe,
}

/// Resource kind bound at one binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    UniformBuffer,
    Sampler2D,
}

/// One vertex attribute: byte offset within the vertex plus its format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Byte offset of the attribute within one vertex
    pub offset: u32,
    /// Attribute format
    pub format: Format,
}

impl VertexAttribute {
    pub fn new(offset: u32, format: Format) -> Self {
        Self { offset, format }
    }
}

/// Layout of one interleaved vertex buffer
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    /// Size of one vertex in bytes (the binding stride)
    pub vertex_size: u32,
    /// Attributes in shader-location order
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(vertex_size: u32, attributes: Vec<VertexAttribute>) -> Self {
        Self {
            vertex_size,
            attributes,
        }
    }
}

/// Fixed-function rasterizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizerConfig {
    /// Depth comparison; `Ignore` disables depth testing
    pub depth_compare: CompareOperation,
    /// Whether color blending is enabled
    pub blend_enabled: bool,
    /// Source blend factor
    pub src_blend: BlendFactor,
    /// Destination blend factor
    pub dst_blend: BlendFactor,
    /// Front-facing winding order
    pub front_face: FrontFace,
    /// Face culling mode
    pub cull_mode: CullMode,
    /// Polygon fill mode
    pub polygon_mode: PolygonMode,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            depth_compare: CompareOperation::Ignore,
            blend_enabled: false,
            src_blend: BlendFactor::SrcAlpha,
            dst_blend: BlendFactor::OneMinusSrcAlpha,
            front_face: FrontFace::Clockwise,
            cull_mode: CullMode::None,
            polygon_mode: PolygonMode::Solid,
        }
    }
}

/// One binding slot in a set layout: its type and array length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingLayout {
    pub ty: BindingType,
    /// Array element count at this slot (1 for non-arrays)
    pub count: u32,
}

impl BindingLayout {
    pub fn new(ty: BindingType) -> Self {
        Self { ty, count: 1 }
    }

    pub fn with_count(ty: BindingType, count: u32) -> Self {
        Self { ty, count }
    }
}

/// Ordered binding slots of one descriptor set
#[derive(Debug, Clone, Default)]
pub struct SetLayout {
    pub binding_layouts: Vec<BindingLayout>,
}

impl SetLayout {
    pub fn new(binding_layouts: Vec<BindingLayout>) -> Self {
        Self { binding_layouts }
    }
}

/// Ordered descriptor-set layouts of a render pass
#[derive(Debug, Clone, Default)]
pub struct InputLayout {
    pub set_layouts: Vec<SetLayout>,
}

impl InputLayout {
    pub fn new(set_layouts: Vec<SetLayout>) -> Self {
        Self { set_layouts }
    }
}

/// Where a render pass draws to: exactly one of a texture or a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Draw into a texture, leaving it ready for shader reads
    Texture(Texture),
    /// Draw into a window's back-buffer chain for presentation
    Window(Window),
}

/// Descriptor for creating a render pass
///
/// A render pass is one fixed pipeline configuration; structurally distinct
/// infos never share native objects, and two calls with identical content
/// produce two independent, independently freeable passes.
#[derive(Debug, Clone)]
pub struct RenderPassInfo {
    /// Shader stage modules, in pipeline order (must not be empty)
    pub shader_stages: Vec<Shader>,
    /// Render target
    pub render_target: RenderTarget,
    /// Clear policy applied when the pass begins
    pub clear_operations: ClearOperation,
    /// Vertex buffer layout
    pub vertex_layout: VertexLayout,
    /// Fixed-function rasterizer configuration
    pub rasterizer_config: RasterizerConfig,
    /// Descriptor-set binding layout
    pub input_layout: InputLayout,
}

impl RenderPassInfo {
    pub fn new(shader_stages: Vec<Shader>, render_target: RenderTarget) -> Self {
        Self {
            shader_stages,
            render_target,
            clear_operations: ClearOperation::default(),
            vertex_layout: VertexLayout::default(),
            rasterizer_config: RasterizerConfig::default(),
            input_layout: InputLayout::default(),
        }
    }
}
