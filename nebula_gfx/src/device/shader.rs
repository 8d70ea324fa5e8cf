/// Shader stage kind and creation info

/// Shader stage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
    /// Compute stage
    Compute,
}

/// Descriptor for creating a shader
///
/// The source is a compiled shader binary in the backend's native format
/// (SPIR-V for the Vulkan backend). Format correctness is the caller's
/// responsibility; it is not validated beyond the native load failing.
#[derive(Debug, Clone)]
pub struct ShaderInfo {
    /// Shader stage this module is compiled for
    pub ty: ShaderType,
    /// Compiled shader binary
    pub src: Vec<u8>,
}

impl ShaderInfo {
    pub fn new(ty: ShaderType, src: Vec<u8>) -> Self {
        Self { ty, src }
    }
}
