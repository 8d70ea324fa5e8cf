/// Pixel formats, sampler configuration and texture creation info

/// Pixel and vertex attribute format
///
/// The finite set of channel-count / bit-width / numeric-representation
/// combinations supported by the abstraction: 1 to 4 channels, 8 or 32 bits
/// per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    R8_UINT,
    R8_SINT,
    R8_SRGB,
    R8_UNORM,
    R8_SNORM,
    R8G8_UINT,
    R8G8_SINT,
    R8G8_SRGB,
    R8G8_UNORM,
    R8G8_SNORM,
    R8G8B8_UINT,
    R8G8B8_SINT,
    R8G8B8_SRGB,
    R8G8B8_UNORM,
    R8G8B8_SNORM,
    R8G8B8A8_UINT,
    R8G8B8A8_SINT,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SNORM,
    R32_UINT,
    R32_SINT,
    R32_SFLOAT,
    R32G32_UINT,
    R32G32_SINT,
    R32G32_SFLOAT,
    R32G32B32_UINT,
    R32G32B32_SINT,
    R32G32B32_SFLOAT,
    R32G32B32A32_UINT,
    R32G32B32A32_SINT,
    R32G32B32A32_SFLOAT,
}

impl Format {
    /// Size of one pixel (or vertex attribute) of this format, in bytes
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Format::R8_UINT
            | Format::R8_SINT
            | Format::R8_SRGB
            | Format::R8_UNORM
            | Format::R8_SNORM => 1,
            Format::R8G8_UINT
            | Format::R8G8_SINT
            | Format::R8G8_SRGB
            | Format::R8G8_UNORM
            | Format::R8G8_SNORM => 2,
            Format::R8G8B8_UINT
            | Format::R8G8B8_SINT
            | Format::R8G8B8_SRGB
            | Format::R8G8B8_UNORM
            | Format::R8G8B8_SNORM => 3,
            Format::R8G8B8A8_UINT
            | Format::R8G8B8A8_SINT
            | Format::R8G8B8A8_SRGB
            | Format::R8G8B8A8_UNORM
            | Format::R8G8B8A8_SNORM
            | Format::R32_UINT
            | Format::R32_SINT
            | Format::R32_SFLOAT => 4,
            Format::R32G32_UINT | Format::R32G32_SINT | Format::R32G32_SFLOAT => 8,
            Format::R32G32B32_UINT | Format::R32G32B32_SINT | Format::R32G32B32_SFLOAT => 12,
            Format::R32G32B32A32_UINT
            | Format::R32G32B32A32_SINT
            | Format::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Sampler filter mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerMode {
    /// Nearest-neighbor filtering
    #[default]
    Nearest,
    /// Linear filtering
    Linear,
}

/// Sampler edge behavior outside [0, 1] texture coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Clamp to the border color
    #[default]
    ClampBorder,
    /// Clamp to the edge texel
    ClampEdge,
    /// Repeat the texture
    Repeat,
    /// Repeat the texture, mirrored
    RepeatMirror,
}

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Initial pixel data (raw bytes). If non-empty, the length must equal
    /// `width * height * format.bytes_per_pixel()`. Empty leaves the texture
    /// uninitialized, e.g. for use as a render target.
    pub data: Vec<u8>,
    /// Pixel format
    pub format: Format,
    /// Sampler filter mode
    pub sampler_mode: SamplerMode,
    /// Sampler edge behavior
    pub repeat_mode: RepeatMode,
}

impl TextureInfo {
    pub fn new(width: u32, height: u32, format: Format) -> Self {
        Self {
            width,
            height,
            data: Vec::new(),
            format,
            sampler_mode: SamplerMode::default(),
            repeat_mode: RepeatMode::default(),
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}
