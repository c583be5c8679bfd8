#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Information about the device, mostly limits and flags to indicate whether certain features are
/// supported
#[derive(Clone, Debug)]
pub struct RivetDeviceInfo {
    pub backend_name: &'static str,
    pub supports_multithreaded_usage: bool,
    pub max_vertex_attribute_count: u32,
    pub max_texture_slots: u32,
}

/// The kinds of native objects a backend hands out. Used for bookkeeping and debug output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RivetObjectType {
    Buffer,
    Texture,
    Sampler,
    Shader,
    VertexArray,
}

bitflags::bitflags! {
    /// Indicates how a resource will be used. In some cases, multiple flags are allowed.
    #[derive(Default)]
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct RivetResourceType: u32 {
        const UNDEFINED = 0;
        const SAMPLER = 1<<0;
        const TEXTURE = 1<<1;
        const UNIFORM_BUFFER = 1<<2;
        const VERTEX_BUFFER = 1<<3;
        const INDEX_BUFFER = 1<<4;
        const RENDER_TARGET_COLOR = 1<<5;
        const RENDER_TARGET_DEPTH_STENCIL = 1<<6;
    }
}

bitflags::bitflags! {
    /// Indicates a particular stage of a shader, or set of stages in a shader.
    #[derive(Default)]
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct RivetShaderStageFlags : u32 {
        const NONE = 0;
        const VERTEX = 1;
        const GEOMETRY = 2;
        const FRAGMENT = 4;
        const COMPUTE = 8;
        const ALL_GRAPHICS = 0x7;
    }
}

/// Pixel layout of a texture. Only the handful of formats the engine uses are exposed.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum RivetFormat {
    UNDEFINED,
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
}

impl Default for RivetFormat {
    fn default() -> Self {
        RivetFormat::UNDEFINED
    }
}

impl RivetFormat {
    pub fn block_size_in_bytes(self) -> u32 {
        match self {
            RivetFormat::UNDEFINED => 0,
            RivetFormat::R8_UNORM => 1,
            RivetFormat::R8G8B8A8_UNORM
            | RivetFormat::R8G8B8A8_SRGB
            | RivetFormat::R32_SFLOAT
            | RivetFormat::D32_SFLOAT
            | RivetFormat::D24_UNORM_S8_UINT => 4,
            RivetFormat::R16G16B16A16_SFLOAT => 8,
        }
    }

    pub fn is_depth(self) -> bool {
        match self {
            RivetFormat::D32_SFLOAT | RivetFormat::D24_UNORM_S8_UINT => true,
            _ => false,
        }
    }
}

/// Width/height/depth of a texture
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RivetExtents3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl RivetExtents3D {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

/// Filtering method when sampling
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum RivetFilterType {
    Nearest,
    Linear,
}

impl Default for RivetFilterType {
    fn default() -> Self {
        RivetFilterType::Linear
    }
}

/// Affects image sampling when UVs fall outside the [0, 1] range
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum RivetAddressMode {
    Repeat,
    Mirror,
    ClampToEdge,
}

impl Default for RivetAddressMode {
    fn default() -> Self {
        RivetAddressMode::Repeat
    }
}

/// Width of the elements in an index buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RivetIndexType {
    Uint16,
    Uint32,
}

impl RivetIndexType {
    pub fn index_size_in_bytes(self) -> u64 {
        match self {
            RivetIndexType::Uint16 => 2,
            RivetIndexType::Uint32 => 4,
        }
    }
}

/// A clear color, RGBA
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RivetColorClearValue(pub [f32; 4]);

/// Counters kept by a device context. All values are totals since the device was created, except
/// `live_objects`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RivetDeviceStats {
    pub live_objects: usize,
    pub created_objects: u64,
    pub destroyed_objects: u64,
    pub failed_creations: u64,
}

/// Counters kept by a command context
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RivetContextStats {
    pub frames: u64,
    pub draw_calls: u64,
    pub vertices_drawn: u64,
    pub clears: u64,
    pub bytes_uploaded: u64,
    pub vertex_arrays_created: u64,
    pub vertex_arrays_collected: u64,
    pub cached_vertex_arrays: usize,
}
