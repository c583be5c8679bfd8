#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::{
    RivetAddressMode, RivetExtents3D, RivetFilterType, RivetFormat, RivetResourceType,
    RivetResult, RivetShaderStageFlags,
};

/// General configuration that all APIs will make best effort to respect
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RivetApiDef {
    /// Extra checking of object lifetimes and definitions. On by default in debug builds.
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub validation_enabled: bool,
}

impl Default for RivetApiDef {
    fn default() -> Self {
        RivetApiDef {
            validation_enabled: cfg!(debug_assertions),
        }
    }
}

/// Used to create a `RivetContext`
#[derive(Clone, Debug)]
pub struct RivetContextDef {
    /// Cached vertex arrays that go unused for this many `gc()` calls are destroyed
    pub vertex_array_time_to_keep: u64,
}

impl Default for RivetContextDef {
    fn default() -> Self {
        RivetContextDef {
            vertex_array_time_to_keep: 16,
        }
    }
}

/// Used to create a `RivetBuffer`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RivetBufferDef {
    pub size: u64,
    pub resource_type: RivetResourceType,
}

impl Default for RivetBufferDef {
    fn default() -> Self {
        RivetBufferDef {
            size: 0,
            resource_type: RivetResourceType::UNDEFINED,
        }
    }
}

impl RivetBufferDef {
    pub fn for_vertex_buffer(size: u64) -> RivetBufferDef {
        RivetBufferDef {
            size,
            resource_type: RivetResourceType::VERTEX_BUFFER,
        }
    }

    pub fn for_index_buffer(size: u64) -> RivetBufferDef {
        RivetBufferDef {
            size,
            resource_type: RivetResourceType::INDEX_BUFFER,
        }
    }

    pub fn for_uniform_buffer(size: u64) -> RivetBufferDef {
        RivetBufferDef {
            size,
            resource_type: RivetResourceType::UNIFORM_BUFFER,
        }
    }

    pub fn verify(&self) -> RivetResult<()> {
        if self.size == 0 {
            Err("buffer size must be non-zero")?;
        }

        if self.resource_type.is_empty() {
            Err("buffer resource type is undefined")?;
        }

        Ok(())
    }
}

/// Used to create a `RivetTexture`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RivetTextureDef {
    pub extents: RivetExtents3D,
    // Set to 6 for cubemaps
    pub array_length: u32,
    pub mip_count: u32,
    pub format: RivetFormat,
    pub resource_type: RivetResourceType,
}

impl Default for RivetTextureDef {
    fn default() -> Self {
        RivetTextureDef {
            extents: RivetExtents3D {
                width: 0,
                height: 0,
                depth: 0,
            },
            array_length: 1,
            mip_count: 1,
            format: RivetFormat::UNDEFINED,
            resource_type: RivetResourceType::TEXTURE,
        }
    }
}

impl RivetTextureDef {
    pub fn for_2d(
        width: u32,
        height: u32,
        format: RivetFormat,
    ) -> RivetTextureDef {
        RivetTextureDef {
            extents: RivetExtents3D {
                width,
                height,
                depth: 1,
            },
            format,
            ..Default::default()
        }
    }

    pub fn verify(&self) -> RivetResult<()> {
        if self.extents.is_empty() {
            Err(format!(
                "texture extents must be non-zero, got {:?}",
                self.extents
            ))?;
        }

        if self.format == RivetFormat::UNDEFINED {
            Err("texture format is undefined")?;
        }

        if self.mip_count == 0 || self.array_length == 0 {
            Err("texture mip count and array length must be at least 1")?;
        }

        let max_dimension = self.extents.width.max(self.extents.height);
        let max_mips = 32 - max_dimension.leading_zeros();
        if self.mip_count > max_mips {
            Err(format!(
                "texture of size {}x{} can have at most {} mips, {} requested",
                self.extents.width, self.extents.height, max_mips, self.mip_count
            ))?;
        }

        Ok(())
    }

    /// Bytes needed to hold the top mip of every layer
    pub fn base_level_size_in_bytes(&self) -> u64 {
        self.extents.width as u64
            * self.extents.height as u64
            * self.extents.depth as u64
            * self.array_length as u64
            * self.format.block_size_in_bytes() as u64
    }
}

/// Used to create a `RivetSampler`
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RivetSamplerDef {
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub min_filter: RivetFilterType,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub mag_filter: RivetFilterType,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub address_mode_u: RivetAddressMode,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub address_mode_v: RivetAddressMode,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub address_mode_w: RivetAddressMode,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub max_anisotropy: f32,
}

impl RivetSamplerDef {
    pub fn verify(&self) -> RivetResult<()> {
        if !(0.0..=16.0).contains(&self.max_anisotropy) {
            Err(format!(
                "sampler max_anisotropy must be within [0, 16], got {}",
                self.max_anisotropy
            ))?;
        }

        Ok(())
    }
}

/// One stage of a shader program. Source is opaque to rivet and handed to the backend as-is.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RivetShaderStageDef {
    pub shader_stage: RivetShaderStageFlags,
    pub entry_point: String,
    pub source: String,
}

impl RivetShaderStageDef {
    pub fn new(
        shader_stage: RivetShaderStageFlags,
        entry_point: &str,
        source: &str,
    ) -> Self {
        RivetShaderStageDef {
            shader_stage,
            entry_point: entry_point.to_string(),
            source: source.to_string(),
        }
    }

    /// Checks a full set of stages that will be linked into one shader
    pub fn verify_stages(stages: &[RivetShaderStageDef]) -> RivetResult<()> {
        if stages.is_empty() {
            Err("a shader requires at least one stage")?;
        }

        let mut seen = RivetShaderStageFlags::empty();
        for stage in stages {
            if stage.shader_stage.bits().count_ones() != 1 {
                Err(format!(
                    "each shader stage must name exactly one stage, got {:?}",
                    stage.shader_stage
                ))?;
            }

            if seen.intersects(stage.shader_stage) {
                Err(format!("shader stage {:?} given twice", stage.shader_stage))?;
            }
            seen |= stage.shader_stage;

            if stage.entry_point.is_empty() {
                Err(format!(
                    "shader stage {:?} has no entry point",
                    stage.shader_stage
                ))?;
            }

            if stage.source.is_empty() {
                Err(format!("shader stage {:?} has no source", stage.shader_stage))?;
            }
        }

        if seen.contains(RivetShaderStageFlags::COMPUTE) && seen != RivetShaderStageFlags::COMPUTE
        {
            Err("a compute stage cannot be combined with graphics stages")?;
        }

        Ok(())
    }
}
