use crate::{
    RivetBufferDef, RivetSamplerDef, RivetShaderStageDef, RivetShaderStageFlags, RivetTextureDef,
};

// Native objects are deliberately not Clone. Each one is destroyed exactly once by passing it by
// value to the device context.

#[derive(Debug)]
pub struct RivetBufferNull {
    id: u64,
    buffer_def: RivetBufferDef,
}

impl RivetBufferNull {
    pub(super) fn new(
        id: u64,
        buffer_def: RivetBufferDef,
    ) -> Self {
        RivetBufferNull { id, buffer_def }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn buffer_def(&self) -> &RivetBufferDef {
        &self.buffer_def
    }
}

#[derive(Debug)]
pub struct RivetTextureNull {
    id: u64,
    texture_def: RivetTextureDef,
}

impl RivetTextureNull {
    pub(super) fn new(
        id: u64,
        texture_def: RivetTextureDef,
    ) -> Self {
        RivetTextureNull { id, texture_def }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn texture_def(&self) -> &RivetTextureDef {
        &self.texture_def
    }
}

#[derive(Debug)]
pub struct RivetSamplerNull {
    id: u64,
    sampler_def: RivetSamplerDef,
}

impl RivetSamplerNull {
    pub(super) fn new(
        id: u64,
        sampler_def: RivetSamplerDef,
    ) -> Self {
        RivetSamplerNull { id, sampler_def }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sampler_def(&self) -> &RivetSamplerDef {
        &self.sampler_def
    }
}

#[derive(Debug)]
pub struct RivetShaderNull {
    id: u64,
    stage_flags: RivetShaderStageFlags,
    stages: Vec<RivetShaderStageDef>,
}

impl RivetShaderNull {
    pub(super) fn new(
        id: u64,
        stages: Vec<RivetShaderStageDef>,
    ) -> Self {
        let mut stage_flags = RivetShaderStageFlags::empty();
        for stage in &stages {
            stage_flags |= stage.shader_stage;
        }

        RivetShaderNull {
            id,
            stage_flags,
            stages,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stage_flags(&self) -> RivetShaderStageFlags {
        self.stage_flags
    }

    pub fn stages(&self) -> &[RivetShaderStageDef] {
        &self.stages
    }
}
