use crate::null::RivetShaderNull;
use crate::RivetShaderStageFlags;

/// A linked set of shader stages
#[derive(Debug)]
pub enum RivetShader {
    Null(RivetShaderNull),
}

impl RivetShader {
    pub fn stage_flags(&self) -> RivetShaderStageFlags {
        match self {
            RivetShader::Null(inner) => inner.stage_flags(),
        }
    }

    pub fn null_shader(&self) -> Option<&RivetShaderNull> {
        match self {
            RivetShader::Null(inner) => Some(inner),
        }
    }
}
