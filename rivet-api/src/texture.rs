use crate::null::RivetTextureNull;
use crate::RivetTextureDef;

/// An image that can be sampled by shaders or used as a render target
#[derive(Debug)]
pub enum RivetTexture {
    Null(RivetTextureNull),
}

impl RivetTexture {
    pub fn texture_def(&self) -> &RivetTextureDef {
        match self {
            RivetTexture::Null(inner) => inner.texture_def(),
        }
    }

    pub fn null_texture(&self) -> Option<&RivetTextureNull> {
        match self {
            RivetTexture::Null(inner) => Some(inner),
        }
    }
}
