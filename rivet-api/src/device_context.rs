use crate::null::RivetDeviceContextNull;
use crate::*;

fn backend_mismatch(object: &str) -> RivetError {
    RivetError::StringError(format!(
        "{} was created by a different backend than the device",
        object
    ))
}

/// A cloneable, thread-safe handle used to create and destroy native objects.
///
/// Every native object created through a device context must be handed back to `destroy_*` before
/// the `RivetApi` it came from is destroyed.
#[derive(Clone, Debug)]
pub enum RivetDeviceContext {
    Null(RivetDeviceContextNull),
}

impl RivetDeviceContext {
    /// Get metadata about the device
    pub fn device_info(&self) -> &RivetDeviceInfo {
        match self {
            RivetDeviceContext::Null(inner) => inner.device_info(),
        }
    }

    /// Number of native objects created and not yet destroyed
    pub fn live_object_count(&self) -> usize {
        match self {
            RivetDeviceContext::Null(inner) => inner.live_object_count(),
        }
    }

    pub fn stats(&self) -> RivetDeviceStats {
        match self {
            RivetDeviceContext::Null(inner) => inner.stats(),
        }
    }

    /// Create a command context. Contexts are owned by a single thread, usually the render thread.
    pub fn create_context(
        &self,
        context_def: &RivetContextDef,
    ) -> RivetResult<RivetContext> {
        Ok(match self {
            RivetDeviceContext::Null(inner) => {
                RivetContext::Null(inner.create_context(context_def)?)
            }
        })
    }

    /// Create a buffer
    pub fn create_buffer(
        &self,
        buffer_def: &RivetBufferDef,
    ) -> RivetResult<RivetBuffer> {
        Ok(match self {
            RivetDeviceContext::Null(inner) => RivetBuffer::Null(inner.create_buffer(buffer_def)?),
        })
    }

    /// Create a texture
    pub fn create_texture(
        &self,
        texture_def: &RivetTextureDef,
    ) -> RivetResult<RivetTexture> {
        Ok(match self {
            RivetDeviceContext::Null(inner) => {
                RivetTexture::Null(inner.create_texture(texture_def)?)
            }
        })
    }

    /// Create a sampler
    pub fn create_sampler(
        &self,
        sampler_def: &RivetSamplerDef,
    ) -> RivetResult<RivetSampler> {
        Ok(match self {
            RivetDeviceContext::Null(inner) => {
                RivetSampler::Null(inner.create_sampler(sampler_def)?)
            }
        })
    }

    /// Create a shader from one or more stages
    pub fn create_shader(
        &self,
        stages: Vec<RivetShaderStageDef>,
    ) -> RivetResult<RivetShader> {
        Ok(match self {
            RivetDeviceContext::Null(inner) => RivetShader::Null(inner.create_shader(stages)?),
        })
    }

    pub fn destroy_buffer(
        &self,
        buffer: RivetBuffer,
    ) -> RivetResult<()> {
        match (self, buffer) {
            (RivetDeviceContext::Null(inner), RivetBuffer::Null(buffer)) => {
                inner.destroy_buffer(buffer)
            }
            #[allow(unreachable_patterns)]
            _ => Err(backend_mismatch("buffer")),
        }
    }

    pub fn destroy_texture(
        &self,
        texture: RivetTexture,
    ) -> RivetResult<()> {
        match (self, texture) {
            (RivetDeviceContext::Null(inner), RivetTexture::Null(texture)) => {
                inner.destroy_texture(texture)
            }
            #[allow(unreachable_patterns)]
            _ => Err(backend_mismatch("texture")),
        }
    }

    pub fn destroy_sampler(
        &self,
        sampler: RivetSampler,
    ) -> RivetResult<()> {
        match (self, sampler) {
            (RivetDeviceContext::Null(inner), RivetSampler::Null(sampler)) => {
                inner.destroy_sampler(sampler)
            }
            #[allow(unreachable_patterns)]
            _ => Err(backend_mismatch("sampler")),
        }
    }

    pub fn destroy_shader(
        &self,
        shader: RivetShader,
    ) -> RivetResult<()> {
        match (self, shader) {
            (RivetDeviceContext::Null(inner), RivetShader::Null(shader)) => {
                inner.destroy_shader(shader)
            }
            #[allow(unreachable_patterns)]
            _ => Err(backend_mismatch("shader")),
        }
    }

    pub fn null_device_context(&self) -> Option<&RivetDeviceContextNull> {
        match self {
            RivetDeviceContext::Null(inner) => Some(inner),
        }
    }
}
