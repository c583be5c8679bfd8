use crate::null::RivetSamplerNull;
use crate::RivetSamplerDef;

/// Configures how images will be sampled by the GPU
#[derive(Debug)]
pub enum RivetSampler {
    Null(RivetSamplerNull),
}

impl RivetSampler {
    pub fn sampler_def(&self) -> &RivetSamplerDef {
        match self {
            RivetSampler::Null(inner) => inner.sampler_def(),
        }
    }

    pub fn null_sampler(&self) -> Option<&RivetSamplerNull> {
        match self {
            RivetSampler::Null(inner) => Some(inner),
        }
    }
}
