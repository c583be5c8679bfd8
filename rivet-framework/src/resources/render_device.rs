use super::{GpuBuffer, GpuResource, GpuResourceNative, GpuSampler, GpuShader, GpuTexture};
use crate::DeferredResourceSubmitter;
use rivet_api::{
    RivetBufferDef, RivetDeviceContext, RivetDeviceInfo, RivetSamplerDef, RivetShaderStageDef,
    RivetTextureDef,
};
use rivet_base::RefHandle;

/// Producer-facing device. Cloneable and usable from any thread.
///
/// `create_*` calls return immediately with a handle to a resource in the `Pending` state. The
/// native object is created on the render thread during the next frame, and destroyed there once
/// the last handle is dropped.
#[derive(Clone)]
pub struct RenderDevice {
    device_info: RivetDeviceInfo,
    submitter: DeferredResourceSubmitter<RivetDeviceContext>,
}

impl RenderDevice {
    pub fn new(
        device_context: &RivetDeviceContext,
        submitter: DeferredResourceSubmitter<RivetDeviceContext>,
    ) -> Self {
        RenderDevice {
            device_info: device_context.device_info().clone(),
            submitter,
        }
    }

    pub fn device_info(&self) -> &RivetDeviceInfo {
        &self.device_info
    }

    pub fn create_buffer(
        &self,
        buffer_def: &RivetBufferDef,
    ) -> RefHandle<GpuBuffer> {
        self.create_resource(buffer_def.clone())
    }

    pub fn create_texture(
        &self,
        texture_def: &RivetTextureDef,
    ) -> RefHandle<GpuTexture> {
        self.create_resource(texture_def.clone())
    }

    pub fn create_sampler(
        &self,
        sampler_def: &RivetSamplerDef,
    ) -> RefHandle<GpuSampler> {
        self.create_resource(sampler_def.clone())
    }

    pub fn create_shader(
        &self,
        stages: Vec<RivetShaderStageDef>,
    ) -> RefHandle<GpuShader> {
        self.create_resource(stages)
    }

    fn create_resource<N: GpuResourceNative>(
        &self,
        def: N::Def,
    ) -> RefHandle<GpuResource<N>> {
        log::debug!("Requesting {} {:?}", N::TYPE_NAME, def);
        let resource = RefHandle::new(GpuResource::<N>::new(def, self.submitter.clone()));

        let init_handle = resource.clone();
        self.submitter
            .submit_init(move |device_context| init_handle.initialize(device_context));

        resource
    }
}
