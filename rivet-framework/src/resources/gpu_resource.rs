use crate::DeferredResourceSubmitter;
use rivet_api::{
    RivetBuffer, RivetBufferDef, RivetDeviceContext, RivetError, RivetResult, RivetSampler,
    RivetSamplerDef, RivetShader, RivetShaderStageDef, RivetTexture, RivetTextureDef,
};
use rivet_base::{RefCount, RefCounted};
use std::sync::Mutex;

/// A native object type that can be wrapped by `GpuResource`. Ties the native object to its
/// definition and to the device context calls that create and destroy it.
pub trait GpuResourceNative: Send + Sync + Sized + 'static {
    type Def: Clone + std::fmt::Debug + Send + Sync + 'static;

    const TYPE_NAME: &'static str;

    fn create_native(
        device_context: &RivetDeviceContext,
        def: &Self::Def,
    ) -> RivetResult<Self>;

    fn destroy_native(
        self,
        device_context: &RivetDeviceContext,
    ) -> RivetResult<()>;
}

impl GpuResourceNative for RivetBuffer {
    type Def = RivetBufferDef;
    const TYPE_NAME: &'static str = "buffer";

    fn create_native(
        device_context: &RivetDeviceContext,
        def: &RivetBufferDef,
    ) -> RivetResult<Self> {
        device_context.create_buffer(def)
    }

    fn destroy_native(
        self,
        device_context: &RivetDeviceContext,
    ) -> RivetResult<()> {
        device_context.destroy_buffer(self)
    }
}

impl GpuResourceNative for RivetTexture {
    type Def = RivetTextureDef;
    const TYPE_NAME: &'static str = "texture";

    fn create_native(
        device_context: &RivetDeviceContext,
        def: &RivetTextureDef,
    ) -> RivetResult<Self> {
        device_context.create_texture(def)
    }

    fn destroy_native(
        self,
        device_context: &RivetDeviceContext,
    ) -> RivetResult<()> {
        device_context.destroy_texture(self)
    }
}

impl GpuResourceNative for RivetSampler {
    type Def = RivetSamplerDef;
    const TYPE_NAME: &'static str = "sampler";

    fn create_native(
        device_context: &RivetDeviceContext,
        def: &RivetSamplerDef,
    ) -> RivetResult<Self> {
        device_context.create_sampler(def)
    }

    fn destroy_native(
        self,
        device_context: &RivetDeviceContext,
    ) -> RivetResult<()> {
        device_context.destroy_sampler(self)
    }
}

impl GpuResourceNative for RivetShader {
    type Def = Vec<RivetShaderStageDef>;
    const TYPE_NAME: &'static str = "shader";

    fn create_native(
        device_context: &RivetDeviceContext,
        def: &Vec<RivetShaderStageDef>,
    ) -> RivetResult<Self> {
        device_context.create_shader(def.clone())
    }

    fn destroy_native(
        self,
        device_context: &RivetDeviceContext,
    ) -> RivetResult<()> {
        device_context.destroy_shader(self)
    }
}

/// Lifecycle of a `GpuResource` as seen from any thread
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceStatus {
    /// Init has been submitted but has not run yet
    Pending,
    /// The native object exists
    Ready,
    /// Native creation failed. The resource stays in this state, see `error_message()`.
    Failed,
    /// The native object has been destroyed
    Released,
}

enum NativeState<N> {
    Pending,
    Ready(N),
    Failed(RivetError),
    Released,
}

/// A reference counted wrapper around a native object that is created and destroyed on the render
/// thread at frame boundaries.
///
/// The wrapper exists (and can be shared and referenced by commands) immediately. Its native object
/// is created by an init callable submitted at construction, and destroyed by a release callable
/// submitted when the last `RefHandle` is dropped. The init callable holds a handle of its own, so
/// release can never run before init.
///
/// Native creation failures are recorded on the resource. Check `status()` before relying on the
/// native object.
pub struct GpuResource<N: GpuResourceNative> {
    ref_count: RefCount,
    def: N::Def,
    state: Mutex<NativeState<N>>,
    submitter: DeferredResourceSubmitter<RivetDeviceContext>,
}

pub type GpuBuffer = GpuResource<RivetBuffer>;
pub type GpuTexture = GpuResource<RivetTexture>;
pub type GpuSampler = GpuResource<RivetSampler>;
pub type GpuShader = GpuResource<RivetShader>;

impl<N: GpuResourceNative> GpuResource<N> {
    pub(crate) fn new(
        def: N::Def,
        submitter: DeferredResourceSubmitter<RivetDeviceContext>,
    ) -> Self {
        GpuResource {
            ref_count: RefCount::new(),
            def,
            state: Mutex::new(NativeState::Pending),
            submitter,
        }
    }

    pub fn def(&self) -> &N::Def {
        &self.def
    }

    pub fn status(&self) -> ResourceStatus {
        match &*self.state.lock().unwrap() {
            NativeState::Pending => ResourceStatus::Pending,
            NativeState::Ready(_) => ResourceStatus::Ready,
            NativeState::Failed(_) => ResourceStatus::Failed,
            NativeState::Released => ResourceStatus::Released,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ResourceStatus::Ready
    }

    /// The error recorded when native creation failed
    pub fn error_message(&self) -> Option<String> {
        match &*self.state.lock().unwrap() {
            NativeState::Failed(e) => Some(e.to_string()),
            _ => None,
        }
    }

    /// Run `f` with the native object. Fails if the resource is not ready. Intended to be called
    /// from commands running on the render thread.
    pub fn with_native<R, F: FnOnce(&N) -> RivetResult<R>>(
        &self,
        f: F,
    ) -> RivetResult<R> {
        match &*self.state.lock().unwrap() {
            NativeState::Ready(native) => (f)(native),
            NativeState::Pending => {
                Err(format!("{} is not initialized yet", N::TYPE_NAME).into())
            }
            NativeState::Failed(e) => {
                Err(format!("{} failed to initialize: {}", N::TYPE_NAME, e).into())
            }
            NativeState::Released => {
                Err(format!("{} was already released", N::TYPE_NAME).into())
            }
        }
    }

    // Runs on the render thread, from the init callable
    pub(crate) fn initialize(
        &self,
        device_context: &RivetDeviceContext,
    ) -> RivetResult<()> {
        profiling::scope!("GpuResource::initialize");
        let mut state = self.state.lock().unwrap();
        debug_assert!(matches!(*state, NativeState::Pending));

        match N::create_native(device_context, &self.def) {
            Ok(native) => {
                *state = NativeState::Ready(native);
                Ok(())
            }
            Err(e) => {
                *state = NativeState::Failed(e.clone());
                Err(format!(
                    "failed to create {} from {:?}: {}",
                    N::TYPE_NAME,
                    self.def,
                    e
                )
                .into())
            }
        }
    }

    // Runs on the render thread, from the release callable. Consumes the object.
    fn release(
        self: Box<Self>,
        device_context: &RivetDeviceContext,
    ) -> RivetResult<()> {
        profiling::scope!("GpuResource::release");
        let previous = std::mem::replace(&mut *self.state.lock().unwrap(), NativeState::Released);
        match previous {
            NativeState::Ready(native) => native.destroy_native(device_context),
            // Nothing was created, nothing to destroy
            NativeState::Failed(_) => Ok(()),
            NativeState::Pending => {
                // The init callable holds a reference, so this means init was discarded
                log::warn!("Releasing a {} whose init never ran", N::TYPE_NAME);
                Ok(())
            }
            NativeState::Released => unreachable!(),
        }
    }
}

impl<N: GpuResourceNative> RefCounted for GpuResource<N> {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn on_released(self: Box<Self>) {
        let submitter = self.submitter.clone();
        submitter.submit_release(move |device_context| self.release(device_context));
    }
}

impl<N: GpuResourceNative> std::fmt::Debug for GpuResource<N> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("GpuResource")
            .field("type", &N::TYPE_NAME)
            .field("status", &self.status())
            .field("def", &self.def)
            .finish()
    }
}
