use crate::null::{RivetApiDefNull, RivetApiNull};
use crate::*;

/// Primary entry point to using the API. Use the `new_*` functions to initialize the desired
/// backend.
///
/// **This API object must persist for the lifetime of all objects created through it.** This
/// is verified when the API object is destroyed, either explicitly via `destroy()` or by dropping
/// the object.
///
/// Once the API object is created, use `device_context()` to obtain a cloneable handle to the
/// device. Every native object created through a device context must be destroyed before calling
/// `RivetApi::destroy()`.
pub enum RivetApi {
    Null(RivetApiNull),
}

impl RivetApi {
    /// Create a device using the default backend
    pub fn new(api_def: &RivetApiDef) -> RivetResult<Self> {
        RivetApi::new_null(api_def, &Default::default())
    }

    /// Initialize a headless device that tracks native objects without a GPU
    pub fn new_null(
        api_def: &RivetApiDef,
        null_api_def: &RivetApiDefNull,
    ) -> RivetResult<Self> {
        Ok(RivetApi::Null(RivetApiNull::new(api_def, null_api_def)?))
    }

    /// Create a cloneable handle to the device. Most of the interaction with the graphics backend
    /// is done through this handle.
    ///
    /// This context is intended to be safely shared across threads.
    pub fn device_context(&self) -> RivetDeviceContext {
        match self {
            RivetApi::Null(inner) => RivetDeviceContext::Null(inner.device_context().clone()),
        }
    }

    /// Destroys the graphics API instance. Fails if any native object created through this API is
    /// still alive.
    ///
    /// `destroy()` is automatically called if RivetApi is dropped and it has not yet been called,
    /// so it is not necessary to call this function explicitly.
    pub fn destroy(&mut self) -> RivetResult<()> {
        match self {
            RivetApi::Null(inner) => inner.destroy(),
        }
    }

    /// Get the underlying null API object
    pub fn null_api(&self) -> Option<&RivetApiNull> {
        match self {
            RivetApi::Null(inner) => Some(inner),
        }
    }
}
