use crate::null::RivetBufferNull;
use crate::RivetBufferDef;

/// A buffer is a piece of memory that can be accessed by the GPU.
///
/// Buffers are destroyed explicitly with `RivetDeviceContext::destroy_buffer`. They must not be
/// destroyed while commands that reference them are still pending.
#[derive(Debug)]
pub enum RivetBuffer {
    Null(RivetBufferNull),
}

impl RivetBuffer {
    pub fn buffer_def(&self) -> &RivetBufferDef {
        match self {
            RivetBuffer::Null(inner) => inner.buffer_def(),
        }
    }

    /// Get the underlying null backend buffer
    pub fn null_buffer(&self) -> Option<&RivetBufferNull> {
        match self {
            RivetBuffer::Null(inner) => Some(inner),
        }
    }
}
