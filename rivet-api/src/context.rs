use crate::null::RivetContextNull;
use crate::*;

fn backend_mismatch(object: &str) -> RivetError {
    RivetError::StringError(format!(
        "{} was created by a different backend than the context",
        object
    ))
}

/// Records and executes work on the render thread. Unlike `RivetDeviceContext`, this is not
/// cloneable and must only be used by the thread that owns it.
///
/// All recording calls must happen between `begin_frame()` and `end_frame()`. Bindings are reset
/// at the end of every frame.
pub enum RivetContext {
    Null(RivetContextNull),
}

impl RivetContext {
    pub fn begin_frame(&mut self) {
        match self {
            RivetContext::Null(inner) => inner.begin_frame(),
        }
    }

    pub fn end_frame(&mut self) {
        match self {
            RivetContext::Null(inner) => inner.end_frame(),
        }
    }

    pub fn in_frame(&self) -> bool {
        match self {
            RivetContext::Null(inner) => inner.in_frame(),
        }
    }

    pub fn clear(
        &mut self,
        color: RivetColorClearValue,
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => inner.clear(color),
        }
    }

    pub fn bind_shader(
        &mut self,
        shader: &RivetShader,
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => {
                inner.bind_shader(shader.null_shader().ok_or_else(|| backend_mismatch("shader"))?)
            }
        }
    }

    /// Binds a set of vertex buffers. The vertex array object for this combination of buffers is
    /// created on first use and cached until it goes unused for the configured number of `gc()`
    /// calls.
    pub fn bind_vertex_buffers(
        &mut self,
        buffers: &[&RivetBuffer],
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => {
                let buffers = buffers
                    .iter()
                    .map(|x| x.null_buffer().ok_or_else(|| backend_mismatch("buffer")))
                    .collect::<RivetResult<Vec<_>>>()?;
                inner.bind_vertex_buffers(&buffers)
            }
        }
    }

    pub fn bind_index_buffer(
        &mut self,
        buffer: &RivetBuffer,
        index_type: RivetIndexType,
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => inner.bind_index_buffer(
                buffer
                    .null_buffer()
                    .ok_or_else(|| backend_mismatch("buffer"))?,
                index_type,
            ),
        }
    }

    pub fn bind_texture(
        &mut self,
        slot: u32,
        texture: &RivetTexture,
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => inner.bind_texture(
                slot,
                texture
                    .null_texture()
                    .ok_or_else(|| backend_mismatch("texture"))?,
            ),
        }
    }

    pub fn update_buffer(
        &mut self,
        buffer: &RivetBuffer,
        offset: u64,
        data: &[u8],
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => inner.update_buffer(
                buffer
                    .null_buffer()
                    .ok_or_else(|| backend_mismatch("buffer"))?,
                offset,
                data,
            ),
        }
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        first_vertex: u32,
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => inner.draw(vertex_count, first_vertex),
        }
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
    ) -> RivetResult<()> {
        match self {
            RivetContext::Null(inner) => inner.draw_indexed(index_count, first_index),
        }
    }

    /// Collect backend objects cached by this context that have outlived their time to keep.
    /// Returns the number of objects destroyed.
    pub fn gc(&mut self) -> usize {
        match self {
            RivetContext::Null(inner) => inner.gc(),
        }
    }

    /// Destroy every cached backend object regardless of age
    pub fn clear_cache(&mut self) -> usize {
        match self {
            RivetContext::Null(inner) => inner.clear_cache(),
        }
    }

    pub fn stats(&self) -> RivetContextStats {
        match self {
            RivetContext::Null(inner) => inner.stats(),
        }
    }

    pub fn null_context(&self) -> Option<&RivetContextNull> {
        match self {
            RivetContext::Null(inner) => Some(inner),
        }
    }
}
