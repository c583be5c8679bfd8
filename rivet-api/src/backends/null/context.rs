use super::{RivetBufferNull, RivetDeviceContextNull, RivetShaderNull, RivetTextureNull};
use crate::internal_shared::FrameCache;
use crate::{
    RivetColorClearValue, RivetContextDef, RivetContextStats, RivetIndexType, RivetObjectType,
    RivetResourceType, RivetResult, RivetShaderStageFlags,
};
use fnv::FnvHasher;
use std::hash::{Hash, Hasher};

struct BoundVertexArray {
    id: u64,
    // Smallest bound vertex buffer, draws must stay inside of it
    min_buffer_size: u64,
}

struct BoundIndexBuffer {
    id: u64,
    size: u64,
    index_type: RivetIndexType,
}

/// Render-thread-only command context. Tracks binding state so that draws can be validated, and
/// caches vertex arrays keyed by the set of vertex buffers bound together.
pub struct RivetContextNull {
    device_context: RivetDeviceContextNull,
    vertex_array_cache: FrameCache<u64>,
    in_frame: bool,
    bound_shader: Option<u64>,
    bound_vertex_array: Option<BoundVertexArray>,
    bound_index_buffer: Option<BoundIndexBuffer>,
    bound_textures: Vec<Option<u64>>,
    stats: RivetContextStats,
}

impl RivetContextNull {
    pub(crate) fn new(
        device_context: RivetDeviceContextNull,
        context_def: &RivetContextDef,
    ) -> Self {
        let texture_slot_count = device_context.device_info().max_texture_slots as usize;
        RivetContextNull {
            device_context,
            vertex_array_cache: FrameCache::new(context_def.vertex_array_time_to_keep),
            in_frame: false,
            bound_shader: None,
            bound_vertex_array: None,
            bound_index_buffer: None,
            bound_textures: vec![None; texture_slot_count],
            stats: Default::default(),
        }
    }

    pub fn device_context(&self) -> &RivetDeviceContextNull {
        &self.device_context
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn stats(&self) -> RivetContextStats {
        let mut stats = self.stats;
        stats.cached_vertex_arrays = self.vertex_array_cache.len();
        stats
    }

    pub fn begin_frame(&mut self) {
        assert!(
            !self.in_frame,
            "begin_frame called twice without a matching end_frame"
        );
        self.in_frame = true;
    }

    pub fn end_frame(&mut self) {
        assert!(self.in_frame, "end_frame called without begin_frame");
        self.in_frame = false;
        self.stats.frames += 1;

        // Bindings never carry over between frames
        self.bound_shader = None;
        self.bound_vertex_array = None;
        self.bound_index_buffer = None;
        for slot in &mut self.bound_textures {
            *slot = None;
        }
    }

    fn require_frame(
        &self,
        operation: &str,
    ) -> RivetResult<()> {
        if !self.in_frame {
            Err(format!("{} recorded outside of a frame", operation))?;
        }

        Ok(())
    }

    pub fn clear(
        &mut self,
        _color: RivetColorClearValue,
    ) -> RivetResult<()> {
        self.require_frame("clear")?;
        self.stats.clears += 1;
        Ok(())
    }

    pub fn bind_shader(
        &mut self,
        shader: &RivetShaderNull,
    ) -> RivetResult<()> {
        self.require_frame("bind_shader")?;
        if !shader
            .stage_flags()
            .contains(RivetShaderStageFlags::VERTEX | RivetShaderStageFlags::FRAGMENT)
        {
            Err(format!(
                "shader {} cannot be bound for drawing, it only has stages {:?}",
                shader.id(),
                shader.stage_flags()
            ))?;
        }

        self.bound_shader = Some(shader.id());
        Ok(())
    }

    pub fn bind_vertex_buffers(
        &mut self,
        buffers: &[&RivetBufferNull],
    ) -> RivetResult<()> {
        profiling::scope!("RivetContextNull::bind_vertex_buffers");
        self.require_frame("bind_vertex_buffers")?;
        if buffers.is_empty() {
            Err("at least one vertex buffer must be bound")?;
        }

        let max_attributes = self.device_context.device_info().max_vertex_attribute_count;
        if buffers.len() > max_attributes as usize {
            Err(format!(
                "{} vertex buffers bound but the device supports {}",
                buffers.len(),
                max_attributes
            ))?;
        }

        if self.device_context.validation_enabled() {
            for buffer in buffers {
                if !buffer
                    .buffer_def()
                    .resource_type
                    .contains(RivetResourceType::VERTEX_BUFFER)
                {
                    Err(format!(
                        "buffer {} bound as a vertex buffer but was created as {:?}",
                        buffer.id(),
                        buffer.buffer_def().resource_type
                    ))?;
                }
            }
        }

        let mut hasher = FnvHasher::default();
        for buffer in buffers {
            buffer.id().hash(&mut hasher);
        }
        let hash = hasher.finish();

        let device_context = &self.device_context;
        let stats = &mut self.stats;
        let vertex_array_id = self.vertex_array_cache.get_or_create(hash, || {
            let id = device_context.allocate_object(RivetObjectType::VertexArray)?;
            log::trace!("Created vertex array {} for {} buffers", id, buffers.len());
            stats.vertex_arrays_created += 1;
            Ok(id)
        })?;

        let min_buffer_size = buffers
            .iter()
            .map(|x| x.buffer_def().size)
            .min()
            .unwrap_or(0);
        self.bound_vertex_array = Some(BoundVertexArray {
            id: vertex_array_id,
            min_buffer_size,
        });
        Ok(())
    }

    pub fn bind_index_buffer(
        &mut self,
        buffer: &RivetBufferNull,
        index_type: RivetIndexType,
    ) -> RivetResult<()> {
        self.require_frame("bind_index_buffer")?;
        if self.device_context.validation_enabled()
            && !buffer
                .buffer_def()
                .resource_type
                .contains(RivetResourceType::INDEX_BUFFER)
        {
            Err(format!(
                "buffer {} bound as an index buffer but was created as {:?}",
                buffer.id(),
                buffer.buffer_def().resource_type
            ))?;
        }

        self.bound_index_buffer = Some(BoundIndexBuffer {
            id: buffer.id(),
            size: buffer.buffer_def().size,
            index_type,
        });
        Ok(())
    }

    pub fn bind_texture(
        &mut self,
        slot: u32,
        texture: &RivetTextureNull,
    ) -> RivetResult<()> {
        self.require_frame("bind_texture")?;
        let slot_count = self.bound_textures.len();
        let bound_slot = self.bound_textures.get_mut(slot as usize).ok_or_else(|| {
            format!(
                "texture slot {} out of range, device has {} slots",
                slot, slot_count
            )
        })?;

        *bound_slot = Some(texture.id());
        Ok(())
    }

    pub fn update_buffer(
        &mut self,
        buffer: &RivetBufferNull,
        offset: u64,
        data: &[u8],
    ) -> RivetResult<()> {
        self.require_frame("update_buffer")?;
        let end = offset + data.len() as u64;
        if end > buffer.buffer_def().size {
            Err(format!(
                "write of {} bytes at offset {} overruns buffer {} of size {}",
                data.len(),
                offset,
                buffer.id(),
                buffer.buffer_def().size
            ))?;
        }

        self.stats.bytes_uploaded += data.len() as u64;
        Ok(())
    }

    fn verify_draw_state(&self) -> RivetResult<u64> {
        if self.bound_shader.is_none() {
            Err("draw recorded with no shader bound")?;
        }

        let vertex_array = self
            .bound_vertex_array
            .as_ref()
            .ok_or("draw recorded with no vertex buffers bound")?;

        Ok(vertex_array.min_buffer_size)
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        first_vertex: u32,
    ) -> RivetResult<()> {
        self.require_frame("draw")?;
        let min_buffer_size = self.verify_draw_state()?;

        // Vertex stride is owned by the shader, so the best we can do is require one byte per vertex
        if self.device_context.validation_enabled()
            && (first_vertex as u64 + vertex_count as u64) > min_buffer_size
        {
            Err(format!(
                "draw of vertices [{}, {}) is outside the bound vertex buffers",
                first_vertex,
                first_vertex as u64 + vertex_count as u64
            ))?;
        }

        self.stats.draw_calls += 1;
        self.stats.vertices_drawn += vertex_count as u64;
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
    ) -> RivetResult<()> {
        self.require_frame("draw_indexed")?;
        self.verify_draw_state()?;

        let index_buffer = self
            .bound_index_buffer
            .as_ref()
            .ok_or("draw_indexed recorded with no index buffer bound")?;

        let index_size = index_buffer.index_type.index_size_in_bytes();
        let end = (first_index as u64 + index_count as u64) * index_size;
        if end > index_buffer.size {
            Err(format!(
                "draw_indexed reads {} bytes but index buffer {} has {}",
                end, index_buffer.id, index_buffer.size
            ))?;
        }

        self.stats.draw_calls += 1;
        self.stats.vertices_drawn += index_count as u64;
        Ok(())
    }

    /// Advance the vertex array cache by one frame and destroy vertex arrays that have expired.
    /// Returns the number destroyed.
    pub fn gc(&mut self) -> usize {
        profiling::scope!("RivetContextNull::gc");
        let device_context = &self.device_context;
        let collected = self.vertex_array_cache.gc(|id| {
            log::trace!("Collecting vertex array {}", id);
            if let Err(e) = device_context.free_object(id, RivetObjectType::VertexArray) {
                log::error!("Failed to destroy vertex array {}: {}", id, e);
            }
        });

        self.stats.vertex_arrays_collected += collected as u64;
        collected
    }

    /// Destroy every cached vertex array regardless of age
    pub fn clear_cache(&mut self) -> usize {
        let device_context = &self.device_context;
        let released = self.vertex_array_cache.clear(|id| {
            if let Err(e) = device_context.free_object(id, RivetObjectType::VertexArray) {
                log::error!("Failed to destroy vertex array {}: {}", id, e);
            }
        });

        self.stats.vertex_arrays_collected += released as u64;
        released
    }
}

impl Drop for RivetContextNull {
    fn drop(&mut self) {
        let released = self.clear_cache();
        log::debug!("Dropped context, released {} cached vertex arrays", released);
    }
}
