use super::{
    RivetApiDefNull, RivetBufferNull, RivetContextNull, RivetSamplerNull, RivetShaderNull,
    RivetTextureNull,
};
use crate::{
    RivetApiDef, RivetBufferDef, RivetContextDef, RivetDeviceInfo, RivetDeviceStats,
    RivetObjectType, RivetResult, RivetSamplerDef, RivetShaderStageDef, RivetTextureDef,
};
use fnv::FnvHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct RivetDeviceContextNullInner {
    device_info: RivetDeviceInfo,
    validation_enabled: bool,
    max_live_objects: Option<usize>,

    next_object_id: AtomicU64,
    live_objects: Mutex<FnvHashMap<u64, RivetObjectType>>,

    created_objects: AtomicU64,
    destroyed_objects: AtomicU64,
    failed_creations: AtomicU64,
}

/// Cloneable, thread-safe handle to the null device
#[derive(Clone)]
pub struct RivetDeviceContextNull {
    inner: Arc<RivetDeviceContextNullInner>,
}

impl std::fmt::Debug for RivetDeviceContextNull {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RivetDeviceContextNull")
            .field("live_objects", &self.live_object_count())
            .finish()
    }
}

impl RivetDeviceContextNull {
    pub(crate) fn new(
        api_def: &RivetApiDef,
        null_api_def: &RivetApiDefNull,
    ) -> Self {
        let device_info = RivetDeviceInfo {
            backend_name: "null",
            supports_multithreaded_usage: true,
            max_vertex_attribute_count: 16,
            max_texture_slots: 16,
        };

        let inner = RivetDeviceContextNullInner {
            device_info,
            validation_enabled: api_def.validation_enabled,
            max_live_objects: null_api_def.max_live_objects,
            // 0 is never handed out so it can be used as "nothing bound"
            next_object_id: AtomicU64::new(1),
            live_objects: Default::default(),
            created_objects: AtomicU64::new(0),
            destroyed_objects: AtomicU64::new(0),
            failed_creations: AtomicU64::new(0),
        };

        RivetDeviceContextNull {
            inner: Arc::new(inner),
        }
    }

    pub fn device_info(&self) -> &RivetDeviceInfo {
        &self.inner.device_info
    }

    pub fn validation_enabled(&self) -> bool {
        self.inner.validation_enabled
    }

    pub fn live_object_count(&self) -> usize {
        self.inner.live_objects.lock().unwrap().len()
    }

    /// Snapshot of every object that has not been destroyed yet, sorted by id
    pub fn live_objects(&self) -> Vec<(u64, RivetObjectType)> {
        let live_objects = self.inner.live_objects.lock().unwrap();
        let mut objects: Vec<_> = live_objects
            .iter()
            .map(|(&id, &object_type)| (id, object_type))
            .collect();
        objects.sort_by_key(|(id, _)| *id);
        objects
    }

    pub fn stats(&self) -> RivetDeviceStats {
        RivetDeviceStats {
            live_objects: self.live_object_count(),
            created_objects: self.inner.created_objects.load(Ordering::Relaxed),
            destroyed_objects: self.inner.destroyed_objects.load(Ordering::Relaxed),
            failed_creations: self.inner.failed_creations.load(Ordering::Relaxed),
        }
    }

    pub fn create_buffer(
        &self,
        buffer_def: &RivetBufferDef,
    ) -> RivetResult<RivetBufferNull> {
        self.verify_def(buffer_def.verify())?;
        let id = self.allocate_object(RivetObjectType::Buffer)?;
        log::debug!("Created buffer {} ({} bytes)", id, buffer_def.size);
        Ok(RivetBufferNull::new(id, buffer_def.clone()))
    }

    pub fn create_texture(
        &self,
        texture_def: &RivetTextureDef,
    ) -> RivetResult<RivetTextureNull> {
        self.verify_def(texture_def.verify())?;
        let id = self.allocate_object(RivetObjectType::Texture)?;
        log::debug!(
            "Created texture {} ({}x{} {:?})",
            id,
            texture_def.extents.width,
            texture_def.extents.height,
            texture_def.format
        );
        Ok(RivetTextureNull::new(id, texture_def.clone()))
    }

    pub fn create_sampler(
        &self,
        sampler_def: &RivetSamplerDef,
    ) -> RivetResult<RivetSamplerNull> {
        self.verify_def(sampler_def.verify())?;
        let id = self.allocate_object(RivetObjectType::Sampler)?;
        log::debug!("Created sampler {}", id);
        Ok(RivetSamplerNull::new(id, sampler_def.clone()))
    }

    pub fn create_shader(
        &self,
        stages: Vec<RivetShaderStageDef>,
    ) -> RivetResult<RivetShaderNull> {
        self.verify_def(RivetShaderStageDef::verify_stages(&stages))?;
        let id = self.allocate_object(RivetObjectType::Shader)?;
        log::debug!("Created shader {} with {} stages", id, stages.len());
        Ok(RivetShaderNull::new(id, stages))
    }

    pub fn destroy_buffer(
        &self,
        buffer: RivetBufferNull,
    ) -> RivetResult<()> {
        log::debug!("Destroying buffer {}", buffer.id());
        self.free_object(buffer.id(), RivetObjectType::Buffer)
    }

    pub fn destroy_texture(
        &self,
        texture: RivetTextureNull,
    ) -> RivetResult<()> {
        log::debug!("Destroying texture {}", texture.id());
        self.free_object(texture.id(), RivetObjectType::Texture)
    }

    pub fn destroy_sampler(
        &self,
        sampler: RivetSamplerNull,
    ) -> RivetResult<()> {
        log::debug!("Destroying sampler {}", sampler.id());
        self.free_object(sampler.id(), RivetObjectType::Sampler)
    }

    pub fn destroy_shader(
        &self,
        shader: RivetShaderNull,
    ) -> RivetResult<()> {
        log::debug!("Destroying shader {}", shader.id());
        self.free_object(shader.id(), RivetObjectType::Shader)
    }

    pub fn create_context(
        &self,
        context_def: &RivetContextDef,
    ) -> RivetResult<RivetContextNull> {
        Ok(RivetContextNull::new(self.clone(), context_def))
    }

    fn verify_def(
        &self,
        result: RivetResult<()>,
    ) -> RivetResult<()> {
        if result.is_err() {
            self.inner.failed_creations.fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    pub(crate) fn allocate_object(
        &self,
        object_type: RivetObjectType,
    ) -> RivetResult<u64> {
        let mut live_objects = self.inner.live_objects.lock().unwrap();
        if let Some(max_live_objects) = self.inner.max_live_objects {
            if live_objects.len() >= max_live_objects {
                self.inner.failed_creations.fetch_add(1, Ordering::Relaxed);
                Err(format!(
                    "out of device memory: {} native objects alive, limit is {}",
                    live_objects.len(),
                    max_live_objects
                ))?;
            }
        }

        let id = self.inner.next_object_id.fetch_add(1, Ordering::Relaxed);
        live_objects.insert(id, object_type);
        self.inner.created_objects.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    pub(crate) fn free_object(
        &self,
        id: u64,
        object_type: RivetObjectType,
    ) -> RivetResult<()> {
        let mut live_objects = self.inner.live_objects.lock().unwrap();
        match live_objects.get(&id).copied() {
            None => Err(format!(
                "native {:?} {} was destroyed twice or never created",
                object_type, id
            ))?,
            Some(live_type) if live_type != object_type => Err(format!(
                "native object {} is a {:?}, but was destroyed as a {:?}",
                id, live_type, object_type
            ))?,
            Some(_) => {
                live_objects.remove(&id);
                self.inner.destroyed_objects.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }
}
