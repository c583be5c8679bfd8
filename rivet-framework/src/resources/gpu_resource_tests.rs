use super::*;
use crate::{DeferredResourceRegistry, DeferredResourceStats};
use rivet_api::null::RivetApiDefNull;
use rivet_api::{
    RivetApi, RivetApiDef, RivetBufferDef, RivetDeviceContext, RivetFormat, RivetShaderStageDef,
    RivetShaderStageFlags, RivetTextureDef,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct TestEnvironment {
    api: RivetApi,
    device_context: RivetDeviceContext,
    registry: DeferredResourceRegistry<RivetDeviceContext>,
    render_device: RenderDevice,
}

impl TestEnvironment {
    fn new() -> Self {
        Self::with_null_def(Default::default())
    }

    fn with_null_def(null_api_def: RivetApiDefNull) -> Self {
        let api = RivetApi::new_null(
            &RivetApiDef {
                validation_enabled: true,
            },
            &null_api_def,
        )
        .unwrap();
        let device_context = api.device_context();
        let registry = DeferredResourceRegistry::new();
        let render_device = RenderDevice::new(&device_context, registry.submitter());
        TestEnvironment {
            api,
            device_context,
            registry,
            render_device,
        }
    }

    fn run_frame(&mut self) {
        self.registry.begin_frame();
        self.registry.execute_pending_release_queue(&self.device_context);
        self.registry.execute_pending_init_queue(&self.device_context);
        self.registry.end_frame();
    }

    fn flush(&mut self) {
        while !self.registry.is_idle() {
            self.run_frame();
        }
    }

    fn stats(&self) -> DeferredResourceStats {
        self.registry.stats()
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        // Every native object must have been returned by the time the api goes away
        self.flush();
        self.api.destroy().unwrap();
    }
}

#[test]
fn test_resource_becomes_ready_then_released() {
    let mut env = TestEnvironment::new();

    let buffer = env
        .render_device
        .create_buffer(&RivetBufferDef::for_vertex_buffer(256));
    assert_eq!(buffer.status(), ResourceStatus::Pending);
    assert!(buffer.with_native(|_| Ok(())).is_err());
    assert_eq!(env.device_context.live_object_count(), 0);

    env.run_frame();
    assert_eq!(buffer.status(), ResourceStatus::Ready);
    assert_eq!(env.device_context.live_object_count(), 1);
    let size = buffer
        .with_native(|native| Ok(native.buffer_def().size))
        .unwrap();
    assert_eq!(size, 256);

    // Release is requested the moment the last handle goes away, and runs on the next frame
    drop(buffer);
    assert_eq!(env.registry.submitted_counts(), (0, 1));
    assert_eq!(env.device_context.live_object_count(), 1);

    env.run_frame();
    let device_stats = env.device_context.stats();
    assert_eq!(device_stats.live_objects, 0);
    assert_eq!(device_stats.created_objects, 1);
    assert_eq!(device_stats.destroyed_objects, 1);
}

#[test]
fn test_release_never_runs_before_init() {
    let mut env = TestEnvironment::new();

    // Dropped before any frame ran. The init callable still holds a reference.
    let texture = env.render_device.create_texture(&RivetTextureDef::for_2d(
        32,
        32,
        RivetFormat::R8G8B8A8_UNORM,
    ));
    drop(texture);
    assert_eq!(env.registry.submitted_counts(), (1, 0));

    // Init runs, and dropping the init callable submits the release for the next frame
    env.run_frame();
    assert_eq!(env.device_context.live_object_count(), 1);
    assert_eq!(env.registry.submitted_counts(), (0, 1));

    env.run_frame();
    assert_eq!(env.device_context.live_object_count(), 0);
    assert_eq!(env.device_context.stats().destroyed_objects, 1);
}

#[test]
fn test_failed_init_is_recorded_on_the_resource() {
    let mut env = TestEnvironment::new();

    let good = env
        .render_device
        .create_buffer(&RivetBufferDef::for_index_buffer(64));
    let bad = env
        .render_device
        .create_buffer(&RivetBufferDef::for_index_buffer(0));
    let shader = env.render_device.create_shader(vec![
        RivetShaderStageDef::new(RivetShaderStageFlags::VERTEX, "main", "vs"),
        RivetShaderStageDef::new(RivetShaderStageFlags::FRAGMENT, "main", "fs"),
    ]);

    env.run_frame();

    // One failure does not prevent the other resources from initializing
    assert_eq!(good.status(), ResourceStatus::Ready);
    assert_eq!(shader.status(), ResourceStatus::Ready);
    assert_eq!(bad.status(), ResourceStatus::Failed);
    assert!(bad
        .error_message()
        .unwrap()
        .contains("buffer size must be non-zero"));
    assert!(bad.with_native(|_| Ok(())).is_err());
    assert_eq!(env.stats().inits_executed, 3);
    assert_eq!(env.stats().inits_failed, 1);

    // Releasing a failed resource destroys nothing
    drop(bad);
    env.run_frame();
    assert_eq!(env.stats().releases_failed, 0);
    assert_eq!(env.device_context.stats().destroyed_objects, 0);
}

#[test]
fn test_out_of_memory_fails_only_the_overflowing_resource() {
    let mut env = TestEnvironment::with_null_def(RivetApiDefNull {
        max_live_objects: Some(2),
    });

    let buffers: Vec<_> = (0..3)
        .map(|_| {
            env.render_device
                .create_buffer(&RivetBufferDef::for_uniform_buffer(16))
        })
        .collect();
    env.run_frame();

    let statuses: Vec<_> = buffers.iter().map(|x| x.status()).collect();
    assert_eq!(
        statuses,
        vec![
            ResourceStatus::Ready,
            ResourceStatus::Ready,
            ResourceStatus::Failed
        ]
    );
    assert!(buffers[2]
        .error_message()
        .unwrap()
        .contains("out of device memory"));
}

#[test]
fn test_handles_shared_across_threads() {
    const THREAD_COUNT: usize = 4;
    const RESOURCES_PER_THREAD: usize = 200;

    let mut env = TestEnvironment::new();
    let (done_tx, done_rx) = crossbeam_channel::unbounded();

    let mut join_handles = Vec::default();
    for _ in 0..THREAD_COUNT {
        let render_device = env.render_device.clone();
        let done_tx = done_tx.clone();
        join_handles.push(std::thread::spawn(move || {
            let mut kept = Vec::default();
            for i in 0..RESOURCES_PER_THREAD {
                let buffer =
                    render_device.create_buffer(&RivetBufferDef::for_vertex_buffer(64));

                // Share some handles with a second holder to exercise concurrent release
                if i % 2 == 0 {
                    kept.push(buffer.clone());
                }
            }
            done_tx.send(kept).unwrap();
        }));
    }
    drop(done_tx);

    let mut finished = 0;
    let mut kept = Vec::default();
    while finished < THREAD_COUNT {
        env.run_frame();
        while let Ok(handles) = done_rx.try_recv() {
            kept.extend(handles);
            finished += 1;
        }
    }

    for join_handle in join_handles {
        join_handle.join().unwrap();
    }

    env.flush();
    assert_eq!(kept.len(), THREAD_COUNT * RESOURCES_PER_THREAD / 2);
    assert!(kept.iter().all(|x| x.is_ready()));
    assert_eq!(env.device_context.live_object_count(), kept.len());

    drop(kept);
    env.flush();

    let device_stats = env.device_context.stats();
    assert_eq!(device_stats.live_objects, 0);
    assert_eq!(
        device_stats.created_objects,
        (THREAD_COUNT * RESOURCES_PER_THREAD) as u64
    );
    assert_eq!(device_stats.created_objects, device_stats.destroyed_objects);
}

// The same lifecycle without a backend: an init callable marks the resource ready, a release
// callable marks it released and performs the single native destroy.
#[test]
fn test_init_then_release_across_frames() {
    #[derive(Default)]
    struct FakeDevice {
        destroy_calls: AtomicUsize,
    }

    let mut registry = DeferredResourceRegistry::<FakeDevice>::new();
    let device = FakeDevice::default();
    let state = Arc::new(Mutex::new("pending"));

    let init_state = state.clone();
    registry.submit_init(move |_| {
        *init_state.lock().unwrap() = "ready";
        Ok(())
    });

    registry.begin_frame();
    registry.execute_pending_init_queue(&device);
    registry.end_frame();
    assert_eq!(*state.lock().unwrap(), "ready");

    let release_state = state.clone();
    registry.submit_release(move |device: &FakeDevice| {
        device.destroy_calls.fetch_add(1, Ordering::Relaxed);
        *release_state.lock().unwrap() = "released";
        Ok(())
    });

    registry.begin_frame();
    registry.execute_pending_release_queue(&device);
    registry.execute_pending_init_queue(&device);
    registry.end_frame();

    assert_eq!(*state.lock().unwrap(), "released");
    assert_eq!(device.destroy_calls.load(Ordering::Relaxed), 1);
}
