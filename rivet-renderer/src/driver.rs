use rivet_api::{
    RivetApi, RivetContext, RivetContextDef, RivetContextStats, RivetDeviceContext, RivetResult,
};
use rivet_framework::{
    AsyncCommandQueue, AsyncCommandQueueConsumer, AsyncCommandQueueFactory,
    AsyncCommandQueueStats, DeferredResourceRegistry, DeferredResourceStats, RenderDevice,
};

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct DriverDef {
    /// Backend object caches are collected every this many frames. Values below 1 are treated
    /// as 1.
    pub gc_frequency_frames: u64,

    /// Cached backend objects unused for roughly this many frames are destroyed. Expiry is only
    /// checked when GC runs, so this is rounded up to a whole number of GC intervals.
    pub cache_time_to_keep_frames: u64,

    /// Upper bound on frame ticks `flush()` runs while waiting for deferred work to drain
    pub max_flush_iterations: u32,
}

impl Default for DriverDef {
    fn default() -> Self {
        DriverDef {
            gc_frequency_frames: 8,
            cache_time_to_keep_frames: 16,
            max_flush_iterations: 8,
        }
    }
}

impl DriverDef {
    fn gc_frequency(&self) -> u64 {
        self.gc_frequency_frames.max(1)
    }

    // The context's caches count time in GC calls, not frames
    fn cache_time_to_keep_gc_calls(&self) -> u64 {
        let gc_frequency = self.gc_frequency();
        ((self.cache_time_to_keep_frames + gc_frequency - 1) / gc_frequency).max(1)
    }
}

/// Counters for a single `fixed_update()` call
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub releases_executed: usize,
    pub releases_failed: usize,
    pub inits_executed: usize,
    pub inits_failed: usize,
    pub commands_executed: usize,
    pub commands_failed: usize,
    /// Backend cache entries destroyed by GC this frame. Zero on frames where GC did not run.
    pub cache_entries_collected: usize,
    pub gc_ran: bool,
}

/// Sequences the render thread's work. Every `fixed_update()` runs one frame tick:
///
/// begin frame, execute pending releases, execute pending inits, execute queued commands, end
/// frame, and every `gc_frequency_frames` frames collect expired backend cache entries.
///
/// Releases run before inits so that slots freed by destroyed resources are available to the
/// resources created in the same frame. Commands run after both, so a command committed after its
/// resource was requested sees that resource initialized (or failed) when it executes.
///
/// A failing callable or command is logged and counted. It never stops the tick.
pub struct Driver {
    api: RivetApi,
    device_context: RivetDeviceContext,
    context: RivetContext,
    registry: DeferredResourceRegistry<RivetDeviceContext>,
    render_device: RenderDevice,
    command_queue_consumer: AsyncCommandQueueConsumer<RivetContext>,
    driver_def: DriverDef,
    frame_index: u64,
    destroyed: bool,
}

impl Driver {
    pub fn new(
        api: RivetApi,
        driver_def: &DriverDef,
    ) -> RivetResult<Self> {
        let device_context = api.device_context();
        let context = device_context.create_context(&RivetContextDef {
            vertex_array_time_to_keep: driver_def.cache_time_to_keep_gc_calls(),
        })?;

        let registry = DeferredResourceRegistry::new();
        let render_device = RenderDevice::new(&device_context, registry.submitter());

        log::info!(
            "Driver created for {} backend, gc every {} frames",
            device_context.device_info().backend_name,
            driver_def.gc_frequency()
        );

        Ok(Driver {
            api,
            device_context,
            context,
            registry,
            render_device,
            command_queue_consumer: AsyncCommandQueueConsumer::new(),
            driver_def: driver_def.clone(),
            frame_index: 0,
            destroyed: false,
        })
    }

    /// The producer-facing device. Clone it and hand it to any thread that creates resources.
    pub fn device(&self) -> &RenderDevice {
        &self.render_device
    }

    pub fn device_context(&self) -> &RivetDeviceContext {
        &self.device_context
    }

    pub fn context(&self) -> &RivetContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RivetContext {
        &mut self.context
    }

    pub fn create_command_queue(&self) -> AsyncCommandQueue<RivetContext> {
        self.command_queue_consumer.create_queue()
    }

    pub fn command_queue_factory(&self) -> AsyncCommandQueueFactory<RivetContext> {
        self.command_queue_consumer.factory()
    }

    pub fn driver_def(&self) -> &DriverDef {
        &self.driver_def
    }

    /// Number of frame ticks run so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn registry_stats(&self) -> DeferredResourceStats {
        self.registry.stats()
    }

    pub fn command_queue_stats(&self) -> AsyncCommandQueueStats {
        self.command_queue_consumer.stats()
    }

    pub fn context_stats(&self) -> RivetContextStats {
        self.context.stats()
    }

    /// True if no deferred resource work and no commands are waiting
    pub fn is_idle(&mut self) -> bool {
        self.registry.is_idle() && self.command_queue_consumer.is_idle()
    }

    /// Run one frame tick
    pub fn fixed_update(&mut self) -> FrameStats {
        profiling::scope!("Driver::fixed_update");
        assert!(!self.destroyed, "fixed_update called on a destroyed driver");

        self.frame_index += 1;
        let mut frame_stats = FrameStats {
            frame_index: self.frame_index,
            ..Default::default()
        };

        {
            profiling::scope!("Begin Frame");
            log::trace!("Frame {}: begin", self.frame_index);
            self.context.begin_frame();
            self.registry.begin_frame();
        }

        {
            profiling::scope!("Release Pending");
            let result = self
                .registry
                .execute_pending_release_queue(&self.device_context);
            frame_stats.releases_executed = result.executed;
            frame_stats.releases_failed = result.failed;
        }

        {
            profiling::scope!("Init Pending");
            let result = self.registry.execute_pending_init_queue(&self.device_context);
            frame_stats.inits_executed = result.executed;
            frame_stats.inits_failed = result.failed;
        }

        {
            profiling::scope!("Execute Commands");
            let result = self.command_queue_consumer.execute_pending(&mut self.context);
            frame_stats.commands_executed = result.executed;
            frame_stats.commands_failed = result.failed;
        }

        {
            profiling::scope!("End Frame");
            self.registry.end_frame();
            self.context.end_frame();
            log::trace!("Frame {}: end", self.frame_index);
        }

        if self.frame_index % self.driver_def.gc_frequency() == 0 {
            profiling::scope!("GC");
            frame_stats.gc_ran = true;
            frame_stats.cache_entries_collected = self.context.gc();
            log::trace!(
                "Frame {}: gc collected {} cache entries",
                self.frame_index,
                frame_stats.cache_entries_collected
            );
        }

        frame_stats
    }

    /// Run frame ticks until no deferred work or commands are waiting, up to
    /// `max_flush_iterations`. Returns true if everything drained.
    ///
    /// Releasing a resource can cause more releases (a command holding the last reference to
    /// another resource, for example), so a single tick is not always enough.
    pub fn flush(&mut self) -> bool {
        profiling::scope!("Driver::flush");
        for _ in 0..self.driver_def.max_flush_iterations {
            if self.is_idle() {
                return true;
            }

            self.fixed_update();
        }

        let idle = self.is_idle();
        if !idle {
            log::warn!(
                "Driver still has pending work after {} flush iterations",
                self.driver_def.max_flush_iterations
            );
        }

        idle
    }

    /// Drain pending work, release cached backend objects and destroy the api. Fails if native
    /// objects are still alive, which means some `RefHandle` to a resource outlived the driver.
    pub fn destroy(&mut self) -> RivetResult<()> {
        if self.destroyed {
            return Ok(());
        }

        self.flush();

        let released = self.context.clear_cache();
        log::debug!("Released {} cached backend objects", released);

        self.destroyed = true;
        self.api.destroy()
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // A panic may have left a frame half finished, running more ticks would panic again
        if std::thread::panicking() {
            return;
        }

        if let Err(e) = self.destroy() {
            log::error!("Error while dropping Driver: {}", e);
        }
    }
}
