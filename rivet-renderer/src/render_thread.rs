use super::{Driver, FrameStats};
use crossbeam_channel::{Receiver, Sender};
use rivet_api::{RivetContext, RivetResult};
use rivet_framework::{AsyncCommandQueue, AsyncCommandQueueFactory, RenderDevice};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

enum RenderThreadMessage {
    Frame,
    Finish,
}

/// Runs a `Driver` on a dedicated thread. The driver is moved onto the thread and is only touched
/// from there. Other threads request frames with `render()`, and create resources and command
/// queues through `device()` and `create_command_queue()`.
///
/// At most one frame can be requested at a time: call `wait_for_render_finish()` before the next
/// `render()`.
pub struct RenderThread {
    join_handle: Option<JoinHandle<()>>,
    job_tx: Sender<RenderThreadMessage>,

    result_rx: Receiver<FrameStats>,
    expecting_result: AtomicBool,

    render_device: RenderDevice,
    command_queue_factory: AsyncCommandQueueFactory<RivetContext>,
}

impl RenderThread {
    pub fn start(driver: Driver) -> RivetResult<Self> {
        let (job_tx, job_rx) = crossbeam_channel::bounded(1);
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);

        let render_device = driver.device().clone();
        let command_queue_factory = driver.command_queue_factory();

        let thread_builder = std::thread::Builder::new().name("Render Thread".to_string());
        let join_handle = thread_builder.spawn(move || {
            match Self::render_thread(driver, job_rx, result_tx) {
                Ok(_) => log::info!("Render thread ended without error"),
                Err(err) => log::error!("Render thread ended with error: {}", err),
            }
        })?;

        Ok(RenderThread {
            join_handle: Some(join_handle),
            job_tx,
            result_rx,
            expecting_result: AtomicBool::new(false),
            render_device,
            command_queue_factory,
        })
    }

    pub fn device(&self) -> &RenderDevice {
        &self.render_device
    }

    pub fn create_command_queue(&self) -> AsyncCommandQueue<RivetContext> {
        self.command_queue_factory.create_queue()
    }

    pub fn command_queue_factory(&self) -> AsyncCommandQueueFactory<RivetContext> {
        self.command_queue_factory.clone()
    }

    /// Request one frame tick. Returns without waiting for it.
    pub fn render(&self) -> RivetResult<()> {
        let was_expecting_result = self.expecting_result.swap(true, Ordering::Relaxed);
        assert!(
            !was_expecting_result,
            "render called again before wait_for_render_finish"
        );

        self.job_tx
            .send(RenderThreadMessage::Frame)
            .map_err(|_| "render thread is not running")?;
        Ok(())
    }

    /// Wait for the frame requested by `render()`. Returns None if no frame was requested, or if
    /// the render thread stopped before finishing it.
    pub fn wait_for_render_finish(&self) -> Option<FrameStats> {
        if self.expecting_result.load(Ordering::Relaxed) {
            let was_expecting_result = self.expecting_result.swap(false, Ordering::Relaxed);
            assert!(was_expecting_result);
            self.result_rx.recv().ok()
        } else {
            None
        }
    }

    fn stop(&mut self) {
        // Fails only if the thread already exited, in which case join below returns immediately
        let _ = self.job_tx.send(RenderThreadMessage::Finish);
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }

    fn render_thread(
        mut driver: Driver,
        job_rx: Receiver<RenderThreadMessage>,
        result_tx: Sender<FrameStats>,
    ) -> RivetResult<()> {
        profiling::register_thread!();

        loop {
            match job_rx.recv() {
                Ok(RenderThreadMessage::Frame) => {
                    profiling::scope!("Render Frame");

                    let frame_stats = driver.fixed_update();
                    log::trace!("Frame {} finished: {:?}", frame_stats.frame_index, frame_stats);
                    if result_tx.send(frame_stats).is_err() {
                        log::warn!("Frame finished but nobody is waiting for it");
                    }
                }
                Ok(RenderThreadMessage::Finish) | Err(_) => {
                    log::trace!("finishing render thread");
                    break;
                }
            }
        }

        driver.destroy()
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.stop();
    }
}
