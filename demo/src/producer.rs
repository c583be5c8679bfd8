use rivet::api::*;
use rivet::framework::{AsyncCommandQueue, RenderDevice};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const VERTEX_STRIDE: u64 = 32;

#[derive(Default, Debug, Copy, Clone)]
pub struct ProducerStats {
    pub resources_created: u64,
    pub commands_enqueued: u64,
}

/// Counters shared between producers and the commands they record
#[derive(Default)]
pub struct SharedCounters {
    pub draws_executed: AtomicU64,
    pub bytes_uploaded: AtomicU64,
}

/// Spawn a thread that plays the role of game logic: it keeps a long lived shader and texture,
/// creates a fresh vertex buffer for every draw, records the draw and immediately drops its own
/// handle to the buffer. The command keeps the buffer alive until it has executed.
pub fn spawn_producer(
    producer_index: usize,
    render_device: RenderDevice,
    command_queue: AsyncCommandQueue<RivetContext>,
    stop_requested: Arc<AtomicBool>,
    counters: Arc<SharedCounters>,
) -> std::io::Result<JoinHandle<ProducerStats>> {
    std::thread::Builder::new()
        .name(format!("Producer {}", producer_index))
        .spawn(move || {
            profiling::register_thread!();
            producer_thread(
                producer_index,
                render_device,
                command_queue,
                stop_requested,
                counters,
            )
        })
}

fn producer_thread(
    producer_index: usize,
    render_device: RenderDevice,
    command_queue: AsyncCommandQueue<RivetContext>,
    stop_requested: Arc<AtomicBool>,
    counters: Arc<SharedCounters>,
) -> ProducerStats {
    let mut stats = ProducerStats::default();

    let shader = render_device.create_shader(vec![
        RivetShaderStageDef::new(RivetShaderStageFlags::VERTEX, "main", "demo vertex"),
        RivetShaderStageDef::new(RivetShaderStageFlags::FRAGMENT, "main", "demo fragment"),
    ]);
    let texture =
        render_device.create_texture(&RivetTextureDef::for_2d(64, 64, RivetFormat::R8G8B8A8_UNORM));
    stats.resources_created += 2;

    let mut iteration = 0u64;
    while !stop_requested.load(Ordering::Acquire) {
        profiling::scope!("Produce Draw");

        let vertex_count = 3 * (1 + (iteration % 4) as u32);
        let vertex_data = vec![producer_index as u8; vertex_count as usize * VERTEX_STRIDE as usize];
        let vertex_buffer = render_device
            .create_buffer(&RivetBufferDef::for_vertex_buffer(vertex_data.len() as u64));
        stats.resources_created += 1;

        let shader = shader.clone();
        let texture = texture.clone();
        let counters = counters.clone();
        command_queue.enqueue(move |context| {
            shader.with_native(|shader| context.bind_shader(shader))?;
            texture.with_native(|texture| context.bind_texture(0, texture))?;
            vertex_buffer.with_native(|buffer| {
                context.update_buffer(buffer, 0, &vertex_data)?;
                context.bind_vertex_buffers(&[buffer])
            })?;
            context.draw(vertex_count, 0)?;

            counters.draws_executed.fetch_add(1, Ordering::Relaxed);
            counters
                .bytes_uploaded
                .fetch_add(vertex_data.len() as u64, Ordering::Relaxed);
            Ok(())
        });
        command_queue.commit();
        stats.commands_enqueued += 1;

        iteration += 1;
        std::thread::sleep(Duration::from_millis(2));
    }

    log::debug!("Producer {} stopping: {:?}", producer_index, stats);
    stats
}
