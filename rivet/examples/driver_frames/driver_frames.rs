use log::LevelFilter;

use rivet::api::*;
use rivet::framework::RenderDevice;
use rivet::renderer::{Driver, DriverDef, RenderThread};

const FRAME_COUNT: usize = 10;

fn main() {
    env_logger::Builder::from_default_env()
        .default_format_timestamp_nanos(true)
        .filter_level(LevelFilter::Info)
        .init();

    run().unwrap();
}

fn run() -> RivetResult<()> {
    //
    // Create the api. The null backend is headless, it only keeps track of native objects.
    //
    let api = RivetApi::new(&Default::default())?;

    //
    // The driver takes ownership of the api and runs one frame tick per fixed_update(). Moving it
    // onto a render thread means nothing below ever calls into the backend directly.
    //
    let driver = Driver::new(api, &DriverDef::default())?;
    let render_thread = RenderThread::start(driver)?;

    //
    // A cloneable device handle. Resources created here are usable immediately as handles, their
    // native objects are created on the render thread at the start of the next frame.
    //
    let render_device: RenderDevice = render_thread.device().clone();
    let shader = render_device.create_shader(vec![
        RivetShaderStageDef::new(RivetShaderStageFlags::VERTEX, "main", "triangle vertex"),
        RivetShaderStageDef::new(RivetShaderStageFlags::FRAGMENT, "main", "triangle fragment"),
    ]);
    let vertex_buffer = render_device.create_buffer(&RivetBufferDef::for_vertex_buffer(3 * 20));

    //
    // Commands are recorded into a queue from this thread, published with commit() and executed
    // on the render thread
    //
    let command_queue = render_thread.create_command_queue();

    for frame in 0..FRAME_COUNT {
        let shader = shader.clone();
        let vertex_buffer = vertex_buffer.clone();
        command_queue.enqueue(move |context| {
            let brightness = frame as f32 / FRAME_COUNT as f32;
            context.clear(RivetColorClearValue([brightness, brightness, brightness, 1.0]))?;
            shader.with_native(|shader| context.bind_shader(shader))?;
            vertex_buffer.with_native(|buffer| context.bind_vertex_buffers(&[buffer]))?;
            context.draw(3, 0)
        });
        command_queue.commit();

        render_thread.render()?;
        if let Some(frame_stats) = render_thread.wait_for_render_finish() {
            log::info!("{:?}", frame_stats);
        }
    }

    // Handles must be gone before the render thread shuts down so their native objects get
    // destroyed
    drop(shader);
    drop(vertex_buffer);
    drop(command_queue);
    drop(render_thread);
    Ok(())
}
