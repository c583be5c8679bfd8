use rivet::api::{RivetApi, RivetApiDef, RivetResult};
use rivet::framework::{TaskPriority, TaskScheduler};
use rivet::renderer::{Driver, FrameStats, RenderThread};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use structopt::StructOpt;

mod background;
mod config;
mod producer;

use background::BackgroundCounters;
use config::{DemoArgs, DemoConfig};
use producer::SharedCounters;

pub fn logging_init() {
    #[cfg(not(debug_assertions))]
    let log_level = log::LevelFilter::Info;
    #[cfg(debug_assertions)]
    let log_level = log::LevelFilter::Debug;

    // Setup logging
    env_logger::Builder::from_default_env()
        .default_format_timestamp_nanos(true)
        .filter_module("rivet_api", log::LevelFilter::Info)
        .filter_module("rivet_framework", log::LevelFilter::Info)
        .filter_level(log_level)
        .init();
}

fn main() {
    logging_init();

    let args = DemoArgs::from_args();
    if let Err(e) = run(&args) {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[derive(Default, Debug)]
struct FrameTotals {
    frames: u64,
    releases: usize,
    inits: usize,
    failures: usize,
    commands: usize,
    cache_entries_collected: usize,
}

impl FrameTotals {
    fn add(
        &mut self,
        frame_stats: &FrameStats,
    ) {
        self.frames += 1;
        self.releases += frame_stats.releases_executed;
        self.inits += frame_stats.inits_executed;
        self.failures += frame_stats.releases_failed
            + frame_stats.inits_failed
            + frame_stats.commands_failed;
        self.commands += frame_stats.commands_executed;
        self.cache_entries_collected += frame_stats.cache_entries_collected;
    }
}

fn run(args: &DemoArgs) -> RivetResult<()> {
    let config = DemoConfig::from_args(args)?;
    log::info!("Starting demo with {:?}", config);

    //
    // Render thread, owning the driver and the api
    //
    let api = RivetApi::new(&RivetApiDef::default())?;
    let driver = Driver::new(api, &config.driver)?;
    let render_thread = RenderThread::start(driver)?;

    //
    // Background workers
    //
    let mut scheduler = TaskScheduler::new(&config.scheduler)?;
    let background_counters = Arc::new(BackgroundCounters::default());

    //
    // Producers, each with its own command queue
    //
    let stop_requested = Arc::new(AtomicBool::new(false));
    let shared_counters = Arc::new(SharedCounters::default());
    let mut producers = Vec::with_capacity(args.producers);
    for producer_index in 0..args.producers {
        producers.push(producer::spawn_producer(
            producer_index,
            render_thread.device().clone(),
            render_thread.create_command_queue(),
            stop_requested.clone(),
            shared_counters.clone(),
        )?);
    }

    let mut totals = FrameTotals::default();
    let mut in_flight_tasks = Vec::default();
    for frame_index in 0..args.frames {
        profiling::scope!("Main Frame");

        in_flight_tasks.extend(background::submit_frame_tasks(
            &scheduler,
            frame_index,
            &background_counters,
        ));

        render_thread.render()?;
        let frame_stats = render_thread
            .wait_for_render_finish()
            .ok_or("render thread stopped unexpectedly")?;
        totals.add(&frame_stats);

        in_flight_tasks.retain(|task| !task.is_completed());

        if args.log_interval > 0 && frame_stats.frame_index % args.log_interval == 0 {
            log::info!(
                "Frame {}: {:?}, {} background tasks in flight",
                frame_stats.frame_index,
                frame_stats,
                in_flight_tasks.len()
            );
        }
    }

    //
    // Shut down in dependency order: producers stop recording, background work stops, then the
    // render thread drains what is left and destroys the driver
    //
    stop_requested.store(true, Ordering::Release);
    let mut resources_created = 0;
    let mut commands_enqueued = 0;
    for producer in producers {
        match producer.join() {
            Ok(stats) => {
                resources_created += stats.resources_created;
                commands_enqueued += stats.commands_enqueued;
            }
            Err(_) => log::error!("A producer thread panicked"),
        }
    }

    let unexecuted = scheduler.shutdown();
    if !unexecuted.is_empty() {
        log::info!(
            "{} background tasks were still queued at shutdown and did not run",
            unexecuted.len()
        );
    }

    drop(render_thread);

    log::info!("Rendered {:?}", totals);
    log::info!(
        "Producers created {} resources and enqueued {} commands, {} draws executed, {} bytes uploaded",
        resources_created,
        commands_enqueued,
        shared_counters.draws_executed.load(Ordering::Relaxed),
        shared_counters.bytes_uploaded.load(Ordering::Relaxed)
    );
    log::info!(
        "Background tasks completed: high {}, medium {}, low {} (checksum {:x})",
        background_counters.completed(TaskPriority::High),
        background_counters.completed(TaskPriority::Medium),
        background_counters.completed(TaskPriority::Low),
        background_counters.checksum()
    );

    Ok(())
}
