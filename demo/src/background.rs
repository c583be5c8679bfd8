use rivet::framework::{Task, TaskHandle, TaskPriority, TaskScheduler, WorkerContext};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct BackgroundCounters {
    completed: [AtomicU64; 3],
    checksum: AtomicU64,
}

impl BackgroundCounters {
    pub fn completed(
        &self,
        priority: TaskPriority,
    ) -> u64 {
        self.completed[priority.index()].load(Ordering::Relaxed)
    }

    pub fn checksum(&self) -> u64 {
        self.checksum.load(Ordering::Relaxed)
    }
}

/// Stand-in for engine background work (culling, streaming, baking). Burns a deterministic amount
/// of CPU proportional to `iterations`.
struct SimulatedWorkTask {
    priority: TaskPriority,
    seed: u64,
    iterations: u32,
    counters: Arc<BackgroundCounters>,
}

impl Task for SimulatedWorkTask {
    fn priority(&self) -> TaskPriority {
        self.priority
    }

    fn execute(
        &self,
        context: &WorkerContext,
    ) {
        profiling::scope!("SimulatedWorkTask");

        // xorshift
        let mut value = self.seed | 1;
        for _ in 0..self.iterations {
            value ^= value << 13;
            value ^= value >> 7;
            value ^= value << 17;
        }

        log::trace!(
            "{} finished {:?} task {}",
            context.thread_name(),
            self.priority,
            self.seed
        );
        self.counters.checksum.fetch_xor(value, Ordering::Relaxed);
        self.counters.completed[self.priority.index()].fetch_add(1, Ordering::Relaxed);
    }
}

/// Submit this frame's background work. Every frame gets high priority work, medium and low
/// priority work is submitted less often but is more expensive.
pub fn submit_frame_tasks(
    scheduler: &TaskScheduler,
    frame_index: u64,
    counters: &Arc<BackgroundCounters>,
) -> Vec<TaskHandle> {
    let mut tasks = Vec::default();

    let mut submit = |priority: TaskPriority, iterations: u32| {
        let task = TaskHandle::new(SimulatedWorkTask {
            priority,
            seed: frame_index * 3 + priority.index() as u64,
            iterations,
            counters: counters.clone(),
        });
        scheduler.submit_task(&task);
        tasks.push(task);
    };

    submit(TaskPriority::High, 10_000);
    if frame_index % 4 == 0 {
        submit(TaskPriority::Medium, 100_000);
    }
    if frame_index % 16 == 0 {
        submit(TaskPriority::Low, 1_000_000);
    }

    tasks
}
