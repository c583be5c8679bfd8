use super::{TaskHandle, TaskPriority, WorkerContext};
use crossbeam_channel::{Receiver, Sender};
use rivet_api::RivetResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct TaskSchedulerDef {
    /// Number of worker threads. If None, one less than the number of logical cores (minimum 1)
    pub worker_count: Option<usize>,

    /// How long an idle worker sleeps before checking the queues again
    pub idle_sleep_micros: u64,

    pub thread_name_prefix: String,
}

impl Default for TaskSchedulerDef {
    fn default() -> Self {
        TaskSchedulerDef {
            worker_count: None,
            idle_sleep_micros: 200,
            thread_name_prefix: "Worker".to_string(),
        }
    }
}

impl TaskSchedulerDef {
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(count) => count.max(1),
            None => num_cpus::get().saturating_sub(1).max(1),
        }
    }
}

/// A fixed pool of worker threads pulling `TaskHandle`s from one queue per priority.
///
/// Workers take the highest priority task available and sleep briefly when every queue is empty.
/// Shutdown is cooperative: a worker finishes the task it is running, then exits without taking
/// another. Tasks still queued at that point are handed back by `shutdown()` and stay `Pending`.
///
/// A task runs once per submission on exactly one worker. Submitting a task that is already queued
/// does nothing. Submitting a task that is currently running is a bug and panics. A task that
/// panics is logged and marked completed, and its worker carries on.
pub struct TaskScheduler {
    queue_txs: Vec<Sender<TaskHandle>>,
    queue_rxs: Vec<Receiver<TaskHandle>>,
    shutdown_requested: Arc<AtomicBool>,
    join_handles: Vec<JoinHandle<()>>,
    worker_count: usize,
}

impl TaskScheduler {
    pub fn new(def: &TaskSchedulerDef) -> RivetResult<Self> {
        let worker_count = def.resolved_worker_count();
        let idle_sleep = Duration::from_micros(def.idle_sleep_micros);

        let (queue_txs, queue_rxs): (Vec<_>, Vec<_>) = TaskPriority::ALL
            .iter()
            .map(|_| crossbeam_channel::unbounded())
            .unzip();

        let shutdown_requested = Arc::new(AtomicBool::new(false));

        let mut scheduler = TaskScheduler {
            queue_txs,
            queue_rxs,
            shutdown_requested,
            join_handles: Vec::with_capacity(worker_count),
            worker_count,
        };

        for worker_index in 0..worker_count {
            let thread_name = format!("{} {}", def.thread_name_prefix, worker_index);
            let queue_rxs = scheduler.queue_rxs.clone();
            let shutdown_requested = scheduler.shutdown_requested.clone();
            let context = WorkerContext::new(worker_index, thread_name.clone());

            // If spawning fails part way, dropping the scheduler stops the workers already started
            let join_handle = std::thread::Builder::new()
                .name(thread_name)
                .spawn(move || {
                    Self::worker_thread(context, queue_rxs, shutdown_requested, idle_sleep)
                })?;
            scheduler.join_handles.push(join_handle);
        }

        log::info!("Task scheduler started with {} workers", worker_count);
        Ok(scheduler)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of tasks waiting for a worker, across all priorities
    pub fn queued_task_count(&self) -> usize {
        self.queue_rxs.iter().map(|rx| rx.len()).sum()
    }

    /// Queue a task. Returns false if the task was already queued.
    pub fn submit_task(
        &self,
        task: &TaskHandle,
    ) -> bool {
        if !task.mark_pending() {
            log::debug!("Task submitted while already queued, ignoring");
            return false;
        }

        if self.is_shutdown_requested() {
            log::warn!("Task submitted after shutdown was requested, it will not run");
        }

        // The scheduler holds a receiver for every queue, so this can't fail
        let _ = self.queue_txs[task.priority().index()].send(task.clone());
        true
    }

    /// Ask the workers to stop after their current task. Does not wait.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Stop the workers, wait for in-flight tasks to finish, and return the tasks that never ran,
    /// highest priority first.
    pub fn shutdown(&mut self) -> Vec<TaskHandle> {
        profiling::scope!("TaskScheduler::shutdown");
        self.request_shutdown();

        for join_handle in self.join_handles.drain(..) {
            let thread_name = join_handle.thread().name().unwrap_or("worker").to_string();
            if join_handle.join().is_err() {
                log::error!("{} panicked", thread_name);
            }
        }

        let mut unexecuted = Vec::default();
        for rx in &self.queue_rxs {
            unexecuted.extend(rx.try_iter());
        }
        for task in &unexecuted {
            task.mark_unqueued();
        }

        if !unexecuted.is_empty() {
            log::debug!(
                "Task scheduler stopped with {} tasks never executed",
                unexecuted.len()
            );
        }

        unexecuted
    }

    fn worker_thread(
        context: WorkerContext,
        queue_rxs: Vec<Receiver<TaskHandle>>,
        shutdown_requested: Arc<AtomicBool>,
        idle_sleep: Duration,
    ) {
        profiling::register_thread!();
        log::debug!("{} started", context.thread_name());

        while !shutdown_requested.load(Ordering::Acquire) {
            // Queues are ordered highest priority first
            let next_task = queue_rxs.iter().find_map(|rx| rx.try_recv().ok());
            match next_task {
                Some(task) => {
                    profiling::scope!("Execute Task");
                    task.run(&context);
                }
                None => std::thread::sleep(idle_sleep),
            }
        }

        log::debug!(
            "{} exiting after {} tasks",
            context.thread_name(),
            context.tasks_executed()
        );
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        let unexecuted = self.shutdown();
        if !unexecuted.is_empty() {
            log::warn!(
                "Task scheduler dropped with {} tasks that never executed",
                unexecuted.len()
            );
        }
    }
}
