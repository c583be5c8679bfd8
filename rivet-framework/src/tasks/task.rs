use std::cell::Cell;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Coarse scheduling hint. Workers always take the highest priority task available, so sustained
/// high priority load can starve lower priorities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    /// Highest first, the order workers scan in
    pub const ALL: [TaskPriority; 3] = [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// Per-worker state handed to every task the worker executes
pub struct WorkerContext {
    worker_index: usize,
    thread_name: String,
    tasks_executed: Cell<u64>,
}

impl WorkerContext {
    pub(crate) fn new(
        worker_index: usize,
        thread_name: String,
    ) -> Self {
        WorkerContext {
            worker_index,
            thread_name,
            tasks_executed: Cell::new(0),
        }
    }

    pub fn worker_index(&self) -> usize {
        self.worker_index
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Tasks this worker finished before the current one
    pub fn tasks_executed(&self) -> u64 {
        self.tasks_executed.get()
    }
}

/// A unit of work for the `TaskScheduler`. Tasks are shared through a `TaskHandle` and may be
/// submitted again once completed, so `execute` takes `&self`.
pub trait Task: Send + Sync {
    fn priority(&self) -> TaskPriority {
        TaskPriority::Medium
    }

    fn execute(
        &self,
        context: &WorkerContext,
    );
}

/// Adapts a closure into a `Task`
pub struct FnTask<F> {
    priority: TaskPriority,
    func: F,
}

impl<F> FnTask<F>
where
    F: Fn(&WorkerContext) + Send + Sync,
{
    pub fn new(
        priority: TaskPriority,
        func: F,
    ) -> Self {
        FnTask { priority, func }
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn(&WorkerContext) + Send + Sync,
{
    fn priority(&self) -> TaskPriority {
        self.priority
    }

    fn execute(
        &self,
        context: &WorkerContext,
    ) {
        (self.func)(context)
    }
}

struct TaskState {
    status: TaskStatus,
    // Sitting in a scheduler queue, waiting for a worker
    queued: bool,
}

struct TaskHandleInner {
    task: Box<dyn Task>,
    state: Mutex<TaskState>,
    status_changed: Condvar,
    execution_count: AtomicU64,
    panicked: AtomicBool,
}

/// Shared handle to a task. Cloning is cheap, all clones refer to the same task and status.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<TaskHandleInner>,
}

impl TaskHandle {
    pub fn new<T: Task + 'static>(task: T) -> Self {
        TaskHandle {
            inner: Arc::new(TaskHandleInner {
                task: Box::new(task),
                state: Mutex::new(TaskState {
                    status: TaskStatus::Pending,
                    queued: false,
                }),
                status_changed: Condvar::new(),
                execution_count: AtomicU64::new(0),
                panicked: AtomicBool::new(false),
            }),
        }
    }

    pub fn from_fn<F>(
        priority: TaskPriority,
        func: F,
    ) -> Self
    where
        F: Fn(&WorkerContext) + Send + Sync + 'static,
    {
        TaskHandle::new(FnTask::new(priority, func))
    }

    pub fn priority(&self) -> TaskPriority {
        self.inner.task.priority()
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.state.lock().unwrap().status
    }

    pub fn is_completed(&self) -> bool {
        self.status() == TaskStatus::Completed
    }

    /// Number of times the task has finished executing, including runs that panicked
    pub fn execution_count(&self) -> u64 {
        self.inner.execution_count.load(Ordering::Acquire)
    }

    /// True if the most recent run panicked. The task is still marked completed.
    pub fn panicked(&self) -> bool {
        self.inner.panicked.load(Ordering::Acquire)
    }

    /// Block until the task completes
    pub fn wait(&self) {
        let mut state = self.inner.state.lock().unwrap();
        while state.status != TaskStatus::Completed {
            state = self.inner.status_changed.wait(state).unwrap();
        }
    }

    /// Block until the task completes or the timeout elapses. Returns true if the task completed.
    pub fn wait_timeout(
        &self,
        timeout: Duration,
    ) -> bool {
        let state = self.inner.state.lock().unwrap();
        let (state, _) = self
            .inner
            .status_changed
            .wait_timeout_while(state, timeout, |state| state.status != TaskStatus::Completed)
            .unwrap();
        state.status == TaskStatus::Completed
    }

    pub fn ptr_eq(
        &self,
        other: &TaskHandle,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // Called on submission. Returns false if the task is already queued, in which case it must not
    // be queued again.
    pub(crate) fn mark_pending(&self) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        assert!(
            state.status != TaskStatus::InProgress,
            "task submitted while it is already in progress"
        );
        if state.queued {
            return false;
        }

        state.status = TaskStatus::Pending;
        state.queued = true;
        true
    }

    // Called for tasks taken back out of a queue without running
    pub(crate) fn mark_unqueued(&self) {
        self.inner.state.lock().unwrap().queued = false;
    }

    // Called by exactly one worker per submission
    pub(crate) fn run(
        &self,
        context: &WorkerContext,
    ) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.status = TaskStatus::InProgress;
            state.queued = false;
        }

        let result =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.inner.task.execute(context)));
        if let Err(payload) = &result {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Task panicked on {}: {}", context.thread_name(), message);
        }
        self.inner.panicked.store(result.is_err(), Ordering::Release);

        self.inner.execution_count.fetch_add(1, Ordering::Release);
        context.tasks_executed.set(context.tasks_executed.get() + 1);
        self.inner.state.lock().unwrap().status = TaskStatus::Completed;
        self.inner.status_changed.notify_all();
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("priority", &self.priority())
            .field("status", &self.status())
            .finish()
    }
}
