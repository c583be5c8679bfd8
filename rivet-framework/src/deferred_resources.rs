use rivet_api::RivetResult;
use std::sync::{Arc, Mutex};

/// A unit of deferred resource work. Receives the backend arguments of the registry (usually the
/// device context) and reports failure by returning an error. Errors are logged and counted, they
/// never stop the remaining callables from running.
pub type DeferredCallable<ArgsT> = Box<dyn FnOnce(&ArgsT) -> RivetResult<()> + Send>;

struct SubmitQueues<ArgsT> {
    init: Vec<DeferredCallable<ArgsT>>,
    release: Vec<DeferredCallable<ArgsT>>,
}

impl<ArgsT> Default for SubmitQueues<ArgsT> {
    fn default() -> Self {
        SubmitQueues {
            init: Default::default(),
            release: Default::default(),
        }
    }
}

/// Cloneable, thread-safe handle used to submit init/release work to a `DeferredResourceRegistry`.
/// Submitting never blocks on the render thread, only on other submitters for the duration of a
/// push.
pub struct DeferredResourceSubmitter<ArgsT> {
    inner: Arc<Mutex<SubmitQueues<ArgsT>>>,
}

impl<ArgsT> Clone for DeferredResourceSubmitter<ArgsT> {
    fn clone(&self) -> Self {
        DeferredResourceSubmitter {
            inner: self.inner.clone(),
        }
    }
}

impl<ArgsT> DeferredResourceSubmitter<ArgsT> {
    pub fn submit_init<F>(
        &self,
        callable: F,
    ) where
        F: FnOnce(&ArgsT) -> RivetResult<()> + Send + 'static,
    {
        self.inner.lock().unwrap().init.push(Box::new(callable));
    }

    pub fn submit_release<F>(
        &self,
        callable: F,
    ) where
        F: FnOnce(&ArgsT) -> RivetResult<()> + Send + 'static,
    {
        self.inner.lock().unwrap().release.push(Box::new(callable));
    }

    /// Number of (init, release) callables accepted since the last `begin_frame()`
    pub fn submitted_counts(&self) -> (usize, usize) {
        let queues = self.inner.lock().unwrap();
        (queues.init.len(), queues.release.len())
    }
}

/// Totals since the registry was created
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferredResourceStats {
    pub frames: u64,
    pub inits_executed: u64,
    pub inits_failed: u64,
    pub releases_executed: u64,
    pub releases_failed: u64,
    pub discarded: u64,
}

/// Result of running one deferred queue
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferredQueueResult {
    pub executed: usize,
    pub failed: usize,
}

/// Holds init and release work submitted from any thread and runs it at frame boundaries on the
/// thread that owns the registry (the render thread).
///
/// There are two pairs of queues. Submitters append to the "submit" pair under a lock.
/// `begin_frame()` swaps the submit pair with the "deferred" pair, which the owner then drains
/// without holding the lock. Work submitted while the deferred queues are executing, including
/// work submitted by the callables themselves, lands in the next frame.
///
/// Within a frame, every release runs before any init so that native handles are freed before new
/// ones are requested.
pub struct DeferredResourceRegistry<ArgsT> {
    submitter: DeferredResourceSubmitter<ArgsT>,
    deferred_init: Vec<DeferredCallable<ArgsT>>,
    deferred_release: Vec<DeferredCallable<ArgsT>>,
    in_frame: bool,
    stats: DeferredResourceStats,
}

impl<ArgsT> Default for DeferredResourceRegistry<ArgsT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<ArgsT> DeferredResourceRegistry<ArgsT> {
    pub fn new() -> Self {
        DeferredResourceRegistry {
            submitter: DeferredResourceSubmitter {
                inner: Default::default(),
            },
            deferred_init: Default::default(),
            deferred_release: Default::default(),
            in_frame: false,
            stats: Default::default(),
        }
    }

    pub fn submitter(&self) -> DeferredResourceSubmitter<ArgsT> {
        self.submitter.clone()
    }

    pub fn submit_init<F>(
        &self,
        callable: F,
    ) where
        F: FnOnce(&ArgsT) -> RivetResult<()> + Send + 'static,
    {
        self.submitter.submit_init(callable);
    }

    pub fn submit_release<F>(
        &self,
        callable: F,
    ) where
        F: FnOnce(&ArgsT) -> RivetResult<()> + Send + 'static,
    {
        self.submitter.submit_release(callable);
    }

    pub fn stats(&self) -> DeferredResourceStats {
        self.stats
    }

    /// Number of (init, release) callables swapped in by `begin_frame()` and not yet executed
    pub fn deferred_counts(&self) -> (usize, usize) {
        (self.deferred_init.len(), self.deferred_release.len())
    }

    /// Number of (init, release) callables waiting for the next `begin_frame()`
    pub fn submitted_counts(&self) -> (usize, usize) {
        self.submitter.submitted_counts()
    }

    /// True if nothing is submitted or deferred
    pub fn is_idle(&self) -> bool {
        let (init, release) = self.submitted_counts();
        init == 0
            && release == 0
            && self.deferred_init.is_empty()
            && self.deferred_release.is_empty()
    }

    pub fn begin_frame(&mut self) {
        profiling::scope!("DeferredResourceRegistry::begin_frame");
        assert!(
            !self.in_frame,
            "begin_frame called twice without a matching end_frame"
        );
        assert!(self.deferred_init.is_empty() && self.deferred_release.is_empty());

        // The deferred vecs are empty but keep their capacity, so after the swap submitters push
        // into storage that was allocated by earlier frames
        let mut queues = self.submitter.inner.lock().unwrap();
        std::mem::swap(&mut queues.init, &mut self.deferred_init);
        std::mem::swap(&mut queues.release, &mut self.deferred_release);
        drop(queues);

        self.in_frame = true;
        log::trace!(
            "Deferred resources begin frame: {} init, {} release",
            self.deferred_init.len(),
            self.deferred_release.len()
        );
    }

    pub fn execute_pending_release_queue(
        &mut self,
        args: &ArgsT,
    ) -> DeferredQueueResult {
        profiling::scope!("DeferredResourceRegistry::execute_pending_release_queue");
        assert!(self.in_frame, "release queue executed outside of a frame");

        let result = Self::execute_queue(&mut self.deferred_release, args, "release");
        self.stats.releases_executed += result.executed as u64;
        self.stats.releases_failed += result.failed as u64;
        result
    }

    pub fn execute_pending_init_queue(
        &mut self,
        args: &ArgsT,
    ) -> DeferredQueueResult {
        profiling::scope!("DeferredResourceRegistry::execute_pending_init_queue");
        assert!(self.in_frame, "init queue executed outside of a frame");

        let result = Self::execute_queue(&mut self.deferred_init, args, "init");
        self.stats.inits_executed += result.executed as u64;
        self.stats.inits_failed += result.failed as u64;
        result
    }

    fn execute_queue(
        queue: &mut Vec<DeferredCallable<ArgsT>>,
        args: &ArgsT,
        queue_name: &str,
    ) -> DeferredQueueResult {
        let mut result = DeferredQueueResult::default();
        for callable in queue.drain(..) {
            result.executed += 1;
            if let Err(e) = (callable)(args) {
                log::error!("Deferred {} failed: {}", queue_name, e);
                result.failed += 1;
            }
        }

        result
    }

    pub fn end_frame(&mut self) {
        profiling::scope!("DeferredResourceRegistry::end_frame");
        assert!(self.in_frame, "end_frame called without begin_frame");

        let discarded = self.deferred_init.len() + self.deferred_release.len();
        if discarded > 0 {
            log::warn!(
                "{} deferred init and {} deferred release callables were never executed and will be dropped",
                self.deferred_init.len(),
                self.deferred_release.len()
            );
            self.stats.discarded += discarded as u64;
        }

        self.deferred_init.clear();
        self.deferred_release.clear();
        self.in_frame = false;
        self.stats.frames += 1;
    }
}
