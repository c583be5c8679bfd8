use crossbeam_channel::{Receiver, Sender};
use rivet_api::RivetResult;
use std::sync::{Arc, Mutex};

/// A recorded command. Executed once on the thread that owns the consumer with mutable access to
/// the consumer's arguments (usually the render thread's `RivetContext`).
pub type AsyncCommand<ArgsT> = Box<dyn FnOnce(&mut ArgsT) -> RivetResult<()> + Send>;

// One per producer handle. Only the handle appends committed batches, only the consumer swaps the
// buffer out.
struct CommandSlot<ArgsT> {
    commands: Mutex<Vec<AsyncCommand<ArgsT>>>,
}

/// Producer side of a command queue. Cheap to create, any number may exist at once. Commands
/// enqueued on one handle execute in enqueue order. There is no ordering between different
/// handles.
///
/// Enqueued commands are recorded locally and only become visible to the consumer on `commit()`,
/// so a batch is never executed partially.
///
/// Dropping the handle does not cancel anything. Recorded commands are committed, and everything
/// committed still executes on the next `execute_pending()`.
pub struct AsyncCommandQueue<ArgsT> {
    slot: Arc<CommandSlot<ArgsT>>,
    recording: Mutex<Vec<AsyncCommand<ArgsT>>>,
}

impl<ArgsT> AsyncCommandQueue<ArgsT> {
    /// Record a command. Never blocks on the consumer.
    pub fn enqueue<F>(
        &self,
        command: F,
    ) where
        F: FnOnce(&mut ArgsT) -> RivetResult<()> + Send + 'static,
    {
        self.recording.lock().unwrap().push(Box::new(command));
    }

    /// Publish every command recorded since the last commit. Returns the number of commands
    /// published.
    pub fn commit(&self) -> usize {
        let mut recording = self.recording.lock().unwrap();
        let count = recording.len();
        if count > 0 {
            let mut commands = self.slot.commands.lock().unwrap();
            if commands.is_empty() {
                std::mem::swap(&mut *commands, &mut *recording);
            } else {
                commands.append(&mut *recording);
            }
        }
        count
    }

    /// Commands recorded but not yet committed
    pub fn recorded_count(&self) -> usize {
        self.recording.lock().unwrap().len()
    }

    /// Commands committed since the consumer last drained this handle
    pub fn pending_count(&self) -> usize {
        self.slot.commands.lock().unwrap().len()
    }
}

impl<ArgsT> Drop for AsyncCommandQueue<ArgsT> {
    fn drop(&mut self) {
        self.commit();
    }
}

impl<ArgsT> std::fmt::Debug for AsyncCommandQueue<ArgsT> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AsyncCommandQueue")
            .field("recorded_count", &self.recorded_count())
            .field("pending_count", &self.pending_count())
            .finish()
    }
}

/// Cloneable and `Send`, so that any thread can create queues for a consumer it does not own
pub struct AsyncCommandQueueFactory<ArgsT> {
    register_tx: Sender<Arc<CommandSlot<ArgsT>>>,
}

impl<ArgsT> Clone for AsyncCommandQueueFactory<ArgsT> {
    fn clone(&self) -> Self {
        AsyncCommandQueueFactory {
            register_tx: self.register_tx.clone(),
        }
    }
}

impl<ArgsT> AsyncCommandQueueFactory<ArgsT> {
    pub fn create_queue(&self) -> AsyncCommandQueue<ArgsT> {
        let slot = Arc::new(CommandSlot {
            commands: Mutex::new(Vec::default()),
        });

        // The slot is registered before the handle is returned, so anything enqueued on it is seen
        // by the consumer. If the consumer is gone the handle still works but nothing will run.
        if self.register_tx.send(slot.clone()).is_err() {
            log::warn!("Created a command queue after its consumer was dropped");
        }

        AsyncCommandQueue {
            slot,
            recording: Default::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AsyncCommandQueueStats {
    /// Live queues known to the consumer, including ones created since the last execute
    pub total_queues: usize,
    /// Empty command buffers ready to be swapped into queues
    pub free_buffers: usize,
    pub executed_commands: u64,
    pub failed_commands: u64,
    /// Number of non-empty command buffers that have been executed
    pub executed_buffers: u64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AsyncCommandQueueExecuteResult {
    pub executed: usize,
    pub failed: usize,
}

/// Consumer side. Owned by the thread that executes commands.
///
/// Each `execute_pending()` first swaps the committed buffer of every queue for an empty recycled
/// one, then executes the swapped-out commands queue by queue in creation order. Commands committed
/// after the swap, even by the commands themselves and on any queue, execute on the next call.
/// Queues whose handle has been dropped are drained one last time and then forgotten.
pub struct AsyncCommandQueueConsumer<ArgsT> {
    factory: AsyncCommandQueueFactory<ArgsT>,
    register_rx: Receiver<Arc<CommandSlot<ArgsT>>>,
    slots: Vec<Arc<CommandSlot<ArgsT>>>,
    free_buffers: Vec<Vec<AsyncCommand<ArgsT>>>,
    executed_commands: u64,
    failed_commands: u64,
    executed_buffers: u64,
}

impl<ArgsT> Default for AsyncCommandQueueConsumer<ArgsT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<ArgsT> AsyncCommandQueueConsumer<ArgsT> {
    pub fn new() -> Self {
        let (register_tx, register_rx) = crossbeam_channel::unbounded();
        AsyncCommandQueueConsumer {
            factory: AsyncCommandQueueFactory { register_tx },
            register_rx,
            slots: Default::default(),
            free_buffers: Default::default(),
            executed_commands: 0,
            failed_commands: 0,
            executed_buffers: 0,
        }
    }

    pub fn create_queue(&self) -> AsyncCommandQueue<ArgsT> {
        self.factory.create_queue()
    }

    pub fn factory(&self) -> AsyncCommandQueueFactory<ArgsT> {
        self.factory.clone()
    }

    pub fn stats(&self) -> AsyncCommandQueueStats {
        AsyncCommandQueueStats {
            total_queues: self.slots.len() + self.register_rx.len(),
            free_buffers: self.free_buffers.len(),
            executed_commands: self.executed_commands,
            failed_commands: self.failed_commands,
            executed_buffers: self.executed_buffers,
        }
    }

    /// True if no queue has commands waiting
    pub fn is_idle(&mut self) -> bool {
        self.register_new_queues();
        self.slots
            .iter()
            .all(|slot| slot.commands.lock().unwrap().is_empty())
    }

    fn register_new_queues(&mut self) {
        for slot in self.register_rx.try_iter() {
            self.slots.push(slot);
        }
    }

    pub fn execute_pending(
        &mut self,
        args: &mut ArgsT,
    ) -> AsyncCommandQueueExecuteResult {
        profiling::scope!("AsyncCommandQueueConsumer::execute_pending");

        // Pick up queues created since the last call
        self.register_new_queues();

        // Take every queue's committed commands before running any of them
        let mut snapshot = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            // Checked before swapping: if we are the only owner, the handle is gone and has
            // committed everything it will ever commit
            let orphaned = Arc::strong_count(slot) == 1;

            let mut buffer = self.free_buffers.pop().unwrap_or_default();
            std::mem::swap(&mut buffer, &mut *slot.commands.lock().unwrap());
            snapshot.push((orphaned, buffer));
        }

        let mut result = AsyncCommandQueueExecuteResult::default();
        let mut orphaned_slots = Vec::with_capacity(snapshot.len());
        for (orphaned, mut buffer) in snapshot {
            if !buffer.is_empty() {
                self.executed_buffers += 1;
                for command in buffer.drain(..) {
                    result.executed += 1;
                    if let Err(e) = (command)(args) {
                        log::error!("Async command failed: {}", e);
                        result.failed += 1;
                    }
                }
            }

            self.free_buffers.push(buffer);
            orphaned_slots.push(orphaned);
        }

        // Only slots that were orphaned before the swap are retired. A handle dropped while we were
        // executing may have committed more commands, so it is kept until the next call.
        let retired_count = orphaned_slots.iter().filter(|x| **x).count();
        if retired_count > 0 {
            let mut orphaned_iter = orphaned_slots.into_iter();
            self.slots.retain(|_| !orphaned_iter.next().unwrap_or(false));
            log::trace!("Retired {} command queues", retired_count);
        }

        // Never keep more spare buffers than there are queues to swap them into
        self.free_buffers.truncate(self.slots.len().max(1));

        self.executed_commands += result.executed as u64;
        self.failed_commands += result.failed as u64;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_execute_in_order_once() {
        let mut consumer = AsyncCommandQueueConsumer::<Vec<u32>>::new();
        let queue = consumer.create_queue();
        for i in 0..10 {
            queue.enqueue(move |args| {
                args.push(i);
                Ok(())
            });
        }
        assert_eq!(queue.recorded_count(), 10);
        assert_eq!(queue.commit(), 10);
        assert_eq!(queue.recorded_count(), 0);
        assert_eq!(queue.pending_count(), 10);

        let mut args = Vec::default();
        let result = consumer.execute_pending(&mut args);
        assert_eq!(result.executed, 10);
        assert_eq!(args, (0..10).collect::<Vec<_>>());
        assert_eq!(queue.pending_count(), 0);

        // Nothing runs twice
        consumer.execute_pending(&mut args);
        assert_eq!(args.len(), 10);
    }

    #[test]
    fn test_commands_enqueued_after_execute_wait_for_next_execute() {
        let mut consumer = AsyncCommandQueueConsumer::<Vec<&'static str>>::new();
        let queue = consumer.create_queue();

        queue.enqueue(|args| {
            args.push("first");
            Ok(())
        });
        queue.commit();

        let mut args = Vec::default();
        consumer.execute_pending(&mut args);

        queue.enqueue(|args| {
            args.push("second");
            Ok(())
        });
        queue.commit();
        assert_eq!(args, vec!["first"]);

        consumer.execute_pending(&mut args);
        assert_eq!(args, vec!["first", "second"]);
    }

    #[test]
    fn test_commands_enqueued_by_commands_run_next_time() {
        struct Args {
            log: Vec<u32>,
            queue: Option<AsyncCommandQueue<Args>>,
        }

        let mut consumer = AsyncCommandQueueConsumer::<Args>::new();
        let queue = consumer.create_queue();
        queue.enqueue(|args| {
            args.log.push(1);
            let queue = args.queue.as_ref().unwrap();
            queue.enqueue(|args| {
                args.log.push(2);
                Ok(())
            });
            queue.commit();
            Ok(())
        });
        queue.commit();

        let mut args = Args {
            log: Vec::default(),
            queue: Some(queue),
        };
        consumer.execute_pending(&mut args);
        assert_eq!(args.log, vec![1]);
        consumer.execute_pending(&mut args);
        assert_eq!(args.log, vec![1, 2]);
    }

    #[test]
    fn test_dropped_handle_is_drained_then_retired() {
        let mut consumer = AsyncCommandQueueConsumer::<Vec<u32>>::new();
        let kept = consumer.create_queue();
        let dropped = consumer.create_queue();
        // Never committed explicitly, dropping the handle commits it
        dropped.enqueue(|args| {
            args.push(1);
            Ok(())
        });
        drop(dropped);

        assert_eq!(consumer.stats().total_queues, 2);

        let mut args = Vec::default();
        consumer.execute_pending(&mut args);
        assert_eq!(args, vec![1]);
        assert_eq!(consumer.stats().total_queues, 1);

        kept.enqueue(|args| {
            args.push(2);
            Ok(())
        });
        kept.commit();
        consumer.execute_pending(&mut args);
        assert_eq!(args, vec![1, 2]);
    }

    #[test]
    fn test_failed_command_does_not_stop_others() {
        let mut consumer = AsyncCommandQueueConsumer::<Vec<u32>>::new();
        let queue = consumer.create_queue();
        queue.enqueue(|args| {
            args.push(1);
            Ok(())
        });
        queue.enqueue(|_| Err("no shader bound".into()));
        queue.enqueue(|args| {
            args.push(3);
            Ok(())
        });
        queue.commit();

        let mut args = Vec::default();
        let result = consumer.execute_pending(&mut args);
        assert_eq!(
            result,
            AsyncCommandQueueExecuteResult {
                executed: 3,
                failed: 1
            }
        );
        assert_eq!(args, vec![1, 3]);
        assert_eq!(consumer.stats().failed_commands, 1);
    }

    #[test]
    fn test_buffers_are_recycled() {
        let mut consumer = AsyncCommandQueueConsumer::<u32>::new();
        let queues: Vec<_> = (0..4).map(|_| consumer.create_queue()).collect();

        let mut args = 0;
        for _ in 0..3 {
            for queue in &queues {
                queue.enqueue(|args| {
                    *args += 1;
                    Ok(())
                });
                queue.commit();
            }
            consumer.execute_pending(&mut args);
        }

        assert_eq!(args, 12);
        let stats = consumer.stats();
        assert_eq!(stats.total_queues, 4);
        assert_eq!(stats.executed_buffers, 12);
        assert_eq!(stats.executed_commands, 12);
        assert!(stats.free_buffers <= 4);
        assert!(consumer.is_idle());
    }

    #[test]
    fn test_factory_creates_queues_on_other_threads() {
        const PRODUCER_COUNT: u32 = 4;
        const COMMANDS_PER_PRODUCER: u32 = 1000;

        let mut consumer = AsyncCommandQueueConsumer::<Vec<(u32, u32)>>::new();
        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        let mut join_handles = Vec::default();
        for producer in 0..PRODUCER_COUNT {
            let factory = consumer.factory();
            let done_tx = done_tx.clone();
            join_handles.push(std::thread::spawn(move || {
                let queue = factory.create_queue();
                for i in 0..COMMANDS_PER_PRODUCER {
                    queue.enqueue(move |args| {
                        args.push((producer, i));
                        Ok(())
                    });
                    if i % 100 == 99 {
                        queue.commit();
                    }
                }
                done_tx.send(()).unwrap();
            }));
        }
        drop(done_tx);

        let mut args = Vec::default();
        let mut finished = 0;
        while finished < PRODUCER_COUNT {
            consumer.execute_pending(&mut args);
            while done_rx.try_recv().is_ok() {
                finished += 1;
            }
        }

        for join_handle in join_handles {
            join_handle.join().unwrap();
        }
        consumer.execute_pending(&mut args);

        assert_eq!(args.len(), (PRODUCER_COUNT * COMMANDS_PER_PRODUCER) as usize);
        for producer in 0..PRODUCER_COUNT {
            let sequence: Vec<_> = args
                .iter()
                .filter(|(p, _)| *p == producer)
                .map(|(_, i)| *i)
                .collect();
            assert_eq!(sequence, (0..COMMANDS_PER_PRODUCER).collect::<Vec<_>>());
        }

        // Every producer dropped its handle, so all queues are retired
        assert_eq!(consumer.stats().total_queues, 0);
    }

    #[test]
    fn test_uncommitted_commands_are_not_executed() {
        let mut consumer = AsyncCommandQueueConsumer::<Vec<u32>>::new();
        let queue = consumer.create_queue();
        queue.enqueue(|args| {
            args.push(1);
            Ok(())
        });
        queue.commit();

        // The second half of a batch that is still being recorded
        queue.enqueue(|args| {
            args.push(2);
            Ok(())
        });

        let mut args = Vec::default();
        let result = consumer.execute_pending(&mut args);
        assert_eq!(result.executed, 1);
        assert_eq!(args, vec![1]);
        assert_eq!(queue.recorded_count(), 1);
        assert!(consumer.is_idle());

        queue.enqueue(|args| {
            args.push(3);
            Ok(())
        });
        assert_eq!(queue.commit(), 2);
        assert_eq!(queue.commit(), 0);
        assert!(!consumer.is_idle());

        consumer.execute_pending(&mut args);
        assert_eq!(args, vec![1, 2, 3]);
    }

    #[test]
    fn test_commands_committed_to_other_queues_during_execute_run_next_time() {
        struct Args {
            log: Vec<u32>,
            second: Option<AsyncCommandQueue<Args>>,
        }

        let mut consumer = AsyncCommandQueueConsumer::<Args>::new();
        let first = consumer.create_queue();
        let second = consumer.create_queue();

        // Runs before anything on the second queue, which was created later
        first.enqueue(|args| {
            args.log.push(1);
            let second = args.second.as_ref().unwrap();
            second.enqueue(|args| {
                args.log.push(2);
                Ok(())
            });
            second.commit();
            Ok(())
        });
        first.commit();

        let mut args = Args {
            log: Vec::default(),
            second: Some(second),
        };
        let result = consumer.execute_pending(&mut args);
        assert_eq!(result.executed, 1);
        assert_eq!(args.log, vec![1]);

        let result = consumer.execute_pending(&mut args);
        assert_eq!(result.executed, 1);
        assert_eq!(args.log, vec![1, 2]);
    }
}
