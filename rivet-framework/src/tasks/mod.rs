mod task;
pub use task::*;

mod task_scheduler;
pub use task_scheduler::*;
