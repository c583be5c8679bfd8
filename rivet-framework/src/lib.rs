//! Tools for moving work between threads and the render thread: a registry of deferred native
//! resource init/release work, per-producer command queues drained once per frame, reference
//! counted GPU resource wrappers, and a priority task scheduler for background work.

mod deferred_resources;
pub use deferred_resources::*;

mod async_command_queue;
pub use async_command_queue::*;

mod resources;
pub use resources::*;

mod tasks;
pub use tasks::*;

pub use rivet_api::RivetResult;
pub use rivet_base::{RefCount, RefCounted, RefHandle};
