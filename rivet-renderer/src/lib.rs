//! Owns the render thread side of rivet: the `Driver` that runs one frame tick per call, and the
//! `RenderThread` that runs a driver on a dedicated thread.

mod driver;
pub use driver::*;

mod render_thread;
pub use render_thread::*;
