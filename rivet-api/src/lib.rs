//! Backend layer of `rivet`. Native graphics objects are created and destroyed through a
//! `RivetDeviceContext` (cloneable, usable from any thread) and work is recorded through a
//! `RivetContext` (owned by the render thread).
//!
//! Backends are a closed set selected once at startup with the `RivetApi::new_*` functions. Every
//! object type is an enum with one variant per backend, and the per-backend implementation can be
//! reached with the `null_*()` accessors when needed.
//!
//! The `null` backend is headless. It allocates ids for native objects, validates definitions and
//! tracks which objects are alive so that leaks and double-destroys are reported.

pub use api::*;
pub use buffer::*;
pub use context::*;
pub use device_context::*;
pub use error::*;
pub use sampler::*;
pub use shader::*;
pub use texture::*;
pub use types::*;

pub use backends::null;

mod backends;
mod internal_shared;
pub use internal_shared::FrameCache;

mod api;
mod buffer;
mod context;
mod device_context;
mod error;
mod sampler;
mod shader;
mod texture;
mod types;

#[cfg(test)]
mod api_tests;
