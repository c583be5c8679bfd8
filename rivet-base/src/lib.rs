//! Lowest level crate of `rivet`. Provides the intrusive reference counting used to share GPU
//! resource wrappers between producer threads and the render thread.

mod ref_handle;
pub use ref_handle::RefCount;
pub use ref_handle::RefCounted;
pub use ref_handle::RefHandle;
