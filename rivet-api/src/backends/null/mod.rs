//! Headless backend. It never touches a GPU: native objects are ids tracked in a table owned by
//! the device context, which is enough to validate object lifetimes, definitions and the order of
//! native calls made by the layers above.

mod api;
pub use api::*;

mod device_context;
pub use device_context::*;

mod context;
pub use context::*;

mod resources;
pub use resources::*;
