pub use rivet_base as base;

pub use rivet_api as api;

#[cfg(feature = "framework")]
pub use rivet_framework as framework;

#[cfg(feature = "renderer")]
pub use rivet_renderer as renderer;
