mod gpu_resource;
pub use gpu_resource::*;

mod render_device;
pub use render_device::*;

#[cfg(test)]
mod gpu_resource_tests;
