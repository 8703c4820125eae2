// Backend module - Vulkan abstraction layer
//
// Design: DeviceContext owns the long-lived Vulkan objects, FrameEngine owns
// everything that turns over per frame. They meet at the GpuBackend trait.

pub mod device;
pub mod frame;
pub mod gpu;
pub mod render_pass;
pub mod swapchain;
pub mod sync;

#[cfg(test)]
pub mod testing;

pub use device::{DeviceContext, DeviceOptions};
pub use frame::{CommandTarget, FrameEngine, FrameSettings};
pub use gpu::GpuBackend;
