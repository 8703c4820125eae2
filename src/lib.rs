// Scene editor rendering core
//
// Device bring-up, swapchain lifecycle and the N-buffered frame loop the
// editor viewport draws through.

pub mod backend;
pub mod config;
pub mod error;

pub use error::{GpuError, Result};
