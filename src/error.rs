// GPU error taxonomy
//
// Setup failures, runtime failures and the one recoverable condition
// (a stale swapchain) are distinct variants so callers can branch on them
// without inspecting message strings.

use ash::vk;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpuError {
    /// The Vulkan loader could not be found or loaded.
    #[error("Failed to load Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    /// No adapter exposes the queues, extensions and surface support we need.
    #[error("No suitable GPU found: {0}")]
    NoSuitableDevice(String),

    /// Object creation failed while bringing up the device context.
    #[error("Device initialization failed at {stage}: {result}")]
    DeviceInit {
        stage: &'static str,
        result: vk::Result,
    },

    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The swapchain no longer matches the surface. Recreate it and retry the frame.
    #[error("Swapchain out of date")]
    SwapchainOutOfDate,

    #[error("Queue submission failed: {0}")]
    Submit(vk::Result),

    #[error("Presentation failed: {0}")]
    Present(vk::Result),

    #[error("Device lost: {0}")]
    DeviceLost(String),

    /// The frame protocol was driven out of order (e.g. two begin_frame calls).
    #[error("Invalid frame state: {0}")]
    InvalidState(&'static str),

    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
}

impl GpuError {
    /// Shorthand for mapping a raw result into a setup-time failure.
    pub fn init(stage: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::DeviceInit { stage, result }
    }

    /// True only for conditions the caller is expected to recover from by
    /// recreating the swapchain and trying the frame again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SwapchainOutOfDate)
    }
}

pub type Result<T> = std::result::Result<T, GpuError>;
