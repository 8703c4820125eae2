// GPU backend boundary
//
// Everything the frame engine needs from the graphics API, expressed over
// raw ash handles. `DeviceContext` implements it on a real device; tests
// drive the engine through an instrumented fake instead.

use ash::vk;
use crate::error::Result;

/// Image handed out by the presentation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    pub index: u32,
    /// The chain still works but no longer matches the surface exactly.
    pub suboptimal: bool,
}

/// Outcome of a bounded fence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceWait {
    Signaled,
    TimedOut,
}

/// One frame's graphics-queue submission.
#[derive(Debug, Clone, Copy)]
pub struct FrameSubmit {
    pub command_buffer: vk::CommandBuffer,
    /// Signaled by image acquisition; waited on at `wait_stage` only.
    pub wait_semaphore: vk::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    /// Signaled when the commands finish; presentation waits on it.
    pub signal_semaphore: vk::Semaphore,
    /// Signaled when the GPU retires the submission.
    pub fence: vk::Fence,
}

pub trait GpuBackend {
    // ─────────────────────────────────────────────────────────────────────
    // Swapchain state
    // ─────────────────────────────────────────────────────────────────────
    fn surface_format(&self) -> vk::Format;
    fn swapchain_extent(&self) -> vk::Extent2D;
    fn swapchain_image_views(&self) -> Vec<vk::ImageView>;
    /// Bumped by every successful `recreate`.
    fn swapchain_generation(&self) -> u64;

    /// Rebuild the image chain for the given window size.
    ///
    /// The caller must make sure no submitted work still references the old chain.
    fn recreate(&self, extent: vk::Extent2D) -> Result<()>;
    fn wait_idle(&self) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────
    // Object lifetime
    // ─────────────────────────────────────────────────────────────────────
    fn create_render_pass(&self, format: vk::Format) -> Result<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);
    fn create_command_pool(&self) -> Result<vk::CommandPool>;
    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>>;
    /// Also frees every command buffer allocated from the pool.
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn create_semaphore(&self) -> Result<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn create_fence(&self, signaled: bool) -> Result<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);

    // ─────────────────────────────────────────────────────────────────────
    // Frame protocol
    // ─────────────────────────────────────────────────────────────────────
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<FenceWait>;
    fn reset_fence(&self, fence: vk::Fence) -> Result<()>;
    /// Stale chain reports `GpuError::SwapchainOutOfDate`.
    fn acquire_next_image(&self, signal: vk::Semaphore, timeout_ns: u64) -> Result<AcquiredImage>;
    /// Reset the command buffer and open it for one-time recording.
    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()>;
    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()>;
    fn cmd_begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    );
    fn cmd_end_render_pass(&self, command_buffer: vk::CommandBuffer);
    /// Failure is reported as `GpuError::Submit`.
    fn submit(&self, submit: &FrameSubmit) -> Result<()>;
    /// Returns `true` when the chain is suboptimal. A stale chain reports
    /// `GpuError::SwapchainOutOfDate`, anything else `GpuError::Present`.
    fn present(&self, image_index: u32, wait: vk::Semaphore) -> Result<bool>;
}
