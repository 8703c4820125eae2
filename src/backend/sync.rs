// Frame slot synchronization
//
// One fence (GPU -> CPU) and two semaphores (GPU -> GPU) per frame in flight,
// plus the command buffer the slot records into.

use ash::vk;
use super::gpu::GpuBackend;
use crate::error::Result;

/// Per-slot resources - one per frame in flight
///
/// The command buffer is only re-recorded once `in_flight_fence` reports
/// that the slot's previous submission retired.
#[derive(Debug, Clone, Copy)]
pub struct FrameSlot {
    pub command_buffer: vk::CommandBuffer,
    /// Signaled by acquisition, waited on by the submission
    pub image_available: vk::Semaphore,
    /// Signaled by the submission, waited on by presentation
    pub render_finished: vk::Semaphore,
    pub in_flight_fence: vk::Fence,
}

impl FrameSlot {
    pub fn new<B: GpuBackend>(gpu: &B, command_buffer: vk::CommandBuffer) -> Result<Self> {
        let image_available = gpu.create_semaphore()?;
        let render_finished = match gpu.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                gpu.destroy_semaphore(image_available);
                return Err(e);
            }
        };
        // Start signaled so the first wait on this slot returns immediately
        let in_flight_fence = match gpu.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                gpu.destroy_semaphore(image_available);
                gpu.destroy_semaphore(render_finished);
                return Err(e);
            }
        };

        Ok(Self {
            command_buffer,
            image_available,
            render_finished,
            in_flight_fence,
        })
    }

    /// The command buffer belongs to the pool and is freed with it.
    pub fn destroy<B: GpuBackend>(&self, gpu: &B) {
        gpu.destroy_semaphore(self.image_available);
        gpu.destroy_semaphore(self.render_finished);
        gpu.destroy_fence(self.in_flight_fence);
    }
}
