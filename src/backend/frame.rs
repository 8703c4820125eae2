// Frame Engine - N-buffered CPU/GPU handoff
//
// FRAME TIMELINE (one slot):
// ┌─────────────────────────────────────────────────────────────────────────────┐
// │  wait_fence ─> open cmds ─> acquire ─> reset_fence ─> submit ─> present     │
// │                                                                             │
// │  (CPU blocks   (buffer is    (GPU signals  (caller draws  (display waits    │
// │   only here)    idle now)     image_avail)  after this)    on render_done)  │
// └─────────────────────────────────────────────────────────────────────────────┘
//
// Slot k's command buffer and semaphores are only touched again after slot
// k's fence fires, so the CPU can run at most N-1 frames ahead of the GPU.
// The fence is re-armed last, once nothing between it and the submit can fail.

use ash::vk;
use std::sync::Arc;
use std::time::Duration;

use super::gpu::{FenceWait, FrameSubmit, GpuBackend};
use super::render_pass::FramebufferSet;
use super::sync::FrameSlot;
use crate::error::{GpuError, Result};

pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;
pub const MIN_FRAMES_IN_FLIGHT: usize = 2;

/// Clear color of the editor viewport background.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.05, 0.05, 0.05, 1.0];

#[derive(Debug, Clone)]
pub struct FrameSettings {
    /// Size of the frame-slot ring. Must be at least 2.
    pub frames_in_flight: usize,
    pub clear_color: [f32; 4],
    /// `None` waits forever.
    pub fence_timeout: Option<Duration>,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            clear_color: DEFAULT_CLEAR_COLOR,
            fence_timeout: None,
        }
    }
}

impl FrameSettings {
    fn timeout_ns(&self) -> u64 {
        self.fence_timeout
            .map_or(u64::MAX, |timeout| u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX))
    }
}

/// The open recording target handed to the caller between
/// `begin_frame` and `end_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTarget {
    /// Already inside the render pass; draw commands go straight in.
    pub command_buffer: vk::CommandBuffer,
    /// Viewport size for this frame.
    pub extent: vk::Extent2D,
    /// Frame slot, always in `[0, frames_in_flight)`.
    pub frame_index: usize,
    /// Swapchain image being rendered, independent of `frame_index`.
    pub image_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Idle,
    Recording { image_index: u32 },
}

pub struct FrameEngine<B: GpuBackend> {
    gpu: Arc<B>,
    settings: FrameSettings,

    render_pass: vk::RenderPass,
    render_pass_format: vk::Format,
    framebuffers: FramebufferSet,

    command_pool: vk::CommandPool,
    slots: Vec<FrameSlot>,

    /// Which slot the next (or current) frame uses
    current_frame: usize,
    state: FrameState,
    /// Set when acquire or present reported a suboptimal swapchain
    suboptimal: bool,
    torn_down: bool,
}

impl<B: GpuBackend> FrameEngine<B> {
    /// Build the render pass, framebuffers, command buffers and per-slot
    /// sync objects against the backend's current swapchain.
    pub fn new(gpu: Arc<B>, settings: FrameSettings) -> Result<Self> {
        if settings.frames_in_flight < MIN_FRAMES_IN_FLIGHT {
            return Err(GpuError::InvalidConfig(format!(
                "frames_in_flight must be at least {}, got {}",
                MIN_FRAMES_IN_FLIGHT, settings.frames_in_flight
            )));
        }

        let render_pass_format = gpu.surface_format();
        let render_pass = gpu.create_render_pass(render_pass_format)?;

        // From here on Drop releases whatever was created if a step fails
        let mut engine = Self {
            gpu,
            settings,
            render_pass,
            render_pass_format,
            framebuffers: FramebufferSet::empty(),
            command_pool: vk::CommandPool::null(),
            slots: Vec::new(),
            current_frame: 0,
            state: FrameState::Idle,
            suboptimal: false,
            torn_down: false,
        };

        engine.framebuffers = FramebufferSet::new(&*engine.gpu, render_pass)?;
        engine.command_pool = engine.gpu.create_command_pool()?;

        let frames = engine.settings.frames_in_flight;
        let command_buffers = engine
            .gpu
            .allocate_command_buffers(engine.command_pool, frames as u32)?;
        for command_buffer in command_buffers {
            let slot = FrameSlot::new(&*engine.gpu, command_buffer)?;
            engine.slots.push(slot);
        }

        log::info!(
            "Frame engine ready: {} frames in flight, {} framebuffers",
            frames,
            engine.framebuffers.len()
        );
        Ok(engine)
    }

    // =========================================================================
    // FRAME PROTOCOL
    // =========================================================================

    /// Wait for the current slot to retire, acquire a swapchain image and
    /// open the render pass on it.
    ///
    /// `SwapchainOutOfDate` leaves the engine idle with the slot untouched;
    /// recreate the swapchain and call again.
    pub fn begin_frame(&mut self) -> Result<CommandTarget> {
        if self.state != FrameState::Idle {
            return Err(GpuError::InvalidState("begin_frame called while a frame is recording"));
        }

        // Someone recreated the swapchain behind our back
        if self.framebuffers.generation() != self.gpu.swapchain_generation() {
            self.rebuild_swapchain_resources()?;
        }

        let slot = self.slots[self.current_frame];
        let timeout = self.settings.timeout_ns();

        // ─────────────────────────────────────────────────────────────────────
        // STEP 1: Wait until the GPU is done with this slot's last submission
        // ─────────────────────────────────────────────────────────────────────
        if self.gpu.wait_for_fence(slot.in_flight_fence, timeout)? == FenceWait::TimedOut {
            return Err(GpuError::DeviceLost(format!(
                "frame slot {} did not complete within {:?}",
                self.current_frame, self.settings.fence_timeout
            )));
        }

        // ─────────────────────────────────────────────────────────────────────
        // STEP 2: Open the slot's command buffer
        // ─────────────────────────────────────────────────────────────────────
        // Its last submission retired above. Reopening is harmless if a later
        // step bails, the next attempt resets it again.
        self.gpu.begin_commands(slot.command_buffer)?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 3: Acquire the next image
        // ─────────────────────────────────────────────────────────────────────
        // The fence is still signaled here, so bailing out on a stale
        // swapchain leaves the slot ready for the retry.
        let acquired = self.gpu.acquire_next_image(slot.image_available, timeout)?;
        if acquired.suboptimal {
            log::debug!("Swapchain suboptimal on acquire");
            self.suboptimal = true;
        }
        let framebuffer = self.framebuffers.get(acquired.index).ok_or(GpuError::InvalidState(
            "acquired image index outside the swapchain",
        ))?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 4: Re-arm the fence and open the render pass
        // ─────────────────────────────────────────────────────────────────────
        self.gpu.reset_fence(slot.in_flight_fence)?;

        let extent = self.framebuffers.extent();
        self.gpu.cmd_begin_render_pass(
            slot.command_buffer,
            self.render_pass,
            framebuffer,
            extent,
            self.settings.clear_color,
        );

        self.state = FrameState::Recording {
            image_index: acquired.index,
        };
        Ok(self.target(acquired.index))
    }

    /// Close the render pass, submit the slot and present its image.
    ///
    /// Once the submission went through the cursor advances, even when
    /// presentation reports `SwapchainOutOfDate`.
    pub fn end_frame(&mut self) -> Result<()> {
        let FrameState::Recording { image_index } = self.state else {
            return Err(GpuError::InvalidState("end_frame called without begin_frame"));
        };
        let slot = self.slots[self.current_frame];

        self.gpu.cmd_end_render_pass(slot.command_buffer);
        self.gpu.end_commands(slot.command_buffer)?;

        // Only color output has to wait for the image; earlier stages run ahead
        self.gpu.submit(&FrameSubmit {
            command_buffer: slot.command_buffer,
            wait_semaphore: slot.image_available,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: slot.render_finished,
            fence: slot.in_flight_fence,
        })?;

        self.state = FrameState::Idle;
        self.current_frame = (self.current_frame + 1) % self.slots.len();

        if self.gpu.present(image_index, slot.render_finished)? {
            log::debug!("Swapchain suboptimal on present");
            self.suboptimal = true;
        }
        Ok(())
    }

    /// The open command target, if a frame is recording.
    pub fn current_command_target(&self) -> Option<CommandTarget> {
        match self.state {
            FrameState::Recording { image_index } => Some(self.target(image_index)),
            FrameState::Idle => None,
        }
    }

    fn target(&self, image_index: u32) -> CommandTarget {
        CommandTarget {
            command_buffer: self.slots[self.current_frame].command_buffer,
            extent: self.framebuffers.extent(),
            frame_index: self.current_frame,
            image_index,
        }
    }

    // =========================================================================
    // SWAPCHAIN RECREATION
    // =========================================================================

    /// Wait for the GPU, rebuild the swapchain at `extent` and everything
    /// here that depends on it.
    pub fn recreate_swapchain(&mut self, extent: vk::Extent2D) -> Result<()> {
        if self.state != FrameState::Idle {
            return Err(GpuError::InvalidState("cannot recreate the swapchain mid-frame"));
        }

        self.gpu.wait_idle()?;
        self.gpu.recreate(extent)?;
        self.rebuild_swapchain_resources()?;
        self.suboptimal = false;
        Ok(())
    }

    /// Rebuild framebuffers (and the render pass if the format moved).
    ///
    /// The device must be idle, which swapchain recreation already requires.
    fn rebuild_swapchain_resources(&mut self) -> Result<()> {
        self.framebuffers.destroy(&*self.gpu);

        let format = self.gpu.surface_format();
        if format != self.render_pass_format {
            log::info!(
                "Surface format changed {:?} -> {:?}, rebuilding render pass",
                self.render_pass_format,
                format
            );
            self.gpu.destroy_render_pass(self.render_pass);
            self.render_pass = vk::RenderPass::null();
            self.render_pass = self.gpu.create_render_pass(format)?;
            self.render_pass_format = format;
        }

        self.framebuffers = FramebufferSet::new(&*self.gpu, self.render_pass)?;
        log::debug!(
            "Rebuilt {} framebuffers for swapchain generation {}",
            self.framebuffers.len(),
            self.framebuffers.generation()
        );
        Ok(())
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Framebuffers in the current set.
    ///
    /// A recreate done directly on the backend is picked up lazily by the next
    /// `begin_frame`; until then this reports the previous chain's count.
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Same laziness as `framebuffer_count`.
    pub fn extent(&self) -> vk::Extent2D {
        self.framebuffers.extent()
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, FrameState::Recording { .. })
    }

    /// True once acquire or present hinted that the swapchain should be rebuilt.
    pub fn is_suboptimal(&self) -> bool {
        self.suboptimal
    }

    // =========================================================================
    // CLEANUP
    // =========================================================================

    /// Wait for the device to go idle and release every engine-owned object.
    pub fn shutdown(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        // Release even if the wait failed; a lost device still accepts destroys
        let idle = self.gpu.wait_idle();

        self.framebuffers.destroy(&*self.gpu);
        if self.render_pass != vk::RenderPass::null() {
            self.gpu.destroy_render_pass(self.render_pass);
            self.render_pass = vk::RenderPass::null();
        }
        if self.command_pool != vk::CommandPool::null() {
            self.gpu.destroy_command_pool(self.command_pool);
            self.command_pool = vk::CommandPool::null();
        }
        for slot in self.slots.drain(..) {
            slot.destroy(&*self.gpu);
        }

        log::info!("Frame engine destroyed");
        idle
    }
}

impl<B: GpuBackend> Drop for FrameEngine<B> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::error!("Frame engine teardown: {}", e);
        }
    }
}
