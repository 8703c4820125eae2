// Instrumented fake GPU for exercising the frame protocol without a device.
//
// Handles are plain counters. Fences are real CPU-waitable flags so a test
// can stall the "GPU" and watch the engine block. Every misuse the Vulkan
// validation layers would flag for this protocol is recorded as a violation
// instead of panicking, so tests can assert on the whole run at the end.

use ash::vk::{self, Handle};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use super::gpu::{AcquiredImage, FenceWait, FrameSubmit, GpuBackend};
use crate::error::{GpuError, Result};

/// Scripted outcome for one `acquire_next_image` call.
#[derive(Debug, Clone, Copy)]
pub enum AcquireStep {
    Image(u32),
    Suboptimal(u32),
    OutOfDate,
}

/// Scripted outcome for one `present` call.
#[derive(Debug, Clone, Copy)]
pub enum PresentStep {
    Ok,
    Suboptimal,
    OutOfDate,
    Fail(vk::Result),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeEvent {
    FenceWait(vk::Fence),
    FenceReset(vk::Fence),
    Acquired(u32),
    BeginCommands(vk::CommandBuffer),
    BeginRenderPass(vk::Framebuffer),
    Submit {
        command_buffer: vk::CommandBuffer,
        wait_stage: vk::PipelineStageFlags,
    },
    Present(u32),
    Recreate,
    WaitIdle,
}

/// Number of live objects of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveObjects {
    pub render_passes: usize,
    pub framebuffers: usize,
    pub command_pools: usize,
    pub semaphores: usize,
    pub fences: usize,
    pub image_views: usize,
}

struct FakeState {
    next_handle: u64,

    format: vk::Format,
    extent: vk::Extent2D,
    image_count: u32,
    views: Vec<vk::ImageView>,
    generation: u64,
    next_image: u32,

    render_passes: HashSet<u64>,
    /// framebuffer -> image view it binds
    framebuffers: HashMap<u64, vk::ImageView>,
    command_pools: HashMap<u64, Vec<vk::CommandBuffer>>,
    /// command buffer -> fence of its last submission
    submitted_with: HashMap<u64, vk::Fence>,
    /// semaphore -> signaled
    semaphores: HashMap<u64, bool>,
    /// fence -> signaled
    fences: HashMap<u64, bool>,

    /// Fences of submissions the GPU has not retired yet, oldest first
    pending: VecDeque<vk::Fence>,
    /// `Some(n)`: retire the oldest submissions so at most n stay pending.
    /// `None`: only retire when the test says so.
    retire_lag: Option<usize>,

    acquire_script: VecDeque<AcquireStep>,
    present_script: VecDeque<PresentStep>,
    fail_next_submit: Option<vk::Result>,
    fail_next_begin_commands: Option<vk::Result>,
    fences_before_failure: Option<usize>,

    blocked_waiters: usize,
    events: Vec<FakeEvent>,
    violations: Vec<String>,
}

impl FakeState {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn build_views(&mut self) {
        self.views = (0..self.image_count)
            .map(|_| vk::ImageView::from_raw(self.handle()))
            .collect();
    }

    fn fence_signaled(&self, fence: vk::Fence) -> bool {
        self.fences.get(&fence.as_raw()).copied().unwrap_or(false)
    }

    fn retire(&mut self, fence: vk::Fence) {
        if let Some(signaled) = self.fences.get_mut(&fence.as_raw()) {
            *signaled = true;
        }
    }

    fn retire_to_lag(&mut self) {
        if let Some(lag) = self.retire_lag {
            while self.pending.len() > lag {
                if let Some(fence) = self.pending.pop_front() {
                    self.retire(fence);
                }
            }
        }
    }

    fn retire_all(&mut self) {
        while let Some(fence) = self.pending.pop_front() {
            self.retire(fence);
        }
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }

    fn signal_semaphore(&mut self, semaphore: vk::Semaphore, by: &str) {
        match self.semaphores.get(&semaphore.as_raw()).copied() {
            Some(false) => {
                self.semaphores.insert(semaphore.as_raw(), true);
            }
            Some(true) => self.violation(format!("{by} signals {semaphore:?} which is already signaled")),
            None => self.violation(format!("{by} signals unknown semaphore {semaphore:?}")),
        }
    }

    fn consume_semaphore(&mut self, semaphore: vk::Semaphore, by: &str) {
        if self.semaphores.get(&semaphore.as_raw()).copied() == Some(true) {
            self.semaphores.insert(semaphore.as_raw(), false);
        } else {
            self.violation(format!("{by} waits on {semaphore:?} which nothing signaled"));
        }
    }
}

pub struct FakeGpu {
    state: Mutex<FakeState>,
    fence_signal: Condvar,
}

impl FakeGpu {
    /// A 1280x720 BGRA swapchain with `image_count` images whose GPU retires
    /// every submission immediately.
    pub fn new(image_count: u32) -> Self {
        let mut state = FakeState {
            next_handle: 0,
            format: vk::Format::B8G8R8A8_SRGB,
            extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            image_count,
            views: Vec::new(),
            generation: 0,
            next_image: 0,
            render_passes: HashSet::new(),
            framebuffers: HashMap::new(),
            command_pools: HashMap::new(),
            submitted_with: HashMap::new(),
            semaphores: HashMap::new(),
            fences: HashMap::new(),
            pending: VecDeque::new(),
            retire_lag: Some(0),
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            fail_next_submit: None,
            fail_next_begin_commands: None,
            fences_before_failure: None,
            blocked_waiters: 0,
            events: Vec::new(),
            violations: Vec::new(),
        };
        state.build_views();

        Self {
            state: Mutex::new(state),
            fence_signal: Condvar::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Knobs
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_retire_lag(&self, lag: Option<usize>) {
        let mut state = self.state.lock();
        state.retire_lag = lag;
        state.retire_to_lag();
        self.fence_signal.notify_all();
    }

    /// Image count used by the next `recreate`.
    pub fn set_image_count(&self, image_count: u32) {
        self.state.lock().image_count = image_count;
    }

    /// Surface format reported from now on.
    pub fn set_surface_format(&self, format: vk::Format) {
        self.state.lock().format = format;
    }

    pub fn push_acquire(&self, step: AcquireStep) {
        self.state.lock().acquire_script.push_back(step);
    }

    pub fn push_present(&self, step: PresentStep) {
        self.state.lock().present_script.push_back(step);
    }

    pub fn fail_next_submit(&self, result: vk::Result) {
        self.state.lock().fail_next_submit = Some(result);
    }

    pub fn fail_next_begin_commands(&self, result: vk::Result) {
        self.state.lock().fail_next_begin_commands = Some(result);
    }

    /// Let `count` more fences be created, then fail.
    pub fn fail_fence_creation_after(&self, count: usize) {
        self.state.lock().fences_before_failure = Some(count);
    }

    /// Retire the oldest pending submission, returning its fence.
    pub fn retire_oldest(&self) -> Option<vk::Fence> {
        let mut state = self.state.lock();
        let fence = state.pending.pop_front()?;
        state.retire(fence);
        self.fence_signal.notify_all();
        Some(fence)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observations
    // ─────────────────────────────────────────────────────────────────────

    pub fn live(&self) -> LiveObjects {
        let state = self.state.lock();
        LiveObjects {
            render_passes: state.render_passes.len(),
            framebuffers: state.framebuffers.len(),
            command_pools: state.command_pools.len(),
            semaphores: state.semaphores.len(),
            fences: state.fences.len(),
            image_views: state.views.len(),
        }
    }

    pub fn image_count(&self) -> usize {
        self.state.lock().views.len()
    }

    pub fn pending_submissions(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Threads currently parked in `wait_for_fence`.
    pub fn blocked_waiters(&self) -> usize {
        self.state.lock().blocked_waiters
    }

    pub fn events(&self) -> Vec<FakeEvent> {
        self.state.lock().events.clone()
    }

    pub fn count_events(&self, pred: impl Fn(&FakeEvent) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| pred(e)).count()
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    pub fn last_render_pass_framebuffer(&self) -> Option<vk::Framebuffer> {
        self.state.lock().events.iter().rev().find_map(|e| match e {
            FakeEvent::BeginRenderPass(fb) => Some(*fb),
            _ => None,
        })
    }

    /// True if `framebuffer` is alive and bound to a view of the current swapchain.
    pub fn framebuffer_is_current(&self, framebuffer: vk::Framebuffer) -> bool {
        let state = self.state.lock();
        state
            .framebuffers
            .get(&framebuffer.as_raw())
            .is_some_and(|view| state.views.contains(view))
    }
}

impl GpuBackend for FakeGpu {
    fn surface_format(&self) -> vk::Format {
        self.state.lock().format
    }

    fn swapchain_extent(&self) -> vk::Extent2D {
        self.state.lock().extent
    }

    fn swapchain_image_views(&self) -> Vec<vk::ImageView> {
        self.state.lock().views.clone()
    }

    fn swapchain_generation(&self) -> u64 {
        self.state.lock().generation
    }

    fn recreate(&self, extent: vk::Extent2D) -> Result<()> {
        if extent.width == 0 || extent.height == 0 {
            return Err(GpuError::InvalidState("cannot recreate swapchain with zero area"));
        }
        let mut state = self.state.lock();
        if !state.pending.is_empty() {
            let pending = state.pending.len();
            state.violation(format!("recreate with {pending} submissions still pending"));
        }
        state.extent = extent;
        state.build_views();
        state.next_image = 0;
        state.generation += 1;
        state.events.push(FakeEvent::Recreate);
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.retire_all();
        state.events.push(FakeEvent::WaitIdle);
        self.fence_signal.notify_all();
        Ok(())
    }

    fn create_render_pass(&self, _format: vk::Format) -> Result<vk::RenderPass> {
        let mut state = self.state.lock();
        let handle = state.handle();
        state.render_passes.insert(handle);
        Ok(vk::RenderPass::from_raw(handle))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        let mut state = self.state.lock();
        if !state.render_passes.remove(&render_pass.as_raw()) {
            state.violation(format!("destroying unknown render pass {render_pass:?}"));
        }
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer> {
        let mut state = self.state.lock();
        if !state.render_passes.contains(&render_pass.as_raw()) {
            state.violation(format!("framebuffer for unknown render pass {render_pass:?}"));
        }
        if !state.views.contains(&view) {
            state.violation(format!("framebuffer for stale image view {view:?}"));
        }
        let handle = state.handle();
        state.framebuffers.insert(handle, view);
        Ok(vk::Framebuffer::from_raw(handle))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let mut state = self.state.lock();
        if state.framebuffers.remove(&framebuffer.as_raw()).is_none() {
            state.violation(format!("destroying unknown framebuffer {framebuffer:?}"));
        }
    }

    fn create_command_pool(&self) -> Result<vk::CommandPool> {
        let mut state = self.state.lock();
        let handle = state.handle();
        state.command_pools.insert(handle, Vec::new());
        Ok(vk::CommandPool::from_raw(handle))
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let mut state = self.state.lock();
        let buffers: Vec<_> = (0..count)
            .map(|_| vk::CommandBuffer::from_raw(state.handle()))
            .collect();
        let Some(owned) = state.command_pools.get_mut(&pool.as_raw()) else {
            return Err(GpuError::Vulkan(vk::Result::ERROR_UNKNOWN));
        };
        owned.extend_from_slice(&buffers);
        Ok(buffers)
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut state = self.state.lock();
        match state.command_pools.remove(&pool.as_raw()) {
            Some(buffers) => {
                for cmd in buffers {
                    if let Some(fence) = state.submitted_with.remove(&cmd.as_raw()) {
                        if !state.fence_signaled(fence) && state.pending.contains(&fence) {
                            state.violation(format!("freeing {cmd:?} while it is pending"));
                        }
                    }
                }
            }
            None => state.violation(format!("destroying unknown command pool {pool:?}")),
        }
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let mut state = self.state.lock();
        let handle = state.handle();
        state.semaphores.insert(handle, false);
        Ok(vk::Semaphore::from_raw(handle))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        let mut state = self.state.lock();
        if state.semaphores.remove(&semaphore.as_raw()).is_none() {
            state.violation(format!("destroying unknown semaphore {semaphore:?}"));
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let mut state = self.state.lock();
        if let Some(remaining) = state.fences_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
            }
            *remaining -= 1;
        }
        let handle = state.handle();
        state.fences.insert(handle, signaled);
        Ok(vk::Fence::from_raw(handle))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut state = self.state.lock();
        if state.pending.contains(&fence) {
            state.violation(format!("destroying {fence:?} while its submission is pending"));
        }
        if state.fences.remove(&fence.as_raw()).is_none() {
            state.violation(format!("destroying unknown fence {fence:?}"));
        }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<FenceWait> {
        let mut state = self.state.lock();
        state.events.push(FakeEvent::FenceWait(fence));
        if !state.fences.contains_key(&fence.as_raw()) {
            state.violation(format!("waiting on unknown fence {fence:?}"));
            return Err(GpuError::Vulkan(vk::Result::ERROR_UNKNOWN));
        }

        let deadline = (timeout_ns != u64::MAX)
            .then(|| Instant::now() + Duration::from_nanos(timeout_ns));
        state.blocked_waiters += 1;
        let outcome = loop {
            if state.fence_signaled(fence) {
                break FenceWait::Signaled;
            }
            match deadline {
                None => self.fence_signal.wait(&mut state),
                Some(deadline) => {
                    if self.fence_signal.wait_until(&mut state, deadline).timed_out()
                        && !state.fence_signaled(fence)
                    {
                        break FenceWait::TimedOut;
                    }
                }
            }
        };
        state.blocked_waiters -= 1;
        Ok(outcome)
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(FakeEvent::FenceReset(fence));
        if state.pending.contains(&fence) {
            state.violation(format!("resetting {fence:?} while its submission is pending"));
        }
        if state.fences.contains_key(&fence.as_raw()) {
            state.fences.insert(fence.as_raw(), false);
        } else {
            state.violation(format!("resetting unknown fence {fence:?}"));
        }
        Ok(())
    }

    fn acquire_next_image(&self, signal: vk::Semaphore, _timeout_ns: u64) -> Result<AcquiredImage> {
        let mut state = self.state.lock();
        let fallback = AcquireStep::Image(state.next_image);
        let step = state.acquire_script.pop_front().unwrap_or(fallback);
        let (index, suboptimal) = match step {
            AcquireStep::Image(index) => (index, false),
            AcquireStep::Suboptimal(index) => (index, true),
            AcquireStep::OutOfDate => return Err(GpuError::SwapchainOutOfDate),
        };

        state.signal_semaphore(signal, "acquire");

        let image_count = state.views.len().max(1) as u32;
        state.next_image = (index + 1) % image_count;
        state.events.push(FakeEvent::Acquired(index));
        Ok(AcquiredImage { index, suboptimal })
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(FakeEvent::BeginCommands(command_buffer));
        if let Some(result) = state.fail_next_begin_commands.take() {
            return Err(GpuError::Vulkan(result));
        }
        let last_fence = state.submitted_with.get(&command_buffer.as_raw()).copied();
        if let Some(fence) = last_fence {
            if state.pending.contains(&fence) {
                state.violation(format!(
                    "re-recording {command_buffer:?} while its submission is pending"
                ));
            }
        }
        Ok(())
    }

    fn end_commands(&self, _command_buffer: vk::CommandBuffer) -> Result<()> {
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        _command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        _extent: vk::Extent2D,
        _clear_color: [f32; 4],
    ) {
        let mut state = self.state.lock();
        state.events.push(FakeEvent::BeginRenderPass(framebuffer));
        if !state.render_passes.contains(&render_pass.as_raw()) {
            state.violation(format!("beginning unknown render pass {render_pass:?}"));
        }
        let current = state
            .framebuffers
            .get(&framebuffer.as_raw())
            .is_some_and(|view| state.views.contains(view));
        if !current {
            state.violation(format!("rendering into stale framebuffer {framebuffer:?}"));
        }
    }

    fn cmd_end_render_pass(&self, _command_buffer: vk::CommandBuffer) {}

    fn submit(&self, submit: &FrameSubmit) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(result) = state.fail_next_submit.take() {
            return Err(GpuError::Submit(result));
        }
        state.events.push(FakeEvent::Submit {
            command_buffer: submit.command_buffer,
            wait_stage: submit.wait_stage,
        });

        state.consume_semaphore(submit.wait_semaphore, "submission");
        state.signal_semaphore(submit.signal_semaphore, "submission");
        if state.fence_signaled(submit.fence) {
            state.violation(format!("submitting with signaled fence {:?}", submit.fence));
        }

        state
            .submitted_with
            .insert(submit.command_buffer.as_raw(), submit.fence);
        state.pending.push_back(submit.fence);
        state.retire_to_lag();
        self.fence_signal.notify_all();
        Ok(())
    }

    fn present(&self, image_index: u32, wait: vk::Semaphore) -> Result<bool> {
        let mut state = self.state.lock();
        state.events.push(FakeEvent::Present(image_index));

        state.consume_semaphore(wait, "present");

        match state.present_script.pop_front().unwrap_or(PresentStep::Ok) {
            PresentStep::Ok => Ok(false),
            PresentStep::Suboptimal => Ok(true),
            PresentStep::OutOfDate => Err(GpuError::SwapchainOutOfDate),
            PresentStep::Fail(result) => Err(GpuError::Present(result)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerecording_a_pending_buffer_is_a_violation() {
        let gpu = FakeGpu::new(2);
        gpu.set_retire_lag(None);

        let pool = gpu.create_command_pool().unwrap();
        let cmd = gpu.allocate_command_buffers(pool, 1).unwrap()[0];
        let image_available = gpu.create_semaphore().unwrap();
        let render_finished = gpu.create_semaphore().unwrap();
        let fence = gpu.create_fence(false).unwrap();

        gpu.acquire_next_image(image_available, u64::MAX).unwrap();
        gpu.begin_commands(cmd).unwrap();
        gpu.submit(&FrameSubmit {
            command_buffer: cmd,
            wait_semaphore: image_available,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: render_finished,
            fence,
        })
        .unwrap();
        assert!(gpu.violations().is_empty());

        // Still pending: the GPU has not retired anything
        gpu.begin_commands(cmd).unwrap();
        let violations = gpu.violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("while its submission is pending"));

        // Once retired, a reset fence alone is not a violation
        assert_eq!(gpu.retire_oldest(), Some(fence));
        gpu.reset_fence(fence).unwrap();
        gpu.begin_commands(cmd).unwrap();
        assert_eq!(gpu.violations().len(), 1);
    }
}
