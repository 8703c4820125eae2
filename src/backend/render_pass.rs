// Render pass template and framebuffer set
//
// One color attachment (the swapchain image), cleared on load and left in
// PRESENT_SRC layout, and one framebuffer per swapchain image.

use ash::vk;
use super::gpu::GpuBackend;
use crate::error::Result;

/// Create the render pass used for every frame
pub fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
    // Color attachment (the swapchain image)
    let color_attachment = vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

    let color_attachment_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let color_attachment_refs = [color_attachment_ref];
    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_attachment_refs);

    // The layout transition must not start before the acquire semaphore
    // wait, which happens at COLOR_ATTACHMENT_OUTPUT
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

    let attachments = [color_attachment];
    let subpasses = [subpass];
    let dependencies = [dependency];
    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    let render_pass = unsafe { device.create_render_pass(&create_info, None) }?;
    Ok(render_pass)
}

/// Bind one swapchain image view to the render pass
pub fn create_framebuffer(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    view: vk::ImageView,
    extent: vk::Extent2D,
) -> Result<vk::Framebuffer> {
    let attachments = [view];
    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    let framebuffer = unsafe { device.create_framebuffer(&create_info, None) }?;
    Ok(framebuffer)
}

/// One framebuffer per swapchain image, index-aligned with the image views.
pub struct FramebufferSet {
    framebuffers: Vec<vk::Framebuffer>,
    extent: vk::Extent2D,
    /// Swapchain generation the set was built against.
    generation: u64,
}

impl FramebufferSet {
    pub fn new<B: GpuBackend>(gpu: &B, render_pass: vk::RenderPass) -> Result<Self> {
        let views = gpu.swapchain_image_views();
        let extent = gpu.swapchain_extent();
        let generation = gpu.swapchain_generation();

        let mut framebuffers = Vec::with_capacity(views.len());
        for view in views {
            match gpu.create_framebuffer(render_pass, view, extent) {
                Ok(framebuffer) => framebuffers.push(framebuffer),
                Err(e) => {
                    for framebuffer in framebuffers {
                        gpu.destroy_framebuffer(framebuffer);
                    }
                    return Err(e);
                }
            }
        }

        log::debug!(
            "Created {} framebuffers ({}x{}, generation {})",
            framebuffers.len(),
            extent.width,
            extent.height,
            generation
        );

        Ok(Self {
            framebuffers,
            extent,
            generation,
        })
    }

    /// Placeholder until the first real set is built.
    pub fn empty() -> Self {
        Self {
            framebuffers: Vec::new(),
            extent: vk::Extent2D::default(),
            generation: 0,
        }
    }

    pub fn get(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// None of the framebuffers may still be referenced by pending work.
    pub fn destroy<B: GpuBackend>(&mut self, gpu: &B) {
        for framebuffer in self.framebuffers.drain(..) {
            gpu.destroy_framebuffer(framebuffer);
        }
    }
}
