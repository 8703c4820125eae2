// Device Context - Core GPU interface
//
// Responsibilities:
// - Instance creation with validation layers
// - Surface creation for the editor window
// - Physical device selection (graphics + present queues, swapchain support)
// - Logical device + queue creation
// - Owning and rebuilding the swapchain

use ash::{vk, Entry};
use parking_lot::RwLock;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{c_char, CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};

use super::gpu::{AcquiredImage, FenceWait, FrameSubmit, GpuBackend};
use super::render_pass;
use super::swapchain::{SharingFamilies, SurfaceSupport, Swapchain};
use crate::error::{GpuError, Result};

/// Device extensions every adapter must expose.
const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Knobs for bringing up the device context.
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    pub app_name: String,
    pub enable_validation: bool,
    pub preferred_present_mode: vk::PresentModeKHR,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            app_name: "Scene Editor".to_string(),
            enable_validation: cfg!(debug_assertions),
            preferred_present_mode: vk::PresentModeKHR::MAILBOX,
        }
    }
}

/// Capabilities of a single queue family, as far as adapter selection cares.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueFamilySupport {
    pub graphics: bool,
    pub present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Find a graphics family and a present family.
    ///
    /// A family that can do both is preferred so the two queues coincide.
    pub fn select(families: &[QueueFamilySupport]) -> Option<Self> {
        if let Some(both) = families.iter().position(|f| f.graphics && f.present) {
            return Some(Self {
                graphics: both as u32,
                present: both as u32,
            });
        }
        let graphics = families.iter().position(|f| f.graphics)?;
        let present = families.iter().position(|f| f.present)?;
        Some(Self {
            graphics: graphics as u32,
            present: present as u32,
        })
    }

    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// What we learned about one adapter while probing it.
#[derive(Debug, Clone)]
pub struct AdapterCandidate {
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<QueueFamilySupport>,
    pub has_required_extensions: bool,
    pub surface_usable: bool,
}

impl AdapterCandidate {
    /// Score the adapter, or `None` if it cannot drive the surface at all.
    pub fn score(&self) -> Option<u32> {
        if !self.has_required_extensions || !self.surface_usable {
            return None;
        }
        QueueFamilies::select(&self.queue_families)?;
        Some(match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
            _ => 1,
        })
    }
}

/// Undo steps for a half-built context, run newest first on drop unless
/// the build completed.
#[derive(Default)]
struct Rollback {
    undo: Vec<Box<dyn FnOnce()>>,
}

impl Rollback {
    fn push(&mut self, step: impl FnOnce() + 'static) {
        self.undo.push(Box::new(step));
    }

    fn complete(mut self) {
        self.undo.clear();
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        while let Some(step) = self.undo.pop() {
            step();
        }
    }
}

/// Owns the instance, device, queues and the presentable image chain.
///
/// The swapchain lives behind a lock so it can be rebuilt through a shared
/// handle; everything else is fixed for the lifetime of the context.
pub struct DeviceContext {
    _entry: Entry,
    instance: ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,

    queue_families: QueueFamilies,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,

    preferred_present_mode: vk::PresentModeKHR,
    swapchain: RwLock<Swapchain>,
    generation: AtomicU64,

    pub properties: vk::PhysicalDeviceProperties,
}

impl DeviceContext {
    /// Bring up the device and build the first swapchain for `window`.
    ///
    /// `extent` is the window's inner size in pixels; it is only used when
    /// the surface lets the application choose.
    pub fn new<W>(window: &W, extent: vk::Extent2D, options: &DeviceOptions) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        log::info!("Creating device context: {}", options.app_name);

        let display_handle = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no display handle: {e}")))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no window handle: {e}")))?
            .as_raw();

        // Step 1: Load Vulkan library
        let entry = unsafe { Entry::load() }?;
        // Declared after `entry` so it runs while the library is still loaded
        let mut rollback = Rollback::default();

        // Step 2: Create instance
        let surface_extensions = ash_window::enumerate_required_extensions(display_handle)
            .map_err(GpuError::init("enumerate_required_extensions"))?;
        let instance = Self::create_instance(
            &entry,
            &options.app_name,
            surface_extensions,
            options.enable_validation,
        )?;
        {
            let instance = instance.clone();
            rollback.push(move || unsafe { instance.destroy_instance(None) });
        }

        // Step 3: Setup debug messenger if validation enabled
        let debug_utils = if options.enable_validation {
            let (loader, messenger) = Self::setup_debug_messenger(&entry, &instance)?;
            let undo = loader.clone();
            rollback.push(move || unsafe { undo.destroy_debug_utils_messenger(messenger, None) });
            Some((loader, messenger))
        } else {
            None
        };

        // Step 4: Create surface
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let surface = unsafe {
            ash_window::create_surface(&entry, &instance, display_handle, window_handle, None)
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;
        {
            let surface_loader = surface_loader.clone();
            rollback.push(move || unsafe { surface_loader.destroy_surface(surface, None) });
        }

        // Step 5: Pick physical device (GPU)
        let (physical_device, queue_families) =
            Self::pick_physical_device(&instance, &surface_loader, surface)?;

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        log::info!(
            "Selected GPU: {}",
            properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        );
        log::info!(
            "API Version: {}.{}.{}",
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version),
            vk::api_version_patch(properties.api_version)
        );
        log::info!(
            "Queue families: graphics={}, present={}",
            queue_families.graphics,
            queue_families.present
        );

        // Step 6: Create logical device
        let (device, graphics_queue, present_queue) =
            Self::create_logical_device(&instance, physical_device, queue_families)?;
        {
            let device = device.clone();
            rollback.push(move || unsafe { device.destroy_device(None) });
        }

        // Step 7: Build the swapchain
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        let support = SurfaceSupport::query(&surface_loader, physical_device, surface)?;
        let swapchain = Swapchain::new(
            &device,
            &swapchain_loader,
            surface,
            &support,
            options.preferred_present_mode,
            extent,
            SharingFamilies {
                graphics: queue_families.graphics,
                present: queue_families.present,
            },
            vk::SwapchainKHR::null(),
        )?;

        // From here on Drop owns the cleanup
        rollback.complete();

        Ok(Self {
            _entry: entry,
            instance,
            debug_utils,
            surface_loader,
            surface,
            physical_device,
            device,
            swapchain_loader,
            queue_families,
            graphics_queue,
            present_queue,
            preferred_present_mode: options.preferred_present_mode,
            swapchain: RwLock::new(swapchain),
            generation: AtomicU64::new(0),
            properties,
        })
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        surface_extensions: &[*const c_char],
        enable_validation: bool,
    ) -> Result<ash::Instance> {
        let app_name_cstr = CString::new(app_name).unwrap_or_else(|_| c"Scene Editor".to_owned());
        let engine_name = c"Scene Editor Frame Engine";

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);

        let mut extensions = surface_extensions.to_vec();
        if enable_validation {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layer_names = if enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        unsafe { entry.create_instance(&create_info, None) }.map_err(GpuError::init("create_instance"))
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(GpuError::init("create_debug_utils_messenger"))?;

        Ok((debug_utils, messenger))
    }

    fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(GpuError::init("enumerate_physical_devices"))?;

        if devices.is_empty() {
            return Err(GpuError::NoSuitableDevice(
                "no Vulkan-capable GPU found".to_string(),
            ));
        }

        let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilies)> = None;
        for device in devices {
            let candidate = match Self::probe_adapter(instance, surface_loader, surface, device) {
                Ok(candidate) => candidate,
                Err(e) => {
                    log::warn!("Skipping adapter {:?}: {}", device, e);
                    continue;
                }
            };
            let Some(score) = candidate.score() else {
                log::debug!("Adapter {:?} rejected: {:?}", device, candidate);
                continue;
            };
            // score() only succeeds when families exist
            let Some(families) = QueueFamilies::select(&candidate.queue_families) else {
                continue;
            };
            if best.as_ref().map_or(true, |(best_score, ..)| score > *best_score) {
                best = Some((score, device, families));
            }
        }

        best.map(|(_, device, families)| (device, families))
            .ok_or_else(|| {
                GpuError::NoSuitableDevice(
                    "no GPU can render and present to this window".to_string(),
                )
            })
    }

    fn probe_adapter(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        device: vk::PhysicalDevice,
    ) -> Result<AdapterCandidate> {
        let props = unsafe { instance.get_physical_device_properties(device) };
        let family_props =
            unsafe { instance.get_physical_device_queue_family_properties(device) };

        let mut queue_families = Vec::with_capacity(family_props.len());
        for (index, family) in family_props.iter().enumerate() {
            let present = unsafe {
                surface_loader.get_physical_device_surface_support(device, index as u32, surface)
            }?;
            queue_families.push(QueueFamilySupport {
                graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                present,
            });
        }

        let available = unsafe { instance.enumerate_device_extension_properties(device) }?;
        let has_required_extensions = REQUIRED_DEVICE_EXTENSIONS.iter().all(|required| {
            available
                .iter()
                .any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == *required))
        });

        // Only query the surface once we know the swapchain extension exists
        let surface_usable = has_required_extensions
            && SurfaceSupport::query(surface_loader, device, surface)?.is_usable();

        Ok(AdapterCandidate {
            device_type: props.device_type,
            queue_families,
            has_required_extensions,
            surface_usable,
        })
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        families: QueueFamilies,
    ) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
        let queue_priorities = [1.0];
        let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
            .queue_family_index(families.graphics)
            .queue_priorities(&queue_priorities)];
        if !families.is_shared() {
            queue_create_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(families.present)
                    .queue_priorities(&queue_priorities),
            );
        }

        let extensions: Vec<*const c_char> =
            REQUIRED_DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }
            .map_err(GpuError::init("create_device"))?;

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };

        Ok((device, graphics_queue, present_queue))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn surface_format_khr(&self) -> vk::SurfaceFormatKHR {
        self.swapchain.read().format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.swapchain.read().present_mode
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.read().image_count()
    }

    pub fn adapter_name(&self) -> String {
        self.properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl GpuBackend for DeviceContext {
    fn surface_format(&self) -> vk::Format {
        self.swapchain.read().format.format
    }

    fn swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain.read().extent
    }

    fn swapchain_image_views(&self) -> Vec<vk::ImageView> {
        self.swapchain.read().image_views.clone()
    }

    fn swapchain_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn recreate(&self, extent: vk::Extent2D) -> Result<()> {
        if extent.width == 0 || extent.height == 0 {
            return Err(GpuError::InvalidState("cannot recreate swapchain with zero area"));
        }

        let support = SurfaceSupport::query(&self.surface_loader, self.physical_device, self.surface)?;
        if !support.is_usable() {
            return Err(GpuError::NoSuitableDevice(
                "surface reports no formats or present modes".to_string(),
            ));
        }

        let mut swapchain = self.swapchain.write();
        let replacement = Swapchain::new(
            &self.device,
            &self.swapchain_loader,
            self.surface,
            &support,
            self.preferred_present_mode,
            extent,
            SharingFamilies {
                graphics: self.queue_families.graphics,
                present: self.queue_families.present,
            },
            swapchain.swapchain,
        )?;

        let old = std::mem::replace(&mut *swapchain, replacement);
        old.destroy(&self.device, &self.swapchain_loader);

        self.generation.fetch_add(1, Ordering::AcqRel);
        log::info!(
            "Swapchain recreated: {}x{}",
            swapchain.extent.width,
            swapchain.extent.height
        );
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }?;
        Ok(())
    }

    fn create_render_pass(&self, format: vk::Format) -> Result<vk::RenderPass> {
        render_pass::create_render_pass(&self.device, format)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) };
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer> {
        render_pass::create_framebuffer(&self.device, render_pass, view, extent)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) };
    }

    fn create_command_pool(&self) -> Result<vk::CommandPool> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.queue_families.graphics)
            // RESET: each slot re-records its own buffer every frame
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        Ok(unsafe { self.device.create_command_pool(&pool_info, None) }?)
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        Ok(unsafe { self.device.allocate_command_buffers(&alloc_info) }?)
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        Ok(unsafe { self.device.create_semaphore(&semaphore_info, None) }?)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence_info = vk::FenceCreateInfo::default().flags(flags);
        Ok(unsafe { self.device.create_fence(&fence_info, None) }?)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) };
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<FenceWait> {
        match unsafe { self.device.wait_for_fences(&[fence], true, timeout_ns) } {
            Ok(()) => Ok(FenceWait::Signaled),
            Err(vk::Result::TIMEOUT) => Ok(FenceWait::TimedOut),
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                Err(GpuError::DeviceLost("device lost while waiting for a frame fence".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe { self.device.reset_fences(&[fence]) }?;
        Ok(())
    }

    fn acquire_next_image(&self, signal: vk::Semaphore, timeout_ns: u64) -> Result<AcquiredImage> {
        let (index, suboptimal) =
            self.swapchain
                .read()
                .acquire_next_image(&self.swapchain_loader, timeout_ns, signal)?;
        Ok(AcquiredImage { index, suboptimal })
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            self.device.begin_command_buffer(command_buffer, &begin_info)?;
        }
        Ok(())
    }

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe { self.device.end_command_buffer(command_buffer) }?;
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        }];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    fn cmd_end_render_pass(&self, command_buffer: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(command_buffer) };
    }

    fn submit(&self, submit: &FrameSubmit) -> Result<()> {
        let wait_semaphores = [submit.wait_semaphore];
        let wait_stages = [submit.wait_stage];
        let command_buffers = [submit.command_buffer];
        let signal_semaphores = [submit.signal_semaphore];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], submit.fence)
        }
        .map_err(GpuError::Submit)
    }

    fn present(&self, image_index: u32, wait: vk::Semaphore) -> Result<bool> {
        self.swapchain.read().present(
            &self.swapchain_loader,
            self.present_queue,
            image_index,
            &[wait],
        )
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        log::info!("Destroying device context...");

        // Wait for device to finish
        let _ = self.wait_idle();

        // Cleanup in reverse order
        unsafe {
            self.swapchain
                .get_mut()
                .destroy(&self.device, &self.swapchain_loader);
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
