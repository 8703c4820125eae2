// =============================================================================
// SCENE EDITOR - Viewport shell
// =============================================================================
//
// Opens the editor window and drives the frame engine once per redraw.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (ApplicationHandler)                          │
// │    └── App                                                      │
// │          ├── Arc<DeviceContext>  (instance, device, swapchain)  │
// │          └── FrameEngine         (slots, framebuffers, cursor)  │
// └─────────────────────────────────────────────────────────────────┘
//
// FRAME FLOW:
// 1. Recreate the swapchain if a resize or a stale chain was reported
// 2. begin_frame: wait for the slot, acquire an image, open the render pass
// 3. Record viewport commands into the returned command buffer
// 4. end_frame: submit and present
//
// A stale swapchain only schedules a recreate for the next redraw. Any other
// error stops the loop and main returns it.
//
// =============================================================================

use anyhow::{Context, Result};
use ash::vk;
use scene_editor::backend::{DeviceContext, FrameEngine, GpuBackend};
use scene_editor::config::Config;
use scene_editor::GpuError;
use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let config = Config::load();

    init_logging(&config)?;
    config.validate().context("Invalid configuration")?;

    log::info!("Starting scene editor");
    log::info!("Window: {}x{}", config.window.width, config.window.height);
    log::info!(
        "Present mode: {}, frames in flight: {}",
        config.graphics.present_mode,
        config.graphics.frames_in_flight
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    app.shutdown()
}

/// Initialize logging, optionally piping everything into the debug log file
fn init_logging(config: &Config) -> Result<()> {
    use env_logger::{Builder, Target};
    use log::LevelFilter;

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info);
    // RUST_LOG still wins over the default level
    builder.parse_default_env();

    if config.debug.log_to_file {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
            .with_context(|| format!("Failed to open log file: {}", config.debug.log_file))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Failed to initialize logging")?;
    Ok(())
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Editor shell state.
///
/// The engine holds its own reference to the context, so dropping the engine
/// first is what actually releases the device. `shutdown` does that in order.
struct App {
    config: Config,

    // ─────────────────────────────────────────────────────────────────────────
    // RENDERING
    // ─────────────────────────────────────────────────────────────────────────
    engine: Option<FrameEngine<DeviceContext>>,
    context: Option<Arc<DeviceContext>>,
    window: Option<Arc<Window>>,

    // ─────────────────────────────────────────────────────────────────────────
    // STATE FLAGS
    // ─────────────────────────────────────────────────────────────────────────
    /// Set on resize or a stale swapchain - recreate before the next frame
    needs_recreate: bool,
    /// Set when window is minimized (size = 0) - skip rendering
    is_minimized: bool,
    /// First unrecoverable error; ends the event loop
    fatal: Option<anyhow::Error>,

    frames_drawn: u64,
    started: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            engine: None,
            context: None,
            window: None,
            needs_recreate: false,
            is_minimized: false,
            fatal: None,
            frames_drawn: 0,
            started: Instant::now(),
        }
    }

    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    fn init_renderer(&mut self, window: &Arc<Window>) -> Result<()> {
        log::info!("Initializing Vulkan...");

        let size = window.inner_size();
        let extent = vk::Extent2D {
            width: size.width,
            height: size.height,
        };

        let context = DeviceContext::new(&**window, extent, &self.config.device_options())
            .context("Failed to create device context")?;
        let context = Arc::new(context);
        log::info!("Rendering on {}", context.adapter_name());

        let engine = FrameEngine::new(Arc::clone(&context), self.config.frame_settings())
            .context("Failed to create frame engine")?;

        self.context = Some(context);
        self.engine = Some(engine);

        log::info!("Vulkan initialized successfully!");
        Ok(())
    }

    // =========================================================================
    // FRAME LOOP
    // =========================================================================

    /// Draw one frame, recreating the swapchain first if it was flagged.
    fn draw_frame(&mut self) -> std::result::Result<(), GpuError> {
        if self.is_minimized {
            return Ok(());
        }
        let Some(window) = self.window.as_ref() else {
            return Ok(());
        };
        let size = window.inner_size();
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };

        if self.needs_recreate || engine.is_suboptimal() {
            if size.width == 0 || size.height == 0 {
                self.is_minimized = true;
                return Ok(());
            }
            log::info!("Recreating swapchain: {}x{}", size.width, size.height);
            engine.recreate_swapchain(vk::Extent2D {
                width: size.width,
                height: size.height,
            })?;
            self.needs_recreate = false;
        }

        let _target = engine.begin_frame()?;
        // The viewport is only cleared so far; scene passes record into
        // `_target.command_buffer` here.
        engine.end_frame()
    }

    /// Tear down the engine, then the context, then the window.
    fn shutdown(&mut self) -> Result<()> {
        log::info!("Cleaning up Vulkan resources...");

        let teardown = match self.engine.take() {
            Some(engine) => engine.shutdown(),
            None => Ok(()),
        };
        self.context = None;
        self.window = None;

        let elapsed = self.started.elapsed().as_secs_f64();
        if self.frames_drawn > 0 && elapsed > 0.0 {
            log::info!(
                "Drew {} frames ({:.1} FPS average)",
                self.frames_drawn,
                self.frames_drawn as f64 / elapsed
            );
        }
        log::info!("Cleanup complete");

        if let Some(err) = self.fatal.take() {
            return Err(err);
        }
        teardown.context("Failed to release frame resources")
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        event_loop.exit();
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("Failed to create window"));
                return;
            }
        };

        if let Err(e) = self.init_renderer(&window) {
            self.fail(event_loop, e);
            return;
        }

        self.window = Some(window);
    }

    /// Handle window events.
    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            // ─────────────────────────────────────────────────────────────────
            // CLOSE REQUEST
            // ─────────────────────────────────────────────────────────────────
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                if let Some(context) = &self.context {
                    if let Err(e) = context.wait_idle() {
                        log::warn!("wait_idle failed during close: {}", e);
                    }
                }
                event_loop.exit();
            }

            // ─────────────────────────────────────────────────────────────────
            // WINDOW RESIZED
            // ─────────────────────────────────────────────────────────────────
            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);

                if size.width == 0 || size.height == 0 {
                    self.is_minimized = true;
                } else {
                    self.is_minimized = false;
                    self.needs_recreate = true;
                }
            }

            // ─────────────────────────────────────────────────────────────────
            // REDRAW REQUESTED
            // ─────────────────────────────────────────────────────────────────
            WindowEvent::RedrawRequested => match self.draw_frame() {
                Ok(()) => self.frames_drawn += 1,
                Err(e) if e.is_recoverable() => {
                    log::debug!("{}, recreating before the next frame", e);
                    self.needs_recreate = true;
                }
                Err(e) => {
                    self.fail(event_loop, anyhow::Error::new(e).context("Frame failed"));
                }
            },

            // ─────────────────────────────────────────────────────────────────
            // KEYBOARD INPUT
            // ─────────────────────────────────────────────────────────────────
            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    /// Keep redrawing while the window is visible.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.is_minimized {
            return;
        }
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
