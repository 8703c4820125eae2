// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Missing files and missing keys fall back to defaults; values the renderer
// cannot run with are rejected by `validate`.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::backend::frame::{DEFAULT_CLEAR_COLOR, DEFAULT_FRAMES_IN_FLIGHT, MIN_FRAMES_IN_FLIGHT};
use crate::backend::{DeviceOptions, FrameSettings};

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Scene Editor".to_string(),
            width: 1600,
            height: 900,
        }
    }
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub present_mode: String,
    pub clear_color: [f32; 4],
    pub frames_in_flight: usize,
    /// Give up on a frame fence after this long. Unset waits forever.
    pub fence_timeout_ms: Option<u64>,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            present_mode: "mailbox".to_string(),
            clear_color: DEFAULT_CLEAR_COLOR,
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            fence_timeout_ms: None,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_to_file: bool,
    pub log_file: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_to_file: false,
            log_file: "scene_editor.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject settings the frame loop cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.graphics.frames_in_flight < MIN_FRAMES_IN_FLIGHT {
            anyhow::bail!(
                "graphics.frames_in_flight must be at least {}, got {}",
                MIN_FRAMES_IN_FLIGHT,
                self.graphics.frames_in_flight
            );
        }
        if self.window.width == 0 || self.window.height == 0 {
            anyhow::bail!(
                "window size must be non-zero, got {}x{}",
                self.window.width,
                self.window.height
            );
        }
        Ok(())
    }

    /// Get present mode as Vulkan enum
    ///
    /// This is only a preference; the swapchain falls back to FIFO when the
    /// surface does not offer it.
    pub fn get_present_mode(&self) -> vk::PresentModeKHR {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "immediate" => vk::PresentModeKHR::IMMEDIATE,
            "mailbox" => vk::PresentModeKHR::MAILBOX,
            "fifo" => vk::PresentModeKHR::FIFO,
            "fifo_relaxed" => vk::PresentModeKHR::FIFO_RELAXED,
            _ => {
                log::warn!(
                    "Unknown present mode '{}', defaulting to MAILBOX",
                    self.graphics.present_mode
                );
                vk::PresentModeKHR::MAILBOX
            }
        }
    }

    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            app_name: self.window.title.clone(),
            // Validation only ever runs in debug builds
            enable_validation: cfg!(debug_assertions) && self.debug.validation_layers,
            preferred_present_mode: self.get_present_mode(),
        }
    }

    pub fn frame_settings(&self) -> FrameSettings {
        FrameSettings {
            frames_in_flight: self.graphics.frames_in_flight,
            clear_color: self.graphics.clear_color,
            fence_timeout: self.graphics.fence_timeout_ms.map(Duration::from_millis),
        }
    }
}
