// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::{CameraConfig, SensorClass};
use crate::constants::{self, config_file, surface};
use crate::errors::{AppError, AppResult};
use crate::layout::SurfaceSize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current on-disk format version
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format version, for future migrations
    pub version: u32,
    /// Initial camera settings
    pub camera: CameraConfig,
    /// Output surface width used until the sketch reports its own
    pub surface_width: f64,
    /// Output surface height used until the sketch reports its own
    pub surface_height: f64,
    /// Prompt text per sensor class (missing classes use built-in prompts)
    pub prompts: HashMap<SensorClass, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            camera: CameraConfig::default(), // Front camera, mirrored
            surface_width: surface::DEFAULT_WIDTH,
            surface_height: surface::DEFAULT_HEIGHT,
            prompts: HashMap::new(),
        }
    }
}

impl Config {
    /// `<config dir>/sketch-sensors/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(config_file::APP_DIR).join(config_file::FILE_NAME))
    }

    /// Read and validate a config file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` or the default location, falling back to defaults
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => {
                info!("No config directory available, using defaults");
                return Self::default();
            }
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.surface_width) || !positive(self.surface_height) {
            return Err(AppError::Config(format!(
                "surface size must be positive, got {}x{}",
                self.surface_width, self.surface_height
            )));
        }
        if let Some((w, h)) = self.camera.fixed_size()
            && !(positive(w) && positive(h))
        {
            return Err(AppError::Config(format!(
                "fixed size must be positive, got {}x{}",
                w, h
            )));
        }
        Ok(())
    }

    pub fn surface(&self) -> SurfaceSize {
        SurfaceSize::new(self.surface_width, self.surface_height)
    }

    /// Prompt for `class`, configured or built-in
    pub fn prompt(&self, class: SensorClass) -> &str {
        self.prompts
            .get(&class)
            .map(String::as_str)
            .unwrap_or_else(|| constants::default_prompt(class))
    }
}
