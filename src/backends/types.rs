// SPDX-License-Identifier: GPL-3.0-only
// Shared types for sensor backend abstraction

//! Shared types for sensor backends

use crate::layout::FitPolicy;
use serde::{Deserialize, Serialize};

/// Sensor class gated by its own permission session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorClass {
    /// Camera video
    Camera,
    /// Device motion and orientation
    Motion,
    /// Microphone input level
    Microphone,
    /// Speech-to-text
    Speech,
    /// Vibration actuator (best effort)
    Vibration,
}

impl SensorClass {
    /// All sensor classes, in hub iteration order
    pub const ALL: [SensorClass; 5] = [
        SensorClass::Camera,
        SensorClass::Motion,
        SensorClass::Microphone,
        SensorClass::Speech,
        SensorClass::Vibration,
    ];

    /// Whether the class produces video frames with a native resolution
    pub fn is_video(&self) -> bool {
        matches!(self, SensorClass::Camera)
    }
}

impl std::fmt::Display for SensorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorClass::Camera => write!(f, "camera"),
            SensorClass::Motion => write!(f, "motion"),
            SensorClass::Microphone => write!(f, "microphone"),
            SensorClass::Speech => write!(f, "speech"),
            SensorClass::Vibration => write!(f, "vibration"),
        }
    }
}

impl std::str::FromStr for SensorClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "camera" | "video" => Ok(SensorClass::Camera),
            "motion" | "orientation" => Ok(SensorClass::Motion),
            "microphone" | "mic" => Ok(SensorClass::Microphone),
            "speech" => Ok(SensorClass::Speech),
            "vibration" => Ok(SensorClass::Vibration),
            other => Err(format!("unknown sensor class '{}'", other)),
        }
    }
}

/// Pixel dimensions of a frame or surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, `None` for an empty resolution
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which physical camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// User-facing (selfie) camera
    #[default]
    Front,
    /// Environment-facing camera
    Back,
}

impl Facing {
    /// Whether previews from this camera are conventionally mirrored
    pub fn mirrors_by_default(&self) -> bool {
        matches!(self, Facing::Front)
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
        }
    }
}

/// Caller-owned camera settings, read every frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Front or back camera
    pub facing: Facing,
    /// Mirror mapped coordinates horizontally
    pub mirror: bool,
    /// How the video is laid out on the surface
    pub fit_policy: FitPolicy,
    /// Width used by [`FitPolicy::Fixed`]
    pub fixed_width: Option<f64>,
    /// Height used by [`FitPolicy::Fixed`]
    pub fixed_height: Option<f64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Front,
            mirror: true, // Front camera previews are mirrored
            fit_policy: FitPolicy::default(),
            fixed_width: None,
            fixed_height: None,
        }
    }
}

impl CameraConfig {
    /// Fixed display size when both dimensions are set
    pub fn fixed_size(&self) -> Option<(f64, f64)> {
        match (self.fixed_width, self.fixed_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

/// Opaque identifier of a live stream, handed to external detection models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// One sample produced by a sensor stream
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSample {
    /// A video frame; only the geometry matters here
    Video { width: u32, height: u32 },
    /// Device orientation in degrees plus acceleration in m/s²
    Motion {
        alpha: f64,
        beta: f64,
        gamma: f64,
        acceleration: [f64; 3],
    },
    /// Microphone level, 0.0 to 1.0
    Level(f32),
    /// Recognised speech
    Transcript { text: String, is_final: bool },
    /// Vibration actuator accepted a pattern
    Pulse,
}

impl SensorSample {
    /// Frame resolution for video samples
    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            SensorSample::Video { width, height } => Some(Resolution::new(*width, *height)),
            _ => None,
        }
    }
}
