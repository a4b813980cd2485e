// SPDX-License-Identifier: MPL-2.0

//! Error types for sensor access and layout mapping
//!
//! None of these are meant to reach the frame loop as a fault. The gate and the
//! sensor handle record them as state, and mapping before readiness returns
//! `None` instead of an error.

use std::fmt;

/// Result type alias using SensorError
pub type SensorResult<T> = Result<T, SensorError>;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Sensor-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// User declined or the platform blocked the request (retryable by a new gesture)
    PermissionDenied(String),
    /// Platform lacks the capability entirely (not retryable)
    UnsupportedFeature(String),
    /// Stream could not start for a device reason, e.g. camera already in use
    AcquisitionFailure(String),
    /// Sensor used before access was granted, or before it reported a native resolution
    NotReady,
    /// A pending switch was superseded by a newer one
    Cancelled,
}

impl SensorError {
    /// Whether a fresh user gesture may retry the request
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SensorError::UnsupportedFeature(_))
    }

    /// Short diagnostic string shown on the overlay
    pub fn overlay_message(&self) -> String {
        match self {
            SensorError::PermissionDenied(_) => "Permission denied. Tap to try again.".to_string(),
            SensorError::UnsupportedFeature(_) => "Not supported on this device.".to_string(),
            SensorError::AcquisitionFailure(msg) => format!("Could not start: {}", msg),
            SensorError::NotReady => "Waiting for sensor...".to_string(),
            SensorError::Cancelled => "Cancelled".to_string(),
        }
    }
}

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Sensor-related errors
    Sensor(SensorError),
    /// Configuration errors
    Config(String),
    /// Malformed command-line input
    InvalidArgument(String),
    /// Generic error with message
    Other(String),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            SensorError::UnsupportedFeature(msg) => write!(f, "Unsupported feature: {}", msg),
            SensorError::AcquisitionFailure(msg) => write!(f, "Acquisition failed: {}", msg),
            SensorError::NotReady => write!(f, "Sensor access has not been granted yet"),
            SensorError::Cancelled => write!(f, "Superseded by a newer request"),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Sensor(e) => write!(f, "Sensor error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SensorError {}
impl std::error::Error for AppError {}

impl From<SensorError> for AppError {
    fn from(err: SensorError) -> Self {
        AppError::Sensor(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
