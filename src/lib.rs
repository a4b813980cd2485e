// SPDX-License-Identifier: MPL-2.0

//! Sketch Sensors - gesture-gated sensor access for handheld sketches
//!
//! Mobile platforms only hand out camera, motion, microphone and speech input
//! after a user gesture and an asynchronous permission grant. This library
//! arbitrates that workflow and then maps landmark coordinates from the camera
//! frame onto the sketch's output surface, whatever the camera resolution, fit
//! policy or mirroring.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`permission`]: Gesture-gated permission state machine
//! - [`sensor`]: Stream lifecycle (start, stop, replace)
//! - [`layout`]: Fit policies and layout resolution
//! - [`mapping`]: Source to surface coordinate mapping
//! - [`camera`]: Camera handle combining the above
//! - [`hub`]: One permission gate per sensor class
//! - [`backends`]: Platform traits and the simulated platform
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```
//! use sketch_sensors::layout::{resolve, FitPolicy, SurfaceSize};
//! use sketch_sensors::mapping::{map_point, Keypoint};
//! use sketch_sensors::Resolution;
//!
//! let layout = resolve(
//!     Resolution::new(640, 480),
//!     SurfaceSize::new(1280.0, 480.0),
//!     FitPolicy::FitHeight,
//!     None,
//! )
//! .unwrap();
//! let mapped = map_point(&Keypoint::new(320.0, 240.0), &layout, false);
//! assert_eq!((mapped.x, mapped.y), (640.0, 240.0));
//! ```

pub mod backends;
pub mod camera;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hub;
pub mod layout;
pub mod mapping;
pub mod permission;
pub mod sensor;
pub mod utils;

// Re-export commonly used types
pub use backends::{CameraConfig, Facing, Resolution, SensorClass};
pub use camera::CameraHandle;
pub use config::Config;
pub use errors::{AppError, SensorError, SensorResult};
pub use hub::SensorHub;
pub use layout::{FitPolicy, Layout, SurfaceSize};
pub use mapping::{Keypoint, MappedPoint};
pub use permission::{Gesture, PermissionGate, PermissionState};
