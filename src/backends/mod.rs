// SPDX-License-Identifier: MPL-2.0

//! Platform abstraction for gesture-gated sensors
//!
//! The crate never talks to a browser or an OS directly. Everything the platform
//! provides comes in through the traits below:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  SensorHub / CameraHandle    │
//! └──────────────┬───────────────┘
//!                │
//!     ┌──────────┴───────────┐
//!     ▼                      ▼
//! ┌───────────────┐   ┌──────────────┐
//! │AccessRequester│   │ StreamSource │ ← permission prompt, stream opening
//! └───────────────┘   └──────┬───────┘
//!                            ▼
//!                     ┌──────────────┐
//!                     │ SensorStream │ ← live samples
//!                     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`]: sensor classes, resolutions, camera config and samples
//! - [`simulated`]: deterministic in-memory platform for tests and the CLI

pub mod simulated;
pub mod types;

pub use types::*;

use crate::errors::SensorResult;
use futures::future::BoxFuture;

/// Platform permission / acquisition primitive for one sensor class
///
/// `request` must only be called from inside a gesture handler. The gate
/// enforces this; implementations can assume it.
pub trait AccessRequester: Send {
    /// The class this requester grants access to
    fn sensor_class(&self) -> SensorClass;

    /// Check if the platform has this capability at all
    ///
    /// Returning false makes the gate report `UnsupportedFeature` without
    /// ever calling [`AccessRequester::request`].
    fn is_supported(&self) -> bool;

    /// Issue the platform permission call
    ///
    /// # Returns
    /// * `Ok(())` - Access granted
    /// * `Err(SensorError)` - Denied, blocked or failed
    fn request(&mut self) -> BoxFuture<'static, SensorResult<()>>;
}

/// Opens live streams once access has been granted
pub trait StreamSource: Send + Sync {
    /// Open a stream for the given configuration
    ///
    /// The returned stream may not have produced any sample yet.
    fn open(
        &self,
        config: &CameraConfig,
    ) -> BoxFuture<'static, SensorResult<Box<dyn SensorStream>>>;
}

/// A live sensor stream
pub trait SensorStream: Send {
    /// Identifier passed to external detection models
    fn stream_id(&self) -> StreamId;

    /// Wait for the next sample
    ///
    /// Resolves to `None` once the stream has ended.
    fn next_sample(&mut self) -> BoxFuture<'_, Option<SensorSample>>;

    /// Latest sample if one is queued, without waiting
    fn try_sample(&mut self) -> Option<SensorSample>;

    /// Release the underlying device; safe to call more than once
    fn close(&mut self);
}
