// SPDX-License-Identifier: GPL-3.0-only

//! Sensor stream lifecycle
//!
//! A [`SensorHandle`] owns at most one live stream. Starting resolves only once
//! the stream produced its first sample, so the native resolution is known
//! before anything maps coordinates against it.
//!
//! Replacing a stream follows "last request wins": every
//! [`SensorHandle::begin_switch`] raises the cancel flag of the switch before it
//! and installs a fresh one. A superseded switch that still completes has its
//! new stream closed and its result discarded.

use crate::backends::{
    CameraConfig, Resolution, SensorClass, SensorSample, SensorStream, StreamId, StreamSource,
};
use crate::errors::{SensorError, SensorResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// A stream that has produced its first sample
struct StartedStream {
    stream: Box<dyn SensorStream>,
    first_sample: SensorSample,
}

impl std::fmt::Debug for StartedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartedStream")
            .field("stream", &self.stream.stream_id())
            .field("first_sample", &self.first_sample)
            .finish()
    }
}

/// Open a stream and wait for its first sample
async fn open_and_prime(
    source: Arc<dyn StreamSource>,
    config: CameraConfig,
) -> SensorResult<StartedStream> {
    let mut stream = source.open(&config).await?;
    match stream.next_sample().await {
        Some(first_sample) => Ok(StartedStream {
            stream,
            first_sample,
        }),
        None => {
            stream.close();
            Err(SensorError::AcquisitionFailure(
                "stream ended before producing a sample".to_string(),
            ))
        }
    }
}

/// Outcome of a switch future, handed back to [`SensorHandle::finish_switch`]
pub struct SwitchOutcome {
    config: CameraConfig,
    cancel_flag: Arc<AtomicBool>,
    result: SensorResult<StartedStream>,
}

impl std::fmt::Debug for SwitchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchOutcome")
            .field("config", &self.config)
            .field("cancelled", &self.cancel_flag.load(Ordering::Acquire))
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// An in-flight replacement stream
pub struct SwitchRequest {
    config: CameraConfig,
    cancel_flag: Arc<AtomicBool>,
    future: BoxFuture<'static, SensorResult<StartedStream>>,
}

impl SwitchRequest {
    /// Configuration this switch is opening
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Whether a newer switch has superseded this one
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Acquire)
    }

    /// Wait for the new stream to start (or fail)
    pub async fn wait(self) -> SwitchOutcome {
        let result = self.future.await;
        SwitchOutcome {
            config: self.config,
            cancel_flag: self.cancel_flag,
            result,
        }
    }
}

/// Lifecycle wrapper around one acquired sensor stream
pub struct SensorHandle {
    class: SensorClass,
    source: Arc<dyn StreamSource>,
    config: CameraConfig,
    stream: Option<Box<dyn SensorStream>>,
    native_resolution: Option<Resolution>,
    latest_sample: Option<SensorSample>,
    running: bool,
    /// Cancel flag of the most recent switch
    switch_cancel_flag: Arc<AtomicBool>,
}

impl SensorHandle {
    pub fn new(class: SensorClass, source: Arc<dyn StreamSource>) -> Self {
        Self {
            class,
            source,
            config: CameraConfig::default(),
            stream: None,
            native_resolution: None,
            latest_sample: None,
            running: false,
            switch_cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sensor_class(&self) -> SensorClass {
        self.class
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resolution of the running video stream
    pub fn native_resolution(&self) -> Option<Resolution> {
        self.native_resolution
    }

    /// Configuration of the running stream
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn latest_sample(&self) -> Option<&SensorSample> {
        self.latest_sample.as_ref()
    }

    /// The live stream, for handing to external detection models
    pub fn stream(&self) -> Option<&dyn SensorStream> {
        self.stream.as_deref()
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream.as_ref().map(|s| s.stream_id())
    }

    /// Start streaming with `config`
    ///
    /// Resolves after the first sample. Any running stream is replaced.
    pub async fn start(&mut self, config: CameraConfig) -> SensorResult<()> {
        self.switch_to(config).await
    }

    /// Replace the running stream, keeping the old one until the new one works
    pub async fn switch_to(&mut self, config: CameraConfig) -> SensorResult<()> {
        let request = self.begin_switch(config);
        let outcome = request.wait().await;
        self.finish_switch(outcome)
    }

    /// Issue a switch without awaiting it
    ///
    /// Cancels any switch issued earlier. The returned future does not borrow
    /// the handle, so the frame loop keeps running while it is pending.
    pub fn begin_switch(&mut self, config: CameraConfig) -> SwitchRequest {
        debug!(class = %self.class, facing = %config.facing, "Setting cancellation flag for stream switch");
        self.switch_cancel_flag.store(true, Ordering::Release);
        self.switch_cancel_flag = Arc::new(AtomicBool::new(false));

        let cancel_flag = Arc::clone(&self.switch_cancel_flag);
        let flag = Arc::clone(&cancel_flag);
        let source = Arc::clone(&self.source);
        let class = self.class;

        let future = async move {
            let started = open_and_prime(source, config).await;
            if flag.load(Ordering::Acquire) {
                if let Ok(mut started) = started {
                    debug!(%class, "Closing stream from superseded switch");
                    started.stream.close();
                }
                return Err(SensorError::Cancelled);
            }
            started
        }
        .boxed();

        SwitchRequest {
            config,
            cancel_flag,
            future,
        }
    }

    /// Apply a finished switch
    ///
    /// # Returns
    /// * `Ok(())` - New stream installed, previous one closed
    /// * `Err(SensorError::Cancelled)` - Superseded; nothing changed
    /// * `Err(e)` - Start failed; the previous stream keeps running
    pub fn finish_switch(&mut self, outcome: SwitchOutcome) -> SensorResult<()> {
        let SwitchOutcome {
            config,
            cancel_flag,
            result,
        } = outcome;

        if cancel_flag.load(Ordering::Acquire) {
            if let Ok(mut started) = result {
                started.stream.close();
            }
            debug!(class = %self.class, facing = %config.facing, "Discarding superseded switch result");
            return Err(SensorError::Cancelled);
        }

        match result {
            Ok(started) => {
                let StartedStream {
                    stream,
                    first_sample,
                } = started;
                if let Some(mut old) = self.stream.replace(stream) {
                    old.close();
                }
                self.native_resolution = first_sample.resolution();
                self.latest_sample = Some(first_sample);
                self.config = config;
                self.running = true;
                info!(
                    class = %self.class,
                    facing = %config.facing,
                    resolution = ?self.native_resolution,
                    "Sensor stream ready"
                );
                Ok(())
            }
            Err(SensorError::Cancelled) => Err(SensorError::Cancelled),
            Err(e) => {
                error!(class = %self.class, error = %e, "Failed to start sensor stream");
                Err(e)
            }
        }
    }

    /// Fetch the newest sample without waiting
    ///
    /// Tracks resolution changes if the stream renegotiates its format.
    pub fn poll_sample(&mut self) -> Option<&SensorSample> {
        let stream = self.stream.as_mut()?;
        if let Some(sample) = stream.try_sample() {
            if let Some(resolution) = sample.resolution()
                && self.native_resolution != Some(resolution)
            {
                warn!(class = %self.class, %resolution, "Stream resolution changed");
                self.native_resolution = Some(resolution);
            }
            self.latest_sample = Some(sample);
        }
        self.latest_sample.as_ref()
    }

    /// Release the stream; safe to call repeatedly
    pub fn stop(&mut self) {
        self.switch_cancel_flag.store(true, Ordering::Release);
        if let Some(mut stream) = self.stream.take() {
            info!(class = %self.class, stream = %stream.stream_id(), "Stopping sensor stream");
            stream.close();
        }
        self.running = false;
        self.native_resolution = None;
        self.latest_sample = None;
    }
}

impl Drop for SensorHandle {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!(class = %self.class, "SensorHandle dropped, stopping stream");
            self.stop();
        }
    }
}

impl std::fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorHandle")
            .field("class", &self.class)
            .field("running", &self.running)
            .field("native_resolution", &self.native_resolution)
            .field("config", &self.config)
            .finish()
    }
}
