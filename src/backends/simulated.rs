// SPDX-License-Identifier: GPL-3.0-only

//! Simulated platform
//!
//! Deterministic stand-ins for the platform primitives. Outcomes are scripted
//! ahead of time and stream opening can be held back with a oneshot channel,
//! so tests control exactly when each asynchronous step resolves.

use super::types::*;
use super::{AccessRequester, SensorStream, StreamSource};
use crate::errors::{SensorError, SensorResult};
use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Counts how often the platform primitive was invoked
pub type CallCounter = Arc<AtomicUsize>;

/// Scripted permission primitive
pub struct SimulatedRequester {
    class: SensorClass,
    supported: bool,
    outcomes: Arc<Mutex<VecDeque<SensorResult<()>>>>,
    calls: CallCounter,
}

impl SimulatedRequester {
    /// Requester that grants every request
    pub fn granting(class: SensorClass) -> Self {
        Self {
            class,
            supported: true,
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Requester whose first request is denied, later ones granted
    pub fn denying_once(class: SensorClass) -> Self {
        Self::granting(class).then(Err(SensorError::PermissionDenied(
            "user dismissed the prompt".to_string(),
        )))
    }

    /// Requester for a capability the platform does not have
    pub fn unsupported(class: SensorClass) -> Self {
        Self {
            supported: false,
            ..Self::granting(class)
        }
    }

    /// Queue an outcome; once the queue is empty requests are granted
    pub fn then(self, outcome: SensorResult<()>) -> Self {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    /// Shared handle to the invocation counter
    pub fn calls(&self) -> CallCounter {
        Arc::clone(&self.calls)
    }
}

impl AccessRequester for SimulatedRequester {
    fn sensor_class(&self) -> SensorClass {
        self.class
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn request(&mut self) -> BoxFuture<'static, SensorResult<()>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(()));
        debug!(class = %self.class, call, granted = outcome.is_ok(), "Simulated permission request");
        async move { outcome }.boxed()
    }
}

#[derive(Default)]
struct SourceScript {
    failures: HashMap<Facing, VecDeque<String>>,
    holds: HashMap<Facing, VecDeque<oneshot::Receiver<()>>>,
}

/// Scripted stream source
///
/// Camera streams report `front_resolution` or `back_resolution` depending on
/// the requested facing. Other classes emit synthetic readings.
#[derive(Clone)]
pub struct SimulatedSource {
    class: SensorClass,
    front_resolution: Resolution,
    back_resolution: Resolution,
    script: Arc<Mutex<SourceScript>>,
    next_id: Arc<AtomicU64>,
    live: Arc<AtomicUsize>,
}

impl SimulatedSource {
    /// Camera source with typical phone resolutions
    pub fn camera() -> Self {
        Self::new(SensorClass::Camera)
    }

    pub fn new(class: SensorClass) -> Self {
        Self {
            class,
            front_resolution: Resolution::new(640, 480),
            back_resolution: Resolution::new(1280, 720),
            script: Arc::new(Mutex::new(SourceScript::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Override the resolution reported for a facing
    pub fn with_resolution(mut self, facing: Facing, resolution: Resolution) -> Self {
        match facing {
            Facing::Front => self.front_resolution = resolution,
            Facing::Back => self.back_resolution = resolution,
        }
        self
    }

    /// Make the next open for `facing` fail with a device error
    pub fn fail_next(&self, facing: Facing, message: &str) {
        self.lock_script()
            .failures
            .entry(facing)
            .or_default()
            .push_back(message.to_string());
    }

    /// Hold back the next open for `facing` until the returned sender fires
    /// (or is dropped)
    pub fn hold_next(&self, facing: Facing) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock_script()
            .holds
            .entry(facing)
            .or_default()
            .push_back(rx);
        tx
    }

    /// Number of streams opened and not yet closed
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, SourceScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StreamSource for SimulatedSource {
    fn open(
        &self,
        config: &CameraConfig,
    ) -> BoxFuture<'static, SensorResult<Box<dyn SensorStream>>> {
        let facing = config.facing;
        let (failure, hold) = {
            let mut script = self.lock_script();
            let failure = script.failures.get_mut(&facing).and_then(|q| q.pop_front());
            let hold = script.holds.get_mut(&facing).and_then(|q| q.pop_front());
            (failure, hold)
        };
        let resolution = match facing {
            Facing::Front => self.front_resolution,
            Facing::Back => self.back_resolution,
        };
        let class = self.class;
        let id = StreamId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let live = Arc::clone(&self.live);

        async move {
            if let Some(rx) = hold {
                // A dropped sender releases the hold as well
                let _ = rx.await;
            }
            if let Some(message) = failure {
                debug!(%facing, %message, "Simulated open failure");
                return Err(SensorError::AcquisitionFailure(message));
            }
            live.fetch_add(1, Ordering::SeqCst);
            info!(%class, %facing, %resolution, stream = %id, "Simulated stream opened");
            let stream: Box<dyn SensorStream> = Box::new(SimulatedStream {
                id,
                class,
                resolution,
                tick: 0,
                closed: false,
                live,
            });
            Ok(stream)
        }
        .boxed()
    }
}

/// Stream that produces a sample on every poll until closed
pub struct SimulatedStream {
    id: StreamId,
    class: SensorClass,
    resolution: Resolution,
    tick: u64,
    closed: bool,
    live: Arc<AtomicUsize>,
}

impl SimulatedStream {
    fn produce(&mut self) -> Option<SensorSample> {
        if self.closed {
            return None;
        }
        self.tick += 1;
        let t = self.tick as f64;
        Some(match self.class {
            SensorClass::Camera => SensorSample::Video {
                width: self.resolution.width,
                height: self.resolution.height,
            },
            SensorClass::Motion => SensorSample::Motion {
                alpha: (t * 3.0) % 360.0,
                beta: 0.0,
                gamma: 0.0,
                acceleration: [0.0, 0.0, 9.81],
            },
            SensorClass::Microphone => SensorSample::Level(((self.tick % 10) as f32) / 10.0),
            SensorClass::Speech => SensorSample::Transcript {
                text: "hello".to_string(),
                is_final: self.tick % 2 == 0,
            },
            SensorClass::Vibration => SensorSample::Pulse,
        })
    }
}

impl SensorStream for SimulatedStream {
    fn stream_id(&self) -> StreamId {
        self.id
    }

    fn next_sample(&mut self) -> BoxFuture<'_, Option<SensorSample>> {
        let sample = self.produce();
        async move { sample }.boxed()
    }

    fn try_sample(&mut self) -> Option<SensorSample> {
        self.produce()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
            debug!(stream = %self.id, "Simulated stream closed");
        }
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_follows_script() {
        let mut requester = SimulatedRequester::denying_once(SensorClass::Motion);
        let calls = requester.calls();

        assert!(pollster::block_on(requester.request()).is_err());
        assert!(pollster::block_on(requester.request()).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_source_reports_resolution_per_facing() {
        let source = SimulatedSource::camera();
        let config = CameraConfig {
            facing: Facing::Back,
            ..CameraConfig::default()
        };

        let mut stream = pollster::block_on(source.open(&config)).expect("open");
        let sample = pollster::block_on(stream.next_sample()).expect("sample");
        assert_eq!(sample.resolution(), Some(Resolution::new(1280, 720)));
        assert_eq!(source.live_streams(), 1);

        stream.close();
        stream.close();
        assert_eq!(source.live_streams(), 0);
        assert!(stream.try_sample().is_none());
    }

    #[test]
    fn test_scripted_failure_is_consumed_once() {
        let source = SimulatedSource::camera();
        source.fail_next(Facing::Front, "camera in use");
        let config = CameraConfig::default();

        let first = pollster::block_on(source.open(&config));
        assert!(matches!(first, Err(SensorError::AcquisitionFailure(_))));
        assert!(pollster::block_on(source.open(&config)).is_ok());
    }
}
