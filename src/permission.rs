// SPDX-License-Identifier: GPL-3.0-only

//! Gesture-gated permission state machine
//!
//! Mobile platforms reject sensor requests that do not originate from a user
//! gesture. [`PermissionGate`] owns that workflow for one sensor class:
//!
//! ```text
//!            enable()             gesture               grant
//!  Locked ───────────▶ Awaiting ──────────▶ Requesting ───────▶ Granted
//!    ▲                 Gesture                   │                 │
//!    │                                   failure │                 │ disable()
//!    │        rearm()                            ▼                 │
//!    └──────────────────────────────────────── Denied ◀────────────┘
//!                                              │   ▲        (to Locked)
//!                                      gesture └───┘ (retryable errors only)
//! ```
//!
//! The platform call is issued only from [`PermissionGate::handle_gesture`].
//! It returns a [`PendingRequest`] future; the caller awaits it and hands the
//! [`RequestOutcome`] back to [`PermissionGate::complete`]. The frame loop keeps
//! running in between.

use crate::backends::{AccessRequester, SensorClass};
use crate::constants::ENABLING_TEXT;
use crate::errors::{SensorError, SensorResult};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

/// Named states of a permission session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionState {
    /// Sensor inactive, no overlay
    Locked,
    /// Overlay shown, waiting for a tap or click
    AwaitingGesture,
    /// Platform call in flight
    Requesting,
    /// Access granted, sensor enabled
    Granted,
    /// Request failed; a new gesture retries unless unsupported
    Denied,
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::Locked => write!(f, "Locked"),
            PermissionState::AwaitingGesture => write!(f, "AwaitingGesture"),
            PermissionState::Requesting => write!(f, "Requesting"),
            PermissionState::Granted => write!(f, "Granted"),
            PermissionState::Denied => write!(f, "Denied"),
        }
    }
}

/// What the gesture-capturing surface currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    Hidden,
    /// Prompt asking for a tap
    Prompt(String),
    /// Transient indication while the platform call runs
    Enabling(String),
    /// Non-blocking diagnostic after a failure
    Error(String),
}

impl Overlay {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Overlay::Hidden)
    }

    /// Text to draw, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Overlay::Hidden => None,
            Overlay::Prompt(t) | Overlay::Enabling(t) | Overlay::Error(t) => Some(t),
        }
    }
}

/// Input events delivered to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Tap,
    Click,
    KeyPress,
    PointerMove,
    Scroll,
}

impl Gesture {
    /// Whether the platform accepts sensor requests from this event
    pub fn is_qualifying(&self) -> bool {
        matches!(self, Gesture::Tap | Gesture::Click | Gesture::KeyPress)
    }
}

/// Observable state of one sensor's permission workflow
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionSession {
    pub sensor_class: SensorClass,
    pub state: PermissionState,
    pub overlay: Overlay,
    pub last_error: Option<SensorError>,
}

impl PermissionSession {
    fn new(sensor_class: SensorClass) -> Self {
        Self {
            sensor_class,
            state: PermissionState::Locked,
            overlay: Overlay::Hidden,
            last_error: None,
        }
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay.is_visible()
    }
}

/// Result of one platform call, tagged with the attempt that issued it
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub sensor_class: SensorClass,
    pub attempt: u64,
    pub result: SensorResult<()>,
}

/// A platform call issued from inside a gesture handler
///
/// Cannot be cancelled; a caller that loses interest simply drops it.
pub struct PendingRequest {
    sensor_class: SensorClass,
    attempt: u64,
    future: BoxFuture<'static, SensorResult<()>>,
}

impl PendingRequest {
    pub fn sensor_class(&self) -> SensorClass {
        self.sensor_class
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Wait for the platform to answer
    pub async fn wait(self) -> RequestOutcome {
        let result = self.future.await;
        RequestOutcome {
            sensor_class: self.sensor_class,
            attempt: self.attempt,
            result,
        }
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("sensor_class", &self.sensor_class)
            .field("attempt", &self.attempt)
            .finish()
    }
}

/// Callback fired on every transition into Granted
pub type ReadyCallback = Box<dyn FnMut() + Send>;

/// Gesture-gated enable workflow for one sensor class
pub struct PermissionGate {
    session: PermissionSession,
    requester: Box<dyn AccessRequester>,
    callbacks: Vec<ReadyCallback>,
    /// Callbacks at indices below this have fired for the current grant
    fired: usize,
    attempt: u64,
    /// Unsupported errors are shown once, then the overlay is dismissed
    unsupported_reported: bool,
}

impl PermissionGate {
    pub fn new(requester: Box<dyn AccessRequester>) -> Self {
        let class = requester.sensor_class();
        debug!(%class, "Creating permission gate");
        Self {
            session: PermissionSession::new(class),
            requester,
            callbacks: Vec::new(),
            fired: 0,
            attempt: 0,
            unsupported_reported: false,
        }
    }

    pub fn sensor_class(&self) -> SensorClass {
        self.session.sensor_class
    }

    pub fn state(&self) -> PermissionState {
        self.session.state
    }

    pub fn session(&self) -> &PermissionSession {
        &self.session
    }

    pub fn overlay(&self) -> &Overlay {
        &self.session.overlay
    }

    pub fn last_error(&self) -> Option<&SensorError> {
        self.session.last_error.as_ref()
    }

    /// True only while Granted
    pub fn is_enabled(&self) -> bool {
        self.session.state == PermissionState::Granted
    }

    /// Ask for the sensor; shows `prompt` and waits for a gesture
    ///
    /// Never calls the platform primitive. While Granted this is a no-op apart
    /// from firing callbacks registered since the grant.
    pub fn enable(&mut self, prompt: &str) {
        let class = self.sensor_class();
        match self.session.state {
            PermissionState::Locked => {
                info!(%class, prompt, "Awaiting user gesture");
                self.session.state = PermissionState::AwaitingGesture;
                self.session.overlay = Overlay::Prompt(prompt.to_string());
            }
            PermissionState::AwaitingGesture => {
                self.session.overlay = Overlay::Prompt(prompt.to_string());
            }
            PermissionState::Granted => {
                debug!(%class, "Already granted");
                self.fire_pending();
            }
            PermissionState::Requesting | PermissionState::Denied => {
                debug!(%class, state = %self.session.state, "enable() ignored");
            }
        }
    }

    /// Deliver an input event
    ///
    /// This is the only place the platform call is made. Returns the pending
    /// request when one was issued.
    pub fn handle_gesture(&mut self, gesture: Gesture) -> Option<PendingRequest> {
        if !gesture.is_qualifying() {
            return None;
        }
        let class = self.sensor_class();

        match self.session.state {
            PermissionState::AwaitingGesture => {}
            PermissionState::Denied => {
                let retryable = self
                    .session
                    .last_error
                    .as_ref()
                    .is_none_or(SensorError::is_retryable);
                if !retryable {
                    // Surfaced once already; a tap just dismisses the message
                    self.session.overlay = Overlay::Hidden;
                    return None;
                }
                info!(%class, "Retrying after denial");
            }
            _ => return None,
        }

        if !self.requester.is_supported() {
            self.deny(SensorError::UnsupportedFeature(format!(
                "{} is not available on this platform",
                class
            )));
            self.unsupported_reported = true;
            return None;
        }

        self.attempt += 1;
        self.session.state = PermissionState::Requesting;
        self.session.overlay = Overlay::Enabling(ENABLING_TEXT.to_string());
        info!(%class, attempt = self.attempt, ?gesture, "Requesting sensor access");

        Some(PendingRequest {
            sensor_class: class,
            attempt: self.attempt,
            future: self.requester.request(),
        })
    }

    /// Whether `outcome` answers the request this gate is waiting on
    ///
    /// False for another class, an earlier attempt, or once the gate has left
    /// Requesting (e.g. disabled while the platform call was in flight).
    pub fn is_current(&self, outcome: &RequestOutcome) -> bool {
        outcome.sensor_class == self.sensor_class()
            && outcome.attempt == self.attempt
            && self.session.state == PermissionState::Requesting
    }

    /// Apply the platform's answer
    ///
    /// Outcomes for another class, an earlier attempt, or arriving after the
    /// gate left Requesting are ignored.
    pub fn complete(&mut self, outcome: RequestOutcome) -> PermissionState {
        let class = self.sensor_class();
        if !self.is_current(&outcome) {
            debug!(
                %class,
                attempt = outcome.attempt,
                current = self.attempt,
                state = %self.session.state,
                "Discarding stale permission outcome"
            );
            return self.session.state;
        }

        match outcome.result {
            Ok(()) => {
                info!(%class, "Sensor access granted");
                self.session.state = PermissionState::Granted;
                self.session.overlay = Overlay::Hidden;
                self.session.last_error = None;
                self.fired = 0;
                self.fire_pending();
            }
            Err(err) => self.deny(err),
        }
        self.session.state
    }

    /// Register a callback for transitions into Granted
    ///
    /// Fires immediately when already Granted.
    pub fn on_ready<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
        if self.is_enabled() {
            self.fire_pending();
        }
    }

    /// Turn the sensor off; the next `enable()` starts over
    pub fn disable(&mut self) {
        if self.session.state != PermissionState::Locked {
            info!(class = %self.sensor_class(), from = %self.session.state, "Disabling sensor");
        }
        self.session.state = PermissionState::Locked;
        self.session.overlay = Overlay::Hidden;
        self.fired = 0;
    }

    /// Reset a denied session back to Locked
    pub fn rearm(&mut self) -> bool {
        if self.session.state != PermissionState::Denied {
            return false;
        }
        debug!(class = %self.sensor_class(), "Re-arming denied session");
        self.session = PermissionSession::new(self.sensor_class());
        self.unsupported_reported = false;
        true
    }

    fn deny(&mut self, err: SensorError) {
        let class = self.sensor_class();
        warn!(%class, error = %err, "Sensor access denied");
        self.session.state = PermissionState::Denied;
        self.session.overlay = if self.unsupported_reported {
            Overlay::Hidden
        } else {
            Overlay::Error(err.overlay_message())
        };
        self.session.last_error = Some(err);
    }

    fn fire_pending(&mut self) {
        while self.fired < self.callbacks.len() {
            let index = self.fired;
            self.fired += 1;
            (self.callbacks[index])();
        }
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("session", &self.session)
            .field("callbacks", &self.callbacks.len())
            .field("attempt", &self.attempt)
            .finish()
    }
}
