// SPDX-License-Identifier: GPL-3.0-only

//! Per-class sensor registry
//!
//! One [`PermissionGate`] per sensor class plus the optional camera. Sessions
//! are owned here and exposed through read-only accessors; nothing else holds
//! an "enabled" flag.

use crate::backends::{AccessRequester, SensorClass};
use crate::camera::CameraHandle;
use crate::config::Config;
use crate::errors::SensorError;
use crate::permission::{
    Gesture, Overlay, PendingRequest, PermissionGate, PermissionSession, PermissionState,
    RequestOutcome,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Registry of permission gates, one per sensor class
#[derive(Default)]
pub struct SensorHub {
    gates: HashMap<SensorClass, PermissionGate>,
    camera: Option<CameraHandle>,
    prompts: HashMap<SensorClass, String>,
}

impl SensorHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub using the prompt texts from `config`
    pub fn with_config(config: &Config) -> Self {
        Self {
            prompts: config.prompts.clone(),
            ..Self::default()
        }
    }

    /// Register the platform primitive for a class, replacing any earlier one
    pub fn register(&mut self, requester: Box<dyn AccessRequester>) {
        let class = requester.sensor_class();
        debug!(%class, "Registering sensor class");
        if self.gates.insert(class, PermissionGate::new(requester)).is_some() {
            warn!(%class, "Replaced existing permission gate");
        }
    }

    /// Attach the camera that camera grants should start
    pub fn attach_camera(&mut self, camera: CameraHandle) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<&CameraHandle> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut CameraHandle> {
        self.camera.as_mut()
    }

    pub fn gate(&self, class: SensorClass) -> Option<&PermissionGate> {
        self.gates.get(&class)
    }

    pub fn session(&self, class: SensorClass) -> Option<&PermissionSession> {
        self.gates.get(&class).map(PermissionGate::session)
    }

    /// Begin enabling `class`
    ///
    /// Falls back to the configured prompt when `prompt` is `None`.
    /// Unregistered classes are reported as unsupported.
    pub fn enable_sensor(
        &mut self,
        class: SensorClass,
        prompt: Option<&str>,
    ) -> Result<PermissionState, SensorError> {
        let text = prompt
            .map(str::to_string)
            .or_else(|| self.prompts.get(&class).cloned())
            .unwrap_or_else(|| crate::constants::default_prompt(class).to_string());
        let gate = self.gates.get_mut(&class).ok_or_else(|| {
            SensorError::UnsupportedFeature(format!("no {} backend registered", class))
        })?;
        gate.enable(&text);
        Ok(gate.state())
    }

    pub fn is_enabled(&self, class: SensorClass) -> bool {
        self.gates.get(&class).is_some_and(PermissionGate::is_enabled)
    }

    /// Register a ready callback for `class`
    ///
    /// Returns false when the class has no registered backend.
    pub fn on_ready<F>(&mut self, class: SensorClass, callback: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        match self.gates.get_mut(&class) {
            Some(gate) => {
                gate.on_ready(callback);
                true
            }
            None => false,
        }
    }

    pub fn disable(&mut self, class: SensorClass) {
        if let Some(gate) = self.gates.get_mut(&class) {
            gate.disable();
        }
        if class == SensorClass::Camera
            && let Some(camera) = self.camera.as_mut()
        {
            camera.stop();
        }
    }

    pub fn rearm(&mut self, class: SensorClass) -> bool {
        self.gates.get_mut(&class).is_some_and(PermissionGate::rearm)
    }

    /// Deliver one input event to every gate waiting for it
    ///
    /// The platform calls happen here, inside the gesture handler.
    pub fn handle_gesture(&mut self, gesture: Gesture) -> Vec<PendingRequest> {
        let mut pending = Vec::new();
        for class in SensorClass::ALL {
            if let Some(request) = self
                .gates
                .get_mut(&class)
                .and_then(|gate| gate.handle_gesture(gesture))
            {
                pending.push(request);
            }
        }
        if !pending.is_empty() {
            info!(count = pending.len(), ?gesture, "Gesture issued sensor requests");
        }
        pending
    }

    /// Apply an outcome to its gate
    pub fn complete(&mut self, outcome: RequestOutcome) -> Option<PermissionState> {
        let class = outcome.sensor_class;
        self.gates.get_mut(&class).map(|gate| gate.complete(outcome))
    }

    /// Await a request and apply it
    ///
    /// Camera requests also start the attached camera before the gate reports
    /// Granted, so ready callbacks see a known resolution. Stale outcomes never
    /// open the camera.
    pub async fn resolve(&mut self, pending: PendingRequest) -> Option<PermissionState> {
        let outcome = pending.wait().await;
        let class = outcome.sensor_class;
        let current = self
            .gates
            .get(&class)
            .is_some_and(|gate| gate.is_current(&outcome));

        let outcome = match (class, self.camera.as_mut()) {
            (SensorClass::Camera, Some(camera)) if current => camera.admit(outcome).await,
            _ => outcome,
        };
        let state = self.complete(outcome);

        if class == SensorClass::Camera
            && state != Some(PermissionState::Granted)
            && let Some(camera) = self.camera.as_mut()
            && camera.is_granted()
        {
            warn!(state = ?state, "Camera running without a grant, stopping it");
            camera.stop();
        }
        state
    }

    /// Overlays currently shown, in class order
    pub fn visible_overlays(&self) -> Vec<(SensorClass, &Overlay)> {
        SensorClass::ALL
            .iter()
            .filter_map(|class| self.gates.get(class).map(|g| (*class, g.overlay())))
            .filter(|(_, overlay)| overlay.is_visible())
            .collect()
    }
}

impl std::fmt::Debug for SensorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states: HashMap<_, _> = self.gates.iter().map(|(c, g)| (*c, g.state())).collect();
        f.debug_struct("SensorHub")
            .field("gates", &states)
            .field("camera", &self.camera.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::CameraConfig;
    use crate::backends::simulated::{SimulatedRequester, SimulatedSource};
    use crate::layout::SurfaceSize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hub() -> SensorHub {
        let mut hub = SensorHub::new();
        for class in SensorClass::ALL {
            hub.register(Box::new(SimulatedRequester::granting(class)));
        }
        hub
    }

    #[test]
    fn test_unregistered_class_is_unsupported() {
        let mut hub = SensorHub::new();
        let result = hub.enable_sensor(SensorClass::Speech, Some("Tap"));
        assert!(matches!(result, Err(SensorError::UnsupportedFeature(_))));
        assert!(!hub.is_enabled(SensorClass::Speech));
        assert!(!hub.on_ready(SensorClass::Speech, || {}));
    }

    #[test]
    fn test_gesture_only_reaches_waiting_gates() {
        let mut hub = hub();
        hub.enable_sensor(SensorClass::Motion, Some("Tap for motion"))
            .expect("registered");
        hub.enable_sensor(SensorClass::Microphone, None)
            .expect("registered");

        let pending = hub.handle_gesture(Gesture::Tap);
        let classes: Vec<_> = pending.iter().map(|p| p.sensor_class()).collect();
        assert_eq!(classes, vec![SensorClass::Motion, SensorClass::Microphone]);

        for request in pending {
            pollster::block_on(hub.resolve(request));
        }
        assert!(hub.is_enabled(SensorClass::Motion));
        assert!(hub.is_enabled(SensorClass::Microphone));
        assert!(!hub.is_enabled(SensorClass::Camera));
        assert!(hub.visible_overlays().is_empty());
    }

    #[test]
    fn test_default_prompt_is_used() {
        let mut hub = hub();
        hub.enable_sensor(SensorClass::Camera, None).expect("registered");
        let overlays = hub.visible_overlays();
        assert_eq!(overlays.len(), 1);
        assert_eq!(
            overlays[0].1.text(),
            Some(crate::constants::default_prompt(SensorClass::Camera))
        );
    }

    #[test]
    fn test_camera_grant_starts_camera() {
        let mut hub = hub();
        let source = SimulatedSource::camera();
        hub.attach_camera(CameraHandle::new(
            Arc::new(source.clone()),
            CameraConfig::default(),
            SurfaceSize::new(405.0, 720.0),
        ));
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        hub.on_ready(SensorClass::Camera, move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        hub.enable_sensor(SensorClass::Camera, Some("Tap to start"))
            .expect("registered");
        let mut pending = hub.handle_gesture(Gesture::Click);
        assert_eq!(pending.len(), 1);
        let state = pollster::block_on(hub.resolve(pending.remove(0)));

        assert_eq!(state, Some(PermissionState::Granted));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(hub.camera().is_some_and(CameraHandle::is_ready));

        hub.disable(SensorClass::Camera);
        assert!(!hub.is_enabled(SensorClass::Camera));
        assert_eq!(source.live_streams(), 0);
    }

    fn hub_with_camera(source: &SimulatedSource) -> SensorHub {
        let mut hub = hub();
        hub.attach_camera(CameraHandle::new(
            Arc::new(source.clone()),
            CameraConfig::default(),
            SurfaceSize::new(405.0, 720.0),
        ));
        hub
    }

    #[test]
    fn test_disable_while_requesting_leaves_no_stream() {
        let source = SimulatedSource::camera();
        let mut hub = hub_with_camera(&source);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        hub.on_ready(SensorClass::Camera, move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        hub.enable_sensor(SensorClass::Camera, None).expect("registered");
        let mut pending = hub.handle_gesture(Gesture::Tap);
        assert_eq!(pending.len(), 1);
        hub.disable(SensorClass::Camera);

        let state = pollster::block_on(hub.resolve(pending.remove(0)));
        assert_eq!(state, Some(PermissionState::Locked));
        assert!(!hub.is_enabled(SensorClass::Camera));
        assert!(hub.camera().is_some_and(|c| !c.is_ready()));
        assert_eq!(source.live_streams(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_camera_outcome_does_not_open_camera() {
        let source = SimulatedSource::camera();
        let mut hub = hub_with_camera(&source);

        hub.enable_sensor(SensorClass::Camera, None).expect("registered");
        let first = hub.handle_gesture(Gesture::Tap).remove(0);
        hub.disable(SensorClass::Camera);
        hub.enable_sensor(SensorClass::Camera, None).expect("registered");
        let second = hub.handle_gesture(Gesture::Tap).remove(0);
        assert!(second.attempt() > first.attempt());

        assert_eq!(
            pollster::block_on(hub.resolve(first)),
            Some(PermissionState::Requesting)
        );
        assert_eq!(source.live_streams(), 0);

        assert_eq!(
            pollster::block_on(hub.resolve(second)),
            Some(PermissionState::Granted)
        );
        assert_eq!(source.live_streams(), 1);
    }
}
