// SPDX-License-Identifier: GPL-3.0-only

//! Camera handle exposed to sketches
//!
//! Bundles the camera's [`SensorHandle`], the caller's [`CameraConfig`], the
//! output surface size and a [`LayoutCache`]. Settings change through explicit
//! setters so the side effects (stream replacement, layout recomputation) are
//! visible at the call site.
//!
//! The device stays closed until a camera grant is admitted through
//! [`CameraHandle::admit`]; opening or switching before that is refused with
//! [`SensorError::NotReady`], and [`CameraHandle::stop`] revokes the grant.
//!
//! Mapping before the camera reported a native resolution returns `None`; frame
//! loops call it every frame and are expected to branch on [`CameraHandle::is_ready`].

use crate::backends::{CameraConfig, Facing, Resolution, SensorClass, SensorStream, StreamSource};
use crate::errors::{SensorError, SensorResult};
use crate::layout::{FitPolicy, Layout, LayoutCache, SurfaceSize};
use crate::mapping::{self, BoundingBox, Keypoint, MappedPoint};
use crate::permission::{PendingRequest, RequestOutcome};
use crate::sensor::{SensorHandle, SwitchOutcome, SwitchRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Camera-specific surface of the sensor API
pub struct CameraHandle {
    handle: SensorHandle,
    config: CameraConfig,
    surface: SurfaceSize,
    layout: LayoutCache,
    granted: bool,
}

impl CameraHandle {
    pub fn new(source: Arc<dyn StreamSource>, config: CameraConfig, surface: SurfaceSize) -> Self {
        Self {
            handle: SensorHandle::new(SensorClass::Camera, source),
            config,
            surface,
            layout: LayoutCache::new(),
            granted: false,
        }
    }

    /// Current settings as seen by the mapper
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    /// True once a stream is running and its resolution is known
    pub fn is_ready(&self) -> bool {
        self.handle.is_running() && self.handle.native_resolution().is_some()
    }

    pub fn native_resolution(&self) -> Option<Resolution> {
        self.handle.native_resolution()
    }

    /// Video stream handle for external detection models
    pub fn video(&self) -> Option<&dyn SensorStream> {
        self.handle.stream()
    }

    /// Whether a camera grant has been admitted and not revoked
    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Start the camera with the current settings
    ///
    /// Refused with [`SensorError::NotReady`] until a grant was admitted.
    pub async fn start(&mut self) -> SensorResult<()> {
        self.ensure_granted()?;
        self.handle.start(self.config).await
    }

    /// Await a camera permission request and start the stream on grant
    ///
    /// The returned outcome is only successful once the stream has reported
    /// its resolution, so ready callbacks fired by the gate can rely on it.
    pub async fn acquire(&mut self, pending: PendingRequest) -> RequestOutcome {
        let outcome = pending.wait().await;
        self.admit(outcome).await
    }

    /// Start the stream for a granted camera outcome
    ///
    /// Callers must only pass outcomes the gate still considers current.
    pub async fn admit(&mut self, mut outcome: RequestOutcome) -> RequestOutcome {
        if outcome.sensor_class != SensorClass::Camera {
            warn!(class = %outcome.sensor_class, "Non-camera request routed to camera");
            return outcome;
        }
        if outcome.result.is_ok() {
            self.granted = true;
            if let Err(e) = self.start().await {
                self.granted = false;
                outcome.result = Err(e);
            }
        }
        outcome
    }

    /// Switch between front and back cameras
    ///
    /// Mirroring follows the facing: front is mirrored, back is not. The stream
    /// is replaced before this returns; on failure the previous camera keeps
    /// running and the settings are left unchanged.
    pub async fn set_facing(&mut self, facing: Facing) -> SensorResult<()> {
        let request = self.request_facing(facing)?;
        let outcome = request.wait().await;
        self.apply_switch(outcome)
    }

    /// Issue a facing switch without awaiting it
    ///
    /// Only the most recent request is ever applied.
    pub fn request_facing(&mut self, facing: Facing) -> SensorResult<SwitchRequest> {
        self.ensure_granted()?;
        let config = CameraConfig {
            facing,
            mirror: facing.mirrors_by_default(),
            ..self.config
        };
        info!(from = %self.config.facing, to = %facing, "Requesting camera facing switch");
        Ok(self.handle.begin_switch(config))
    }

    fn ensure_granted(&self) -> SensorResult<()> {
        if self.granted {
            Ok(())
        } else {
            debug!("Camera used before access was granted");
            Err(SensorError::NotReady)
        }
    }

    /// Apply a finished facing switch
    pub fn apply_switch(&mut self, outcome: SwitchOutcome) -> SensorResult<()> {
        match self.handle.finish_switch(outcome) {
            Ok(()) => {
                let running = *self.handle.config();
                self.config.facing = running.facing;
                self.config.mirror = running.mirror;
                Ok(())
            }
            Err(SensorError::Cancelled) => {
                debug!("Ignoring superseded facing switch");
                Err(SensorError::Cancelled)
            }
            Err(e) => {
                warn!(error = %e, facing = %self.config.facing, "Facing switch failed, keeping current camera");
                Err(e)
            }
        }
    }

    /// Returns true if the value changed
    pub fn set_mirror(&mut self, mirror: bool) -> bool {
        let changed = self.config.mirror != mirror;
        self.config.mirror = mirror;
        changed
    }

    /// Returns true if the value changed; the layout is recomputed lazily
    pub fn set_fit_policy(&mut self, policy: FitPolicy) -> bool {
        let changed = self.config.fit_policy != policy;
        if changed {
            debug!(from = %self.config.fit_policy, to = %policy, "Changing fit policy");
        }
        self.config.fit_policy = policy;
        changed
    }

    /// Size used by [`FitPolicy::Fixed`]
    pub fn set_fixed_size(&mut self, width: f64, height: f64) -> bool {
        let changed = self.config.fixed_size() != Some((width, height));
        self.config.fixed_width = Some(width);
        self.config.fixed_height = Some(height);
        changed
    }

    /// Update the output surface size, e.g. after a rotation or resize
    pub fn set_surface_size(&mut self, width: f64, height: f64) -> bool {
        let surface = SurfaceSize::new(width, height);
        let changed = self.surface != surface;
        self.surface = surface;
        changed
    }

    /// Pull the newest frame so resolution changes are noticed
    pub fn poll_frame(&mut self) {
        self.handle.poll_sample();
    }

    /// Where the video sits on the surface, `None` until ready
    pub fn display_rect(&mut self) -> Option<Layout> {
        let source = self.handle.native_resolution()?;
        self.layout.get(
            source,
            self.surface,
            self.config.fit_policy,
            self.config.fixed_size(),
        )
    }

    /// Map one detector keypoint to surface space, `None` until ready
    pub fn map_point(&mut self, point: &Keypoint) -> Option<MappedPoint> {
        let mirror = self.config.mirror;
        self.display_rect()
            .map(|layout| mapping::map_point(point, &layout, mirror))
    }

    /// Map a list of detector keypoints, `None` until ready
    pub fn map_points(&mut self, points: &[Option<Keypoint>]) -> Option<Vec<Option<MappedPoint>>> {
        let mirror = self.config.mirror;
        self.display_rect()
            .map(|layout| mapping::map_points(points, &layout, mirror))
    }

    /// Map a surface point back to source pixels
    pub fn unmap_point(&mut self, point: &MappedPoint) -> Option<Keypoint> {
        let mirror = self.config.mirror;
        let layout = self.display_rect()?;
        mapping::unmap_point(point, &layout, mirror)
    }

    /// Map a detection box to surface space
    pub fn map_box(&mut self, bbox: &BoundingBox) -> Option<BoundingBox> {
        let mirror = self.config.mirror;
        self.display_rect()
            .map(|layout| mapping::map_box(bbox, &layout, mirror))
    }

    /// Release the camera and revoke the grant
    pub fn stop(&mut self) {
        self.granted = false;
        self.handle.stop();
        self.layout.invalidate();
    }
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("config", &self.config)
            .field("surface", &self.surface)
            .field("granted", &self.granted)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::{SimulatedRequester, SimulatedSource};
    use crate::permission::{Gesture, PermissionGate, PermissionState};
    use std::sync::Mutex;

    fn camera(source: &SimulatedSource, config: CameraConfig) -> CameraHandle {
        CameraHandle::new(
            Arc::new(source.clone()),
            config,
            SurfaceSize::new(1280.0, 480.0),
        )
    }

    fn grant(cam: &mut CameraHandle) {
        let outcome = RequestOutcome {
            sensor_class: SensorClass::Camera,
            attempt: 1,
            result: Ok(()),
        };
        let outcome = pollster::block_on(cam.admit(outcome));
        assert!(outcome.result.is_ok(), "camera should start: {:?}", outcome);
    }

    fn unmirrored_fit_height() -> CameraConfig {
        CameraConfig {
            mirror: false,
            fit_policy: FitPolicy::FitHeight,
            ..CameraConfig::default()
        }
    }

    #[test]
    fn test_mapping_before_ready_returns_none() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());

        assert!(!cam.is_ready());
        assert!(cam.display_rect().is_none());
        assert!(cam.map_point(&Keypoint::new(1.0, 1.0)).is_none());
        assert!(cam.map_points(&[Some(Keypoint::new(1.0, 1.0))]).is_none());
    }

    #[test]
    fn test_camera_refuses_to_open_before_grant() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());

        assert_eq!(pollster::block_on(cam.start()), Err(SensorError::NotReady));
        assert_eq!(
            pollster::block_on(cam.set_facing(Facing::Back)),
            Err(SensorError::NotReady)
        );
        assert!(cam.request_facing(Facing::Front).is_err());
        assert!(!cam.is_ready());
        assert_eq!(source.live_streams(), 0);
    }

    #[test]
    fn test_denied_outcome_does_not_open_camera() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());
        let outcome = RequestOutcome {
            sensor_class: SensorClass::Camera,
            attempt: 1,
            result: Err(SensorError::PermissionDenied("dismissed".into())),
        };

        let outcome = pollster::block_on(cam.admit(outcome));
        assert!(outcome.result.is_err());
        assert!(!cam.is_granted());
        assert_eq!(source.live_streams(), 0);
    }

    #[test]
    fn test_stop_revokes_grant() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());
        grant(&mut cam);
        assert!(cam.is_granted());

        cam.stop();
        assert!(!cam.is_granted());
        assert_eq!(source.live_streams(), 0);
        assert_eq!(
            pollster::block_on(cam.set_facing(Facing::Back)),
            Err(SensorError::NotReady)
        );
        assert_eq!(source.live_streams(), 0);
    }

    #[test]
    fn test_letterboxed_mapping_after_start() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, unmirrored_fit_height());
        grant(&mut cam);

        let layout = cam.display_rect().expect("ready");
        assert!((layout.crop_offset_x + 320.0).abs() < 1e-9);
        let mapped = cam.map_point(&Keypoint::new(320.0, 240.0)).expect("ready");
        assert!((mapped.x - 640.0).abs() < 1e-9);
        assert!((mapped.y - 240.0).abs() < 1e-9);
        assert!(cam.video().is_some());
    }

    #[test]
    fn test_setters_report_changes() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, unmirrored_fit_height());

        assert!(!cam.set_mirror(false));
        assert!(cam.set_mirror(true));
        assert!(cam.set_fit_policy(FitPolicy::Cover));
        assert!(!cam.set_fit_policy(FitPolicy::Cover));
        assert!(cam.set_fixed_size(100.0, 100.0));
        assert!(!cam.set_fixed_size(100.0, 100.0));
        assert!(cam.set_surface_size(390.0, 844.0));
    }

    #[test]
    fn test_policy_change_updates_layout() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, unmirrored_fit_height());
        grant(&mut cam);

        let fit_height = cam.display_rect().expect("ready");
        cam.set_fit_policy(FitPolicy::Fixed);
        cam.set_fixed_size(320.0, 320.0);
        let fixed = cam.display_rect().expect("ready");

        assert_ne!(fit_height, fixed);
        assert!((fixed.display_width - 320.0).abs() < 1e-9);
        assert!((fixed.display_height - 320.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_facing_switches_resolution_and_mirror() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());
        grant(&mut cam);
        assert!(cam.config().mirror);

        pollster::block_on(cam.set_facing(Facing::Back)).expect("switch");
        assert_eq!(cam.config().facing, Facing::Back);
        assert!(!cam.config().mirror);
        assert_eq!(cam.native_resolution(), Some(Resolution::new(1280, 720)));
    }

    #[test]
    fn test_failed_facing_switch_keeps_settings() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());
        grant(&mut cam);
        source.fail_next(Facing::Back, "camera already in use");

        let result = pollster::block_on(cam.set_facing(Facing::Back));
        assert!(matches!(result, Err(SensorError::AcquisitionFailure(_))));
        assert_eq!(cam.config().facing, Facing::Front);
        assert!(cam.is_ready());
    }

    #[test]
    fn test_stale_facing_request_is_discarded() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());
        grant(&mut cam);
        let release_front = source.hold_next(Facing::Front);

        let front = cam.request_facing(Facing::Front).expect("granted");
        let back = cam.request_facing(Facing::Back).expect("granted");
        let back_outcome = pollster::block_on(back.wait());
        cam.apply_switch(back_outcome).expect("back applied");

        drop(release_front);
        let front_outcome = pollster::block_on(front.wait());
        assert_eq!(cam.apply_switch(front_outcome), Err(SensorError::Cancelled));
        assert_eq!(cam.config().facing, Facing::Back);
    }

    #[test]
    fn test_ready_callback_sees_resolution() {
        let source = SimulatedSource::camera();
        let mut cam = camera(&source, CameraConfig::default());
        let mut gate = PermissionGate::new(Box::new(SimulatedRequester::granting(
            SensorClass::Camera,
        )));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        gate.on_ready(move || log.lock().expect("lock").push("ready"));

        gate.enable("Tap to start camera");
        let pending = gate.handle_gesture(Gesture::Tap).expect("request issued");
        let outcome = pollster::block_on(cam.acquire(pending));
        assert!(cam.is_ready());
        assert_eq!(gate.complete(outcome), PermissionState::Granted);
        assert_eq!(seen.lock().expect("lock").len(), 1);
    }

    #[test]
    fn test_camera_failure_denies_gate() {
        let source = SimulatedSource::camera();
        source.fail_next(Facing::Front, "device busy");
        let mut cam = camera(&source, CameraConfig::default());
        let mut gate = PermissionGate::new(Box::new(SimulatedRequester::granting(
            SensorClass::Camera,
        )));

        gate.enable("Tap");
        let pending = gate.handle_gesture(Gesture::Tap).expect("request issued");
        let outcome = pollster::block_on(cam.acquire(pending));
        assert_eq!(gate.complete(outcome), PermissionState::Denied);
        assert!(matches!(
            gate.last_error(),
            Some(SensorError::AcquisitionFailure(_))
        ));
        assert!(!cam.is_ready());
    }
}
