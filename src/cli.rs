// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Resolving a layout for a source/surface/policy combination
//! - Mapping single points through that layout
//! - Replaying a permission session against the simulated platform

use crate::LayoutArgs;
use sketch_sensors::backends::simulated::{SimulatedRequester, SimulatedSource};
use sketch_sensors::constants::landmarks;
use sketch_sensors::layout::{self, FitPolicy, Layout, SurfaceSize};
use sketch_sensors::mapping::{self, Keypoint};
use sketch_sensors::permission::Gesture;
use sketch_sensors::utils::{parse_resolution, parse_size};
use sketch_sensors::{AppError, CameraHandle, Config, SensorClass, SensorHub};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Resolve the layout described by the command-line arguments
fn resolve_args(config: &Config, args: &LayoutArgs) -> Result<Layout, AppError> {
    let source = parse_resolution(&args.source).ok_or_else(|| {
        AppError::InvalidArgument(format!("invalid source resolution '{}'", args.source))
    })?;

    let surface = match &args.surface {
        Some(text) => {
            let (width, height) = parse_size(text).ok_or_else(|| {
                AppError::InvalidArgument(format!("invalid surface size '{}'", text))
            })?;
            SurfaceSize::new(width, height)
        }
        None => config.surface(),
    };

    let policy = match &args.policy {
        Some(text) => text.parse::<FitPolicy>().map_err(AppError::InvalidArgument)?,
        None => config.camera.fit_policy,
    };

    let fixed = match &args.fixed {
        Some(text) => Some(parse_size(text).ok_or_else(|| {
            AppError::InvalidArgument(format!("invalid fixed size '{}'", text))
        })?),
        None => config.camera.fixed_size(),
    };

    layout::resolve(source, surface, policy, fixed).ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "cannot lay out {} on {}x{}",
            source, surface.width, surface.height
        ))
    })
}

/// Print the layout as pretty JSON
pub fn print_layout(config: &Config, args: &LayoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let layout = resolve_args(config, args)?;
    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}

/// Print one mapped point as JSON
pub fn print_mapped(
    config: &Config,
    args: &LayoutArgs,
    mirror: bool,
    x: f64,
    y: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = resolve_args(config, args)?;
    let mapped = mapping::map_point(&Keypoint::new(x, y), &layout, mirror);
    println!("{}", serde_json::to_string(&mapped)?);
    Ok(())
}

/// Run a scripted session: enable every class, tap, resolve, map a hand
pub fn simulate(
    config: &Config,
    deny_first: bool,
    unsupported: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let unsupported = unsupported
        .map(str::parse::<SensorClass>)
        .transpose()
        .map_err(AppError::InvalidArgument)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(config, deny_first, unsupported))
}

async fn run_session(
    config: &Config,
    deny_first: bool,
    unsupported: Option<SensorClass>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut hub = SensorHub::with_config(config);
    for class in SensorClass::ALL {
        let requester = if Some(class) == unsupported {
            SimulatedRequester::unsupported(class)
        } else if deny_first && class == SensorClass::Camera {
            SimulatedRequester::denying_once(class)
        } else {
            SimulatedRequester::granting(class)
        };
        hub.register(Box::new(requester));
    }
    hub.attach_camera(CameraHandle::new(
        Arc::new(SimulatedSource::camera()),
        config.camera,
        config.surface(),
    ));

    let ready = Arc::new(AtomicUsize::new(0));
    for class in SensorClass::ALL {
        let counter = Arc::clone(&ready);
        hub.on_ready(class, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let state = hub.enable_sensor(class, None)?;
        println!("{:<10} enable   -> {}", class, state);
    }

    // A pointer move never unlocks anything; two taps cover one retry
    for gesture in [Gesture::PointerMove, Gesture::Tap, Gesture::Tap] {
        let pending = hub.handle_gesture(gesture);
        println!("gesture {:?}: {} request(s)", gesture, pending.len());
        for request in pending {
            let class = request.sensor_class();
            if let Some(state) = hub.resolve(request).await {
                println!("{:<10} resolve  -> {}", class, state);
            }
        }
        for class in SensorClass::ALL {
            if let Some(error) = hub.session(class).and_then(|s| s.last_error.as_ref())
                && !hub.is_enabled(class)
            {
                println!("{:<10} error    :  {}", class, error.overlay_message());
            }
        }
    }
    println!("ready callbacks fired: {}", ready.load(Ordering::SeqCst));

    let Some(camera) = hub.camera_mut() else {
        return Ok(());
    };
    if !camera.is_ready() {
        println!("camera not ready, nothing to map");
        return Ok(());
    }
    if let Some(rect) = camera.display_rect() {
        println!("display rect: {}", serde_json::to_string(&rect)?);
    }

    // A hand centred in the frame, fanned out horizontally
    let Some(native) = camera.native_resolution() else {
        return Ok(());
    };
    let (cx, cy) = (native.width as f64 / 2.0, native.height as f64 / 2.0);
    let hand: Vec<Option<Keypoint>> = (0..landmarks::HAND)
        .map(|i| {
            let dx = (i as f64 - landmarks::HAND as f64 / 2.0) * 8.0;
            Some(
                Keypoint::new(cx + dx, cy - i as f64 * 4.0)
                    .with_confidence(0.9)
                    .with_index(i),
            )
        })
        .collect();
    if let Some(mapped) = camera.map_points(&hand) {
        for point in mapped.iter().flatten().take(3) {
            println!("landmark: {}", serde_json::to_string(point)?);
        }
        println!("mapped {} landmarks", mapped.len());
    }

    hub.disable(SensorClass::Camera);
    Ok(())
}
