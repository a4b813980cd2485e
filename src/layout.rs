// SPDX-License-Identifier: GPL-3.0-only

//! Video layout resolution
//!
//! Computes where a source frame of arbitrary resolution lands inside an output
//! surface of arbitrary resolution. Only geometry is computed here; nothing
//! touches pixels.
//!
//! Every policy produces crop offsets as `(display - surface) / 2` per axis.
//! A positive offset means the scaled source is trimmed on that axis, a
//! negative one means it is padded (letterboxed). The display rectangle origin
//! is always the negated crop offset, so the video is centred on the surface.
//!
//! `FitHeight` and `FitWidth` are strict: the named axis always matches the
//! surface and the other axis is centred, trimmed or padded as needed. They
//! never switch to the other axis.

use crate::backends::types::Resolution;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rule for scaling and positioning the source within the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// Scale so the source height equals the surface height
    #[default]
    FitHeight,
    /// Scale so the source width equals the surface width
    FitWidth,
    /// Fill the surface, trimming whichever axis overflows
    Cover,
    /// Show the whole source, padding whichever axis underflows
    Contain,
    /// Caller-chosen display size, possibly distorting
    Fixed,
}

impl FitPolicy {
    pub const ALL: [FitPolicy; 5] = [
        FitPolicy::FitHeight,
        FitPolicy::FitWidth,
        FitPolicy::Cover,
        FitPolicy::Contain,
        FitPolicy::Fixed,
    ];

    /// Whether the policy scales both axes by the same factor
    pub fn is_uniform(&self) -> bool {
        !matches!(self, FitPolicy::Fixed)
    }
}

impl std::fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitPolicy::FitHeight => write!(f, "fit-height"),
            FitPolicy::FitWidth => write!(f, "fit-width"),
            FitPolicy::Cover => write!(f, "cover"),
            FitPolicy::Contain => write!(f, "contain"),
            FitPolicy::Fixed => write!(f, "fixed"),
        }
    }
}

impl std::str::FromStr for FitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fit-height" | "fitheight" => Ok(FitPolicy::FitHeight),
            "fit-width" | "fitwidth" => Ok(FitPolicy::FitWidth),
            "cover" => Ok(FitPolicy::Cover),
            "contain" => Ok(FitPolicy::Contain),
            "fixed" => Ok(FitPolicy::Fixed),
            other => Err(format!("unknown fit policy '{}'", other)),
        }
    }
}

/// Output surface size in pixels
///
/// Surfaces may be fractional (device pixel ratios), unlike source frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for SurfaceSize {
    fn from(r: Resolution) -> Self {
        Self::new(r.width as f64, r.height as f64)
    }
}

/// Placement of the video within the surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Left edge of the video in surface pixels
    pub display_x: f64,
    /// Top edge of the video in surface pixels
    pub display_y: f64,
    pub display_width: f64,
    pub display_height: f64,
    /// Source pixel to surface pixel factor, horizontal
    pub scale_x: f64,
    /// Source pixel to surface pixel factor, vertical
    pub scale_y: f64,
    /// Trimmed (positive) or padded (negative) amount per side, horizontal
    pub crop_offset_x: f64,
    /// Trimmed (positive) or padded (negative) amount per side, vertical
    pub crop_offset_y: f64,
    pub surface_width: f64,
    pub surface_height: f64,
}

impl Layout {
    /// Display rectangle aspect ratio
    pub fn display_aspect(&self) -> f64 {
        self.display_width / self.display_height
    }

    /// Whether any part of the source is trimmed off the surface
    pub fn is_cropped(&self) -> bool {
        self.crop_offset_x > 0.0 || self.crop_offset_y > 0.0
    }

    /// Whether any part of the surface is left blank
    pub fn is_letterboxed(&self) -> bool {
        self.crop_offset_x < 0.0 || self.crop_offset_y < 0.0
    }
}

fn valid_dimension(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Compute the layout of `source` inside `surface`
///
/// `fixed` is only read by [`FitPolicy::Fixed`]; when it is missing the source
/// size is used, giving a 1:1 layout.
///
/// # Returns
/// * `Some(Layout)` - All dimensions are positive and finite
/// * `None` - The source has not reported a size yet, or the surface is empty
pub fn resolve(
    source: Resolution,
    surface: SurfaceSize,
    policy: FitPolicy,
    fixed: Option<(f64, f64)>,
) -> Option<Layout> {
    let source_w = source.width as f64;
    let source_h = source.height as f64;
    if ![source_w, source_h, surface.width, surface.height]
        .into_iter()
        .all(valid_dimension)
    {
        debug!(%source, ?surface, "Skipping layout for empty dimensions");
        return None;
    }

    let (scale_x, scale_y) = match policy {
        FitPolicy::FitHeight => {
            let scale = surface.height / source_h;
            (scale, scale)
        }
        FitPolicy::FitWidth => {
            let scale = surface.width / source_w;
            (scale, scale)
        }
        FitPolicy::Cover => {
            let scale = (surface.width / source_w).max(surface.height / source_h);
            (scale, scale)
        }
        FitPolicy::Contain => {
            let scale = (surface.width / source_w).min(surface.height / source_h);
            (scale, scale)
        }
        FitPolicy::Fixed => match fixed {
            Some((w, h)) if valid_dimension(w) && valid_dimension(h) => (w / source_w, h / source_h),
            _ => (1.0, 1.0),
        },
    };

    // Pin the constrained axis to the surface exactly instead of trusting the
    // round trip through the scale factor
    let display_width = match (policy, fixed) {
        (FitPolicy::FitWidth, _) => surface.width,
        (FitPolicy::Fixed, Some((w, h))) if valid_dimension(w) && valid_dimension(h) => w,
        _ => source_w * scale_x,
    };
    let display_height = match (policy, fixed) {
        (FitPolicy::FitHeight, _) => surface.height,
        (FitPolicy::Fixed, Some((w, h))) if valid_dimension(w) && valid_dimension(h) => h,
        _ => source_h * scale_y,
    };

    let crop_offset_x = (display_width - surface.width) / 2.0;
    let crop_offset_y = (display_height - surface.height) / 2.0;

    Some(Layout {
        display_x: -crop_offset_x,
        display_y: -crop_offset_y,
        display_width,
        display_height,
        scale_x,
        scale_y,
        crop_offset_x,
        crop_offset_y,
        surface_width: surface.width,
        surface_height: surface.height,
    })
}

/// Inputs that determine a layout
#[derive(Debug, Clone, Copy, PartialEq)]
struct LayoutKey {
    source: Resolution,
    surface: SurfaceSize,
    policy: FitPolicy,
    fixed: Option<(f64, f64)>,
}

/// Remembers the last layout and recomputes only when an input changes
#[derive(Debug, Clone, Default)]
pub struct LayoutCache {
    key: Option<LayoutKey>,
    layout: Option<Layout>,
    recomputations: u64,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout for the given inputs, reusing the cached value when unchanged
    pub fn get(
        &mut self,
        source: Resolution,
        surface: SurfaceSize,
        policy: FitPolicy,
        fixed: Option<(f64, f64)>,
    ) -> Option<Layout> {
        let key = LayoutKey {
            source,
            surface,
            policy,
            fixed: if policy == FitPolicy::Fixed { fixed } else { None },
        };
        if self.key != Some(key) {
            self.layout = resolve(source, surface, policy, key.fixed);
            self.key = Some(key);
            self.recomputations += 1;
            debug!(
                %source,
                surface_w = surface.width,
                surface_h = surface.height,
                %policy,
                "Layout recomputed"
            );
        }
        self.layout
    }

    /// Number of times the layout was actually recomputed
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Forget the cached layout
    pub fn invalidate(&mut self) {
        self.key = None;
        self.layout = None;
    }
}
