// SPDX-License-Identifier: GPL-3.0-only

//! Landmark coordinate mapping
//!
//! Detection models report points in source-pixel space. These functions move
//! them into surface-pixel space using a [`Layout`], optionally mirrored
//! horizontally around the surface midline. Results are never clamped: points
//! in a trimmed region come back outside the surface and callers decide what to
//! do with them.

use crate::layout::Layout;
use serde::{Deserialize, Serialize};

/// A landmark produced by an external detection model
///
/// `z`, `confidence` and `index` are payload. They are copied verbatim and
/// never scaled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// A keypoint expressed in surface pixels
pub type MappedPoint = Keypoint;

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

/// Axis-aligned detection box in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Flip an x coordinate around the surface midline
pub fn mirror_x(x: f64, layout: &Layout) -> f64 {
    layout.surface_width - x
}

/// Map one keypoint from source space to surface space
pub fn map_point(point: &Keypoint, layout: &Layout, mirror: bool) -> MappedPoint {
    let centered_x = point.x * layout.scale_x - layout.crop_offset_x;
    let centered_y = point.y * layout.scale_y - layout.crop_offset_y;

    let x = if mirror {
        mirror_x(centered_x, layout)
    } else {
        centered_x
    };

    MappedPoint {
        x,
        y: centered_y,
        ..*point
    }
}

/// Map a list of keypoints, keeping missing entries in place
///
/// Models may report fewer landmarks than expected; `None` at position `i` in
/// the input gives `None` at position `i` in the output.
pub fn map_points(
    points: &[Option<Keypoint>],
    layout: &Layout,
    mirror: bool,
) -> Vec<Option<MappedPoint>> {
    points
        .iter()
        .map(|p| p.as_ref().map(|p| map_point(p, layout, mirror)))
        .collect()
}

/// Map a surface point back to source space
///
/// Inverse of [`map_point`], used to hit-test touches against detections.
/// Returns `None` when the layout has a zero scale factor.
pub fn unmap_point(point: &MappedPoint, layout: &Layout, mirror: bool) -> Option<Keypoint> {
    if layout.scale_x == 0.0 || layout.scale_y == 0.0 {
        return None;
    }
    let centered_x = if mirror {
        mirror_x(point.x, layout)
    } else {
        point.x
    };
    Some(Keypoint {
        x: (centered_x + layout.crop_offset_x) / layout.scale_x,
        y: (point.y + layout.crop_offset_y) / layout.scale_y,
        ..*point
    })
}

/// Map a detection box to surface space
///
/// Under mirroring the left and right edges swap, so the returned box still
/// has a non-negative width.
pub fn map_box(bbox: &BoundingBox, layout: &Layout, mirror: bool) -> BoundingBox {
    let a = map_point(&Keypoint::new(bbox.x, bbox.y), layout, mirror);
    let b = map_point(
        &Keypoint::new(bbox.x + bbox.width, bbox.y + bbox.height),
        layout,
        mirror,
    );
    BoundingBox {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        width: (b.x - a.x).abs(),
        height: (b.y - a.y).abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::types::Resolution;
    use crate::layout::{FitPolicy, SurfaceSize, resolve};

    const EPS: f64 = 1e-9;

    fn letterboxed() -> Layout {
        resolve(
            Resolution::new(640, 480),
            SurfaceSize::new(1280.0, 480.0),
            FitPolicy::FitHeight,
            None,
        )
        .expect("layout")
    }

    #[test]
    fn test_letterboxed_point_is_shifted_right() {
        let mapped = map_point(&Keypoint::new(320.0, 240.0), &letterboxed(), false);
        assert!((mapped.x - 640.0).abs() < EPS);
        assert!((mapped.y - 240.0).abs() < EPS);
    }

    #[test]
    fn test_mirror_flips_around_surface_width() {
        let layout = letterboxed();
        let plain = map_point(&Keypoint::new(100.0, 50.0), &layout, false);
        let mirrored = map_point(&Keypoint::new(100.0, 50.0), &layout, true);

        assert!((mirrored.x - (1280.0 - plain.x)).abs() < EPS);
        assert!((mirrored.y - plain.y).abs() < EPS);
        // Mirroring twice is the identity
        assert!((mirror_x(mirrored.x, &layout) - plain.x).abs() < EPS);
    }

    #[test]
    fn test_payload_is_copied_unscaled() {
        let point = Keypoint::new(10.0, 20.0)
            .with_z(-0.25)
            .with_confidence(0.87)
            .with_index(8);
        let layout = resolve(
            Resolution::new(640, 480),
            SurfaceSize::new(405.0, 720.0),
            FitPolicy::Cover,
            None,
        )
        .expect("layout");

        let mapped = map_point(&point, &layout, true);
        assert_eq!(mapped.z, Some(-0.25));
        assert_eq!(mapped.confidence, Some(0.87));
        assert_eq!(mapped.index, Some(8));
    }

    #[test]
    fn test_map_points_keeps_gaps() {
        let layout = letterboxed();
        let input = [
            Some(Keypoint::new(0.0, 0.0)),
            None,
            Some(Keypoint::new(640.0, 480.0)),
        ];

        let output = map_points(&input, &layout, false);
        assert_eq!(output.len(), 3);
        assert_eq!(output[0], Some(map_point(&Keypoint::new(0.0, 0.0), &layout, false)));
        assert!(output[1].is_none());
        assert_eq!(
            output[2],
            Some(map_point(&Keypoint::new(640.0, 480.0), &layout, false))
        );
    }

    #[test]
    fn test_points_outside_visible_area_are_not_clamped() {
        let layout = resolve(
            Resolution::new(640, 480),
            SurfaceSize::new(405.0, 720.0),
            FitPolicy::FitHeight,
            None,
        )
        .expect("layout");

        let left_edge = map_point(&Keypoint::new(0.0, 0.0), &layout, false);
        assert!((left_edge.x + 277.5).abs() < EPS);
    }

    #[test]
    fn test_unmap_inverts_map() {
        let layout = resolve(
            Resolution::new(1280, 720),
            SurfaceSize::new(390.0, 844.0),
            FitPolicy::Cover,
            None,
        )
        .expect("layout");
        let original = Keypoint::new(812.0, 133.0).with_index(3);

        for mirror in [false, true] {
            let back = unmap_point(&map_point(&original, &layout, mirror), &layout, mirror)
                .expect("invertible");
            assert!((back.x - original.x).abs() < 1e-6);
            assert!((back.y - original.y).abs() < 1e-6);
            assert_eq!(back.index, Some(3));
        }
    }

    #[test]
    fn test_mirrored_box_stays_well_formed() {
        let layout = letterboxed();
        let bbox = BoundingBox {
            x: 100.0,
            y: 100.0,
            width: 50.0,
            height: 20.0,
        };

        let mapped = map_box(&bbox, &layout, true);
        assert!((mapped.width - 50.0).abs() < EPS);
        assert!((mapped.height - 20.0).abs() < EPS);
        // Right edge of the source box becomes the left edge on screen
        assert!((mapped.x - (1280.0 - (150.0 + 320.0))).abs() < EPS);
    }
}
