// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use sketch_sensors::SensorClass;
use sketch_sensors::constants::{self, landmarks, surface};

#[test]
fn test_every_class_has_a_prompt() {
    for class in SensorClass::ALL {
        assert!(
            !constants::default_prompt(class).is_empty(),
            "{} should have a default prompt",
            class
        );
    }
}

#[test]
fn test_default_surface_is_portrait() {
    assert!(surface::DEFAULT_WIDTH > 0.0);
    assert!(surface::DEFAULT_HEIGHT > surface::DEFAULT_WIDTH);
}

#[test]
fn test_landmark_counts() {
    assert_eq!(landmarks::HAND, 21);
    assert_eq!(landmarks::POSE, 33);
    assert_eq!(landmarks::FACE_MESH, 468);
    assert_eq!(landmarks::count_for_model("hands"), Some(landmarks::HAND));
}
