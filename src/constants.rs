// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::backends::SensorClass;

/// Overlay text while a platform request is in flight
pub const ENABLING_TEXT: &str = "Enabling…";

/// Prompt shown when the caller does not supply one
pub fn default_prompt(class: SensorClass) -> &'static str {
    match class {
        SensorClass::Camera => "Tap to enable camera",
        SensorClass::Motion => "Tap to enable motion sensors",
        SensorClass::Microphone => "Tap to enable microphone",
        SensorClass::Speech => "Tap to enable speech recognition",
        SensorClass::Vibration => "Tap to enable vibration",
    }
}

/// Output surface defaults
pub mod surface {
    /// Portrait phone surface used when none is configured (CSS pixels)
    pub const DEFAULT_WIDTH: f64 = 405.0;
    pub const DEFAULT_HEIGHT: f64 = 720.0;
}

/// Landmark counts reported by common detection models
pub mod landmarks {
    /// Body pose (33 keypoints)
    pub const POSE: usize = 33;
    /// One hand (21 keypoints)
    pub const HAND: usize = 21;
    /// Face mesh (468 keypoints)
    pub const FACE_MESH: usize = 468;

    /// Expected keypoint count for a model name, if known
    pub fn count_for_model(name: &str) -> Option<usize> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pose" | "body" => Some(POSE),
            "hand" | "hands" => Some(HAND),
            "face" | "facemesh" | "face-mesh" => Some(FACE_MESH),
            _ => None,
        }
    }
}

/// Configuration file location
pub mod config_file {
    /// Directory name under the platform config dir
    pub const APP_DIR: &str = "sketch-sensors";
    pub const FILE_NAME: &str = "config.json";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_landmark_counts() {
        assert_eq!(landmarks::count_for_model("Hand"), Some(21));
        assert_eq!(landmarks::count_for_model("pose"), Some(33));
        assert_eq!(landmarks::count_for_model("face-mesh"), Some(468));
        assert_eq!(landmarks::count_for_model("tail"), None);
    }
}
