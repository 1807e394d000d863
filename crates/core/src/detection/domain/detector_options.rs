use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_DETECTOR_INPUT_SIZE, DEFAULT_MAX_DETECTED_FACES, DEFAULT_SCORE_THRESHOLD,
};

/// Tuning knobs forwarded with every detection request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    pub input_size: u32,
    pub score_threshold: f32,
    pub max_detected_faces: usize,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_DETECTOR_INPUT_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_detected_faces: DEFAULT_MAX_DETECTED_FACES,
        }
    }
}
