use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_record::FaceRecord;
use crate::shared::frame::Frame;

/// Per-frame detections keyed by frame index, as stored in a fixture file.
///
/// ```json
/// { "0": [ { "box": {...}, "landmarks": [[x, y]], "descriptor": [...], "score": 0.98 } ] }
/// ```
pub type DetectionFixture = HashMap<usize, Vec<FaceRecord>>;

/// Replays pre-computed face records by frame index.
///
/// Stands in for a neural backend: reading the fixture is its model load,
/// so a missing or malformed fixture surfaces as an initialization failure.
/// Frames with no entry yield zero faces.
pub struct ReplayFaceDetector {
    source: Option<PathBuf>,
    fixture: Option<DetectionFixture>,
}

impl ReplayFaceDetector {
    /// Fixture is read from `path` on the first `load_models`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            fixture: None,
        }
    }

    pub fn from_fixture(fixture: DetectionFixture) -> Self {
        Self {
            source: None,
            fixture: Some(fixture),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.fixture.is_some()
    }
}

impl FaceDetector for ReplayFaceDetector {
    fn load_models(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.fixture.is_some() {
            return Ok(());
        }
        let path = self.source.as_ref().ok_or("No detection fixture configured")?;
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read detection fixture {}: {e}", path.display()))?;
        let fixture: DetectionFixture = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid detection fixture {}: {e}", path.display()))?;
        log::info!(
            "Loaded detection fixture {} ({} frames)",
            path.display(),
            fixture.len()
        );
        self.fixture = Some(fixture);
        Ok(())
    }

    fn detect(
        &mut self,
        frame: &Frame,
        _options: &DetectorOptions,
    ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
        let fixture = self.fixture.as_ref().ok_or("Detection fixture not loaded")?;
        Ok(fixture.get(&frame.index()).cloned().unwrap_or_default())
    }
}
