use serde::{Deserialize, Serialize};

use crate::detection::domain::detector_options::DetectorOptions;
use crate::shared::descriptor::FaceDescriptor;

/// Axis-aligned face box in working-frame pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detected face: geometry, landmark points, descriptor and confidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub landmarks: Vec<(f32, f32)>,
    pub descriptor: FaceDescriptor,
    pub score: f32,
}

/// Faces found in one submitted frame, plus the size of that frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub faces: Vec<FaceRecord>,
    pub display_size: (u32, u32),
}

impl DetectionResult {
    pub fn new(faces: Vec<FaceRecord>, display_size: (u32, u32)) -> Self {
        Self {
            faces,
            display_size,
        }
    }

    /// Drops faces under the score threshold and keeps the best
    /// `max_detected_faces`, highest score first.
    pub fn apply_options(mut self, options: &DetectorOptions) -> Self {
        self.faces.retain(|f| f.score.is_finite() && f.score >= options.score_threshold);
        self.faces.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.faces.truncate(options.max_detected_faces);
        self
    }

    /// Descriptor of the highest-scoring face that carries a usable one.
    pub fn primary_descriptor(&self) -> Option<&FaceDescriptor> {
        self.faces
            .iter()
            .filter(|f| f.descriptor.is_usable())
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|f| &f.descriptor)
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(score: f32, descriptor: Vec<f32>) -> FaceRecord {
        FaceRecord {
            bounding_box: BoundingBox {
                x: 10.0,
                y: 10.0,
                width: 50.0,
                height: 60.0,
            },
            landmarks: vec![(20.0, 30.0), (40.0, 30.0)],
            descriptor: FaceDescriptor::new(descriptor),
            score,
        }
    }

    fn options(score_threshold: f32, max_detected_faces: usize) -> DetectorOptions {
        DetectorOptions {
            input_size: 224,
            score_threshold,
            max_detected_faces,
        }
    }

    #[test]
    fn test_apply_options_drops_low_scores() {
        let faces = vec![face(0.9, vec![1.0]), face(0.2, vec![2.0])];
        let result = DetectionResult::new(faces, (320, 240));
        let filtered = result.apply_options(&options(0.5, 10));
        assert_eq!(filtered.faces.len(), 1);
        assert_eq!(filtered.faces[0].score, 0.9);
    }

    #[test]
    fn test_apply_options_keeps_highest_scores() {
        let result = DetectionResult::new(
            vec![face(0.6, vec![1.0]), face(0.95, vec![2.0]), face(0.8, vec![3.0])],
            (320, 240),
        );
        let filtered = result.apply_options(&options(0.5, 2));
        let scores: Vec<f32> = filtered.faces.iter().map(|f| f.score).collect();
        assert_eq!(scores, vec![0.95, 0.8]);
    }

    #[test]
    fn test_apply_options_zero_faces_is_valid() {
        let result = DetectionResult::new(Vec::new(), (320, 240)).apply_options(&options(0.5, 1));
        assert!(result.is_empty());
        assert_eq!(result.display_size, (320, 240));
    }

    #[test]
    fn test_primary_descriptor_prefers_highest_score() {
        let result = DetectionResult::new(vec![face(0.6, vec![1.0]), face(0.9, vec![2.0])], (1, 1));
        assert_eq!(result.primary_descriptor().unwrap().values(), &[2.0]);
    }

    #[test]
    fn test_primary_descriptor_skips_unusable() {
        let result = DetectionResult::new(vec![face(0.9, vec![]), face(0.6, vec![1.0])], (1, 1));
        assert_eq!(result.primary_descriptor().unwrap().values(), &[1.0]);
    }

    #[test]
    fn test_primary_descriptor_none_without_faces() {
        assert!(DetectionResult::default().primary_descriptor().is_none());
    }

    #[test]
    fn test_face_record_json_uses_box_key() {
        let json = r#"{"box":{"x":1,"y":2,"width":3,"height":4},"descriptor":[0.5],"score":0.7}"#;
        let record: FaceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.bounding_box.width, 3.0);
        assert!(record.landmarks.is_empty());
        assert_eq!(record.descriptor.values(), &[0.5]);
    }
}
