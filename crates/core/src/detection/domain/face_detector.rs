use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_record::FaceRecord;
use crate::shared::frame::Frame;

/// The face detection / descriptor extraction capability.
///
/// Backends are opaque and may be slow; they run on the detection worker
/// thread, never on the control thread. Implementations may hold model
/// state, hence `&mut self`.
pub trait FaceDetector: Send {
    /// Loads models. Called again on a repeated handshake, so it must be
    /// safe to call when already loaded.
    fn load_models(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Detects faces in `frame`. Zero faces is a valid result.
    fn detect(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>>;
}
