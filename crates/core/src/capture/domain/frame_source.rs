use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// A live feed of frames (camera, screen, image sequence).
///
/// Owned exclusively by the frame pipeline while detection is active.
pub trait FrameSource: Send {
    /// `false` once the feed is paused, ended or stopped.
    fn is_live(&self) -> bool;

    /// Grabs the current frame at source resolution.
    fn capture(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the underlying device. Must be idempotent.
    fn stop(&mut self);
}
