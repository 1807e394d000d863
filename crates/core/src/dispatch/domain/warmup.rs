use image::ImageFormat;

use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// Frame index reserved for the warm-up image; never produced by a source.
pub const WARMUP_FRAME_INDEX: usize = usize::MAX;

const WARMUP_IMAGE: &[u8] = include_bytes!("../../../assets/warmup_face.ppm");

/// Decodes the bundled reference image sent with the one-time `WARMUP` request.
pub fn warmup_frame() -> Result<Frame, CaptureError> {
    let img = image::load_from_memory_with_format(WARMUP_IMAGE, ImageFormat::Pnm)
        .map_err(|e| CaptureError::Decode {
            index: WARMUP_FRAME_INDEX,
            reason: e.to_string(),
        })?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Frame::try_new(img.into_raw(), width, height, 3, WARMUP_FRAME_INDEX)
}
