use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// Downscales captured frames to the detector's working resolution.
///
/// Bounds detection cost independently of camera resolution. Output is
/// always RGB; RGBA input is flattened.
pub struct FrameScaler {
    max_side: u32,
}

impl FrameScaler {
    pub fn new(max_side: u32) -> Self {
        Self {
            max_side: max_side.max(1),
        }
    }

    pub fn max_side(&self) -> u32 {
        self.max_side
    }

    pub fn fit(&self, frame: Frame) -> Result<Frame, CaptureError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::NotReady { width, height });
        }

        let index = frame.index();
        let channels = frame.channels();
        let expected = (width as usize) * (height as usize) * (channels as usize);
        let actual = frame.data().len();
        let (target_w, target_h) = working_size(width, height, self.max_side);

        let rgb = match channels {
            3 if (target_w, target_h) == (width, height) => return Ok(frame),
            3 => RgbImage::from_raw(width, height, frame.into_data())
                .ok_or(CaptureError::BufferSize { expected, actual })?,
            4 => {
                let rgba = RgbaImage::from_raw(width, height, frame.into_data())
                    .ok_or(CaptureError::BufferSize { expected, actual })?;
                DynamicImage::ImageRgba8(rgba).to_rgb8()
            }
            other => return Err(CaptureError::UnsupportedFormat { channels: other }),
        };

        let scaled = if (target_w, target_h) == (width, height) {
            rgb
        } else {
            imageops::resize(&rgb, target_w, target_h, FilterType::Triangle)
        };
        Ok(Frame::new(scaled.into_raw(), target_w, target_h, 3, index))
    }
}

/// Target dimensions with the longest side capped at `max_side`, keeping
/// the source aspect ratio. Never returns a zero dimension.
pub fn working_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_side);
    (scaled(width), scaled(height))
}
