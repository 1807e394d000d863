use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Plays a directory of still images as a live feed, in file-name order.
///
/// Each `capture` decodes the next image; the feed ends after the last one.
/// A file that fails to decode is still consumed, so the next capture moves on.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    stopped: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| format!("Cannot read frame directory {}: {e}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(format!("No images found in {}", dir.display()).into());
        }
        log::info!("Frame source: {} images from {}", paths.len(), dir.display());
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            cursor: 0,
            stopped: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len().saturating_sub(self.cursor)
    }
}

impl FrameSource for ImageSequenceSource {
    fn is_live(&self) -> bool {
        !self.stopped && self.cursor < self.paths.len()
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        if !self.is_live() {
            return Err(CaptureError::Stopped);
        }
        let index = self.cursor;
        self.cursor += 1;

        let img = image::open(&self.paths[index])
            .map_err(|e| CaptureError::Decode {
                index,
                reason: e.to_string(),
            })?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Frame::try_new(img.into_raw(), width, height, 3, index)
    }

    fn stop(&mut self) {
        if !self.stopped {
            log::debug!("Frame source stopped at {}/{}", self.cursor, self.paths.len());
        }
        self.stopped = true;
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
