use thiserror::Error;

/// Transient frame acquisition failures. The pipeline retries these on the
/// next tick instead of escalating them.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("frame source not ready (dimensions {width}x{height})")]
    NotReady { width: u32, height: u32 },
    #[error("frame buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("unsupported pixel format: {channels} channels")]
    UnsupportedFormat { channels: u8 },
    #[error("frame source has stopped")]
    Stopped,
    #[error("failed to decode frame {index}: {reason}")]
    Decode { index: usize, reason: String },
}
