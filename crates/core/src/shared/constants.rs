/// Maximum distance (exclusive) at which a live descriptor matches a reference.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.3;

/// Descriptors captured before an enrollment is finalized.
pub const DEFAULT_ENROLLMENT_QUOTA: usize = 3;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 200;

/// Longest side of the frame handed to the detector, independent of camera resolution.
pub const DEFAULT_MAX_WORKING_SIDE: u32 = 320;

/// Consecutive capture failures before the user is warned (counter resets after).
pub const DEFAULT_CAPTURE_FAILURE_THRESHOLD: usize = 5;

pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DETECTOR_INPUT_SIZE: u32 = 224;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MAX_DETECTED_FACES: usize = 1;

pub const DEFAULT_REFERENCE_FILE_NAME: &str = "face-descriptors.json";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "ppm"];
