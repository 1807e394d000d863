use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detector_options::DetectorOptions;
use crate::shared::constants::{
    DEFAULT_CAPTURE_FAILURE_THRESHOLD, DEFAULT_ENROLLMENT_QUOTA, DEFAULT_HANDSHAKE_TIMEOUT_SECS,
    DEFAULT_MATCH_THRESHOLD, DEFAULT_MAX_WORKING_SIDE, DEFAULT_REFERENCE_FILE_NAME,
    DEFAULT_TICK_INTERVAL_MS,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Tunables for a session. Missing fields fall back to defaults, so a
/// settings file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub match_threshold: f32,
    pub enrollment_quota: usize,
    pub tick_interval_ms: u64,
    pub max_working_side: u32,
    pub capture_failure_threshold: usize,
    pub handshake_timeout_secs: u64,
    pub detector: DetectorOptions,
    pub reference_file_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            enrollment_quota: DEFAULT_ENROLLMENT_QUOTA,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_working_side: DEFAULT_MAX_WORKING_SIDE,
            capture_failure_threshold: DEFAULT_CAPTURE_FAILURE_THRESHOLD,
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            detector: DetectorOptions::default(),
            reference_file_name: DEFAULT_REFERENCE_FILE_NAME.to_string(),
        }
    }
}

impl Settings {
    /// `<config dir>/FaceGate/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceGate").join("settings.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the user's settings file, or defaults when there is none.
    pub fn load() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.match_threshold.is_finite() && self.match_threshold > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "match_threshold must be a positive number, got {}",
                self.match_threshold
            )));
        }
        if self.enrollment_quota == 0 {
            return Err(SettingsError::Invalid(
                "enrollment_quota must be at least 1".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "tick_interval_ms must be at least 1".into(),
            ));
        }
        if self.max_working_side == 0 {
            return Err(SettingsError::Invalid(
                "max_working_side must be at least 1".into(),
            ));
        }
        if self.capture_failure_threshold == 0 {
            return Err(SettingsError::Invalid(
                "capture_failure_threshold must be at least 1".into(),
            ));
        }
        if self.handshake_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "handshake_timeout_secs must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.score_threshold) {
            return Err(SettingsError::Invalid(format!(
                "detector.score_threshold must be between 0.0 and 1.0, got {}",
                self.detector.score_threshold
            )));
        }
        if self.detector.max_detected_faces == 0 {
            return Err(SettingsError::Invalid(
                "detector.max_detected_faces must be at least 1".into(),
            ));
        }
        if self.reference_file_name.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "reference_file_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}
