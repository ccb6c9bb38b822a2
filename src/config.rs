// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON under `$XDG_CONFIG_HOME/pod-capture/config.json`. Every
//! field has a default, so a partial (or missing) file is fine.

use crate::backends::camera::types::{CameraConstraints, Facing};
use crate::constants::{camera, timing};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Config directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "pod-capture";
/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Camera constraints requested on every acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Which way the camera should face
    pub facing: Facing,
    /// Ideal capture width
    pub ideal_width: u32,
    /// Ideal capture height
    pub ideal_height: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            // Laptop front camera, like the handheld flow it replaced
            facing: Facing::User,
            ideal_width: camera::IDEAL_WIDTH,
            ideal_height: camera::IDEAL_HEIGHT,
        }
    }
}

/// Upload endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Endpoint URL; when unset, uploads are simulated
    pub url: Option<String>,
    /// Hold time of each staged status (convert, connect, transfer)
    pub stage_delays_ms: [u64; 3],
    /// HTTP request timeout
    pub request_timeout_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            url: None,
            stage_delays_ms: [
                timing::UPLOAD_CONVERT_DELAY.as_millis() as u64,
                timing::UPLOAD_CONNECT_DELAY.as_millis() as u64,
                timing::UPLOAD_TRANSFER_DELAY.as_millis() as u64,
            ],
            request_timeout_secs: timing::UPLOAD_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera constraints
    pub camera: CameraSettings,
    /// Re-arm delay between scan polls
    pub scan_interval_ms: u64,
    /// Poll interval while a photo capture waits for its first frame
    pub frame_wait_interval_ms: u64,
    /// Proof video length
    pub video_duration_ms: u64,
    /// JPEG quality for photo proof (1-100)
    pub photo_jpeg_quality: u8,
    /// Upload endpoint settings
    pub upload: UploadSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            scan_interval_ms: timing::SCAN_POLL_INTERVAL.as_millis() as u64,
            frame_wait_interval_ms: timing::FRAME_WAIT_INTERVAL.as_millis() as u64,
            video_duration_ms: timing::VIDEO_DURATION.as_millis() as u64,
            photo_jpeg_quality: camera::PHOTO_JPEG_QUALITY,
            upload: UploadSettings::default(),
        }
    }
}

impl Config {
    /// Default location of the config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No platform config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Reject values that would stall or break the workflow
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return Err(ConfigError::Invalid {
                field: "camera",
                reason: "resolution must be non-zero".to_string(),
            });
        }
        if self.scan_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scan_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.frame_wait_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "frame_wait_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.video_duration_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "video_duration_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(1..=100).contains(&self.photo_jpeg_quality) {
            return Err(ConfigError::Invalid {
                field: "photo_jpeg_quality",
                reason: format!("{} is outside 1-100", self.photo_jpeg_quality),
            });
        }
        if let Some(url) = &self.upload.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field: "upload.url",
                    reason: format!("`{}` is not an http(s) URL", url),
                });
            }
        }
        Ok(())
    }

    /// Constraints for a video-only (scan, photo) or video+audio acquisition
    pub fn constraints(&self, wants_audio: bool) -> CameraConstraints {
        CameraConstraints {
            facing: self.camera.facing,
            ideal_width: self.camera.ideal_width,
            ideal_height: self.camera.ideal_height,
            wants_audio,
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn frame_wait_interval(&self) -> Duration {
        Duration::from_millis(self.frame_wait_interval_ms)
    }

    pub fn video_duration(&self) -> Duration {
        Duration::from_millis(self.video_duration_ms)
    }

    pub fn upload_stage_delays(&self) -> [Duration; 3] {
        self.upload.stage_delays_ms.map(Duration::from_millis)
    }

    pub fn upload_request_timeout(&self) -> Duration {
        Duration::from_secs(self.upload.request_timeout_secs)
    }
}
