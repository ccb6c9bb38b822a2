// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Timing constants for the scan loop, capture and upload pipelines
pub mod timing {
    use super::Duration;

    /// Re-arm delay between two scan polls (not a timeout on the decode itself)
    pub const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(200);

    /// How often the photo capture checks whether the first frame arrived
    pub const FRAME_WAIT_INTERVAL: Duration = Duration::from_millis(16);

    /// Fixed duration of a proof video; there is no early-stop path
    pub const VIDEO_DURATION: Duration = Duration::from_millis(5000);

    /// "Converting media for upload..." hold time
    pub const UPLOAD_CONVERT_DELAY: Duration = Duration::from_millis(800);

    /// "Connecting to cloud storage..." hold time
    pub const UPLOAD_CONNECT_DELAY: Duration = Duration::from_millis(1200);

    /// "Uploading media file..." hold time
    pub const UPLOAD_TRANSFER_DELAY: Duration = Duration::from_millis(2000);

    /// HTTP request timeout for the upload endpoint
    pub const UPLOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
}

/// Default camera constraints
pub mod camera {
    /// Ideal capture width requested from the device
    pub const IDEAL_WIDTH: u32 = 1280;

    /// Ideal capture height requested from the device
    pub const IDEAL_HEIGHT: u32 = 720;

    /// JPEG quality for photo proof (0-100)
    pub const PHOTO_JPEG_QUALITY: u8 = 92;
}

/// Barcode decoder tuning
pub mod decoder {
    /// Frames larger than this (either side) are downscaled before decoding
    pub const MAX_DIMENSION: u32 = 640;
}

/// Status and scan messages shown to the operator
pub mod messages {
    pub const SCAN_INITIALIZING: &str = "Initializing camera...";
    pub const SCAN_LOADING_FEED: &str = "Loading camera feed...";
    pub const SCAN_SCANNING: &str = "Scanning... Point camera at barcode";

    pub const PHOTO_CAPTURED: &str = "Photo captured. Ready to upload.";
    pub const VIDEO_RECORDED: &str = "Video recorded. Ready to upload.";

    pub const UPLOAD_STARTED: &str = "Uploading to cloud storage...";
    pub const UPLOAD_CONVERTING: &str = "Converting media for upload...";
    pub const UPLOAD_CONNECTING: &str = "Connecting to cloud storage...";
    pub const UPLOAD_TRANSFERRING: &str = "Uploading media file...";

    pub fn scan_detected(identifier: &str) -> String {
        format!("Detected: {}", identifier)
    }

    pub fn scanned_awb(identifier: &str) -> String {
        format!("Scanned AWB: {}", identifier)
    }

    pub fn manual_awb(identifier: &str) -> String {
        format!("Manual AWB entered: {}", identifier)
    }

    pub fn scan_camera_error(message: &str) -> String {
        format!("Camera error: {}", message)
    }

    pub fn camera_access_error(message: &str) -> String {
        format!("Error accessing camera: {}", message)
    }

    pub fn capture_failed(message: &str) -> String {
        format!("Capture failed: {}", message)
    }

    pub fn video_recording(duration: std::time::Duration) -> String {
        format!("Recording video for {} seconds...", duration.as_secs())
    }

    pub fn upload_succeeded(kind: &str, identifier: &str) -> String {
        format!(
            "Successfully uploaded {} for AWB: {} to cloud storage",
            kind, identifier
        )
    }

    pub fn upload_failed(message: &str) -> String {
        format!("Upload failed: {}", message)
    }
}

/// Supported file formats for the file-backed virtual camera
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Virtual camera timing constants
pub mod virtual_camera {
    use super::Duration;

    /// Time between acquisition and the first frame being ready
    pub const WARMUP: Duration = Duration::from_millis(300);

    /// Frame rate for recorded chunks (~10fps keeps MJPEG proof videos small)
    pub const RECORD_FRAME_DURATION: Duration = Duration::from_millis(100);

    /// MIME type of the concatenated-JPEG recordings
    pub const RECORDING_MIME: &str = "video/x-motion-jpeg";
}

/// GStreamer pipeline constants (live camera backend)
pub mod pipeline {
    /// Maximum buffers in appsink queue
    pub const MAX_BUFFERS: u32 = 2;

    /// Output format of the preview branch, consumed by the decoder
    pub const OUTPUT_FORMAT: &str = "RGBA";

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// MIME type of live recordings
    pub const RECORDING_MIME: &str = "video/webm";
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
