// SPDX-License-Identifier: MPL-2.0

//! Async photo capture pipeline
//!
//! ```text
//! Camera session → First frame → Encoding → Still-image blob
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Capture**: Wait for and copy the first full frame of the session
//! 2. **Encoding**: Convert to JPEG/PNG on the blocking pool

pub mod capture;
pub mod encoding;

pub use capture::PhotoCapture;
pub use encoding::{EncodingFormat, PhotoEncoder};

use crate::backends::camera::CameraSession;
use crate::backends::camera::types::MediaBlob;
use crate::errors::CaptureError;
use std::time::Duration;
use tracing::info;

/// Complete photo capture pipeline
pub struct PhotoPipeline {
    encoder: PhotoEncoder,
    frame_wait_interval: Duration,
}

impl PhotoPipeline {
    pub fn new(encoder: PhotoEncoder, frame_wait_interval: Duration) -> Self {
        Self {
            encoder,
            frame_wait_interval,
        }
    }

    /// Capture and encode one still from `session`
    ///
    /// The session is left open; closing it is the caller's job.
    pub async fn capture(&self, session: &CameraSession) -> Result<MediaBlob, CaptureError> {
        let frame = PhotoCapture::first_frame(session, self.frame_wait_interval).await?;
        let blob = self.encoder.encode(frame).await?;
        info!(size = blob.len(), mime = %blob.mime_type, "Photo encoded");
        Ok(blob)
    }
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self::new(
            PhotoEncoder::new(),
            crate::constants::timing::FRAME_WAIT_INTERVAL,
        )
    }
}
