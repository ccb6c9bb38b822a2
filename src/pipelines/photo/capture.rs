// SPDX-License-Identifier: MPL-2.0

//! Photo capture from a camera session
//!
//! A freshly acquired stream usually needs a moment before its first full
//! frame is available; this waits for it and copies it out.

use crate::backends::camera::CameraSession;
use crate::backends::camera::types::CameraFrame;
use crate::errors::CameraError;
use std::time::Duration;
use tracing::{debug, info};

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Wait for the first full frame of `session` and copy it
    ///
    /// Checks readiness every `interval`. There is no deadline; the caller
    /// owns the session and aborting the caller releases it.
    ///
    /// # Returns
    /// * `Ok(CameraFrame)` - First available frame
    /// * `Err(CameraError::Disconnected)` - Session closed or device lost while waiting
    pub async fn first_frame(
        session: &CameraSession,
        interval: Duration,
    ) -> Result<CameraFrame, CameraError> {
        info!(session = session.id(), "Waiting for first frame");

        let mut waits = 0u32;
        loop {
            if !session.is_active() {
                return Err(CameraError::Disconnected(
                    "Camera session closed before a frame arrived".to_string(),
                ));
            }
            if session.is_frame_ready() {
                let frame = session.grab_frame()?;
                debug!(
                    width = frame.width,
                    height = frame.height,
                    waits,
                    "Frame captured from session"
                );
                return Ok(frame);
            }
            waits += 1;
            tokio::time::sleep(interval).await;
        }
    }
}
