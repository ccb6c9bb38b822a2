// SPDX-License-Identifier: GPL-3.0-only

//! Capture controller
//!
//! Drives the two one-shot capture operations. Each opens a session of its
//! own, holds it for exactly the duration of the capture, and closes it
//! before returning, on success and failure alike.
//!
//! Right after acquisition the session is handed to an `attach` callback.
//! The workflow keeps a weak reference to it there, so cancelling a capture
//! can close the device immediately. If `attach` refuses, the capture was
//! cancelled while the camera was starting and the session is closed at once.

use crate::backends::camera::{CameraSession, CameraSessionManager};
use crate::backends::camera::types::{CameraConstraints, MediaBlob};
use crate::errors::CameraError;
use crate::errors::CaptureError;
use crate::pipelines::photo::PhotoPipeline;
use crate::pipelines::video::VideoRecorder;
use crate::storage::MediaKind;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of a successful capture, before it is published as proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMedia {
    pub kind: MediaKind,
    pub blob: MediaBlob,
}

/// One-shot photo and video capture
pub struct CaptureController {
    sessions: CameraSessionManager,
    photo: PhotoPipeline,
    video: VideoRecorder,
    photo_constraints: CameraConstraints,
    video_constraints: CameraConstraints,
}

impl CaptureController {
    pub fn new(
        sessions: CameraSessionManager,
        photo: PhotoPipeline,
        video: VideoRecorder,
        photo_constraints: CameraConstraints,
        video_constraints: CameraConstraints,
    ) -> Self {
        Self {
            sessions,
            photo,
            video,
            photo_constraints,
            video_constraints,
        }
    }

    /// Build a controller from user configuration
    pub fn from_config(sessions: CameraSessionManager, config: &crate::Config) -> Self {
        let encoder = crate::pipelines::photo::PhotoEncoder::new()
            .with_jpeg_quality(config.photo_jpeg_quality);
        Self::new(
            sessions,
            PhotoPipeline::new(encoder, config.frame_wait_interval()),
            VideoRecorder::new(config.video_duration()),
            config.constraints(false),
            config.constraints(true),
        )
    }

    async fn open_attached<A>(
        &self,
        constraints: CameraConstraints,
        attach: A,
    ) -> Result<Arc<CameraSession>, CaptureError>
    where
        A: FnOnce(&Arc<CameraSession>) -> bool,
    {
        let session = Arc::new(self.sessions.open(constraints).await?);
        if !attach(&session) {
            debug!(session = session.id(), "Capture cancelled during camera initialization");
            session.close();
            return Err(CameraError::Disconnected("Capture cancelled".to_string()).into());
        }
        Ok(session)
    }

    /// Open a session, grab the first frame, encode it, close the session
    pub async fn capture_photo<A>(&self, attach: A) -> Result<CapturedMedia, CaptureError>
    where
        A: FnOnce(&Arc<CameraSession>) -> bool,
    {
        info!("Capturing photo...");
        let session = self.open_attached(self.photo_constraints, attach).await?;

        let result = self.photo.capture(&session).await;
        self.sessions.close(&session);

        match result {
            Ok(blob) => {
                info!(size = blob.len(), "Photo captured");
                Ok(CapturedMedia {
                    kind: MediaKind::Photo,
                    blob,
                })
            }
            Err(e) => {
                error!(error = %e, "Photo capture failed");
                Err(e)
            }
        }
    }

    /// Open a session with audio, record for the fixed duration, close it
    ///
    /// `on_started` fires once the recorder is running.
    pub async fn record_video<A, F>(
        &self,
        attach: A,
        on_started: F,
    ) -> Result<CapturedMedia, CaptureError>
    where
        A: FnOnce(&Arc<CameraSession>) -> bool,
        F: FnOnce(),
    {
        info!(
            duration_ms = self.video.duration().as_millis(),
            "Recording video..."
        );
        let session = self.open_attached(self.video_constraints, attach).await?;

        let result = self.video.record(&session, on_started).await;
        self.sessions.close(&session);

        match result {
            Ok(blob) => {
                info!(size = blob.len(), "Video recorded");
                Ok(CapturedMedia {
                    kind: MediaKind::Video,
                    blob,
                })
            }
            Err(e) => {
                error!(error = %e, "Video recording failed");
                Err(e)
            }
        }
    }

    /// Length of a proof video
    pub fn video_duration(&self) -> std::time::Duration {
        self.video.duration()
    }
}
