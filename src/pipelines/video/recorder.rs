// SPDX-License-Identifier: MPL-2.0

//! Timed video recording
//!
//! Attaches a recorder to a session, lets it run for a fixed duration, then
//! stops it and assembles whatever chunks it produced into one blob. Zero
//! chunks is a valid outcome and yields an empty blob.

use crate::backends::camera::CameraSession;
use crate::backends::camera::types::MediaBlob;
use crate::errors::CaptureError;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Fixed-duration video recorder
#[derive(Debug, Clone, Copy)]
pub struct VideoRecorder {
    duration: Duration,
}

impl VideoRecorder {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Record `session` for the configured duration
    ///
    /// `on_started` runs once the recorder is attached, before the timer.
    pub async fn record<F>(
        &self,
        session: &CameraSession,
        on_started: F,
    ) -> Result<MediaBlob, CaptureError>
    where
        F: FnOnce(),
    {
        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let recorder = session.start_recording(chunk_tx)?;
        let mime_type = recorder.mime_type().to_string();

        info!(
            session = session.id(),
            duration_ms = self.duration.as_millis(),
            mime = %mime_type,
            "Recording started"
        );
        on_started();

        tokio::time::sleep(self.duration).await;
        recorder.stop().await?;

        // Sender side is gone once the recorder flushed, so this terminates
        let mut chunks = Vec::new();
        while let Some(chunk) = chunk_rx.recv().await {
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
        }

        debug!(chunks = chunks.len(), "Assembling recording");
        let blob = MediaBlob::from_chunks(chunks, mime_type);
        info!(size = blob.len(), "Recording finished");
        Ok(blob)
    }
}

impl Default for VideoRecorder {
    fn default() -> Self {
        Self::new(crate::constants::timing::VIDEO_DURATION)
    }
}
