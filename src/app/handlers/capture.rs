// SPDX-License-Identifier: GPL-3.0-only

//! Capture operations handlers
//!
//! Handles photo capture and video recording. Each capture runs on its own
//! task with its own camera session; the result replaces any earlier proof.

use crate::app::state::TaskSlot;
use crate::app::{Shared, Workflow, abort_all};
use crate::backends::camera::CameraSession;
use crate::constants::messages;
use crate::errors::CaptureError;
use crate::pipelines::CapturedMedia;
use crate::storage::{MediaKind, ProofMedia};
use std::sync::Arc;
use tracing::{debug, error, info};

impl Workflow {
    // =========================================================================
    // Capture Operations Handlers
    // =========================================================================

    /// Capture a still photo as proof
    pub fn capture_photo(&self) {
        self.start_capture(MediaKind::Photo);
    }

    /// Record a fixed-length video as proof
    pub fn record_video(&self) {
        self.start_capture(MediaKind::Video);
    }

    /// Cancel whatever holds the camera and spawn the capture task
    fn start_capture(&self, kind: MediaKind) {
        let (capture_id, stale) = self.shared.update(|state| {
            let mut stale: Vec<_> = state.cancel_scan().into_iter().collect();
            if let Some(previous) = state.capture.as_ref() {
                debug!(capture = previous.id, "Superseding capture in flight");
            }
            stale.extend(state.cancel_capture());
            let capture_id = state.next_id();
            state.capture = Some(TaskSlot::new(capture_id));
            (capture_id, stale)
        });
        abort_all(stale);

        info!(capture = capture_id, kind = %kind, "Starting capture");
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            let _guard = CaptureGuard {
                shared: shared.clone(),
                capture_id,
            };
            let attach = |session: &Arc<CameraSession>| {
                shared.attach_capture_session(capture_id, session)
            };
            let result = match kind {
                MediaKind::Photo => shared.capture.capture_photo(attach).await,
                MediaKind::Video => {
                    let notify = shared.clone();
                    shared
                        .capture
                        .record_video(attach, move || notify.recording_started(capture_id))
                        .await
                }
            };
            shared.finish_capture(capture_id, result);
        });
        self.attach_task(handle, |state| {
            state
                .capture
                .as_mut()
                .filter(|c| c.id == capture_id)
                .map(|c| &mut c.handle)
        });
    }
}

impl Shared {
    /// Record the capture's session on its slot
    ///
    /// Returns `false` when the capture was cancelled while acquiring.
    fn attach_capture_session(&self, capture_id: u64, session: &Arc<CameraSession>) -> bool {
        let mut state = self.lock();
        match state.capture.as_mut().filter(|c| c.id == capture_id) {
            Some(slot) => {
                slot.session = Arc::downgrade(session);
                true
            }
            None => false,
        }
    }

    fn recording_started(&self, capture_id: u64) {
        let duration = self.capture.video_duration();
        self.update(|state| {
            if state.is_capture_current(capture_id) {
                state.status_message = messages::video_recording(duration);
            }
        });
    }

    /// Publish a capture result, unless the capture was superseded
    fn finish_capture(&self, capture_id: u64, result: Result<CapturedMedia, CaptureError>) {
        self.update(|state| {
            if !state.is_capture_current(capture_id) {
                debug!(capture = capture_id, "Discarding result of a cancelled capture");
                return;
            }
            state.capture = None;

            match result {
                Ok(CapturedMedia { kind, blob }) => {
                    let preview_uri = self.previews.register(blob.clone());
                    let previous = state.media.replace(ProofMedia {
                        kind,
                        payload: blob,
                        preview_uri,
                    });
                    if let Some(previous) = previous {
                        self.previews.revoke(&previous.preview_uri);
                    }
                    state.status_message = match kind {
                        MediaKind::Photo => messages::PHOTO_CAPTURED,
                        MediaKind::Video => messages::VIDEO_RECORDED,
                    }
                    .to_string();
                    info!(capture = capture_id, kind = %kind, "Proof media ready");
                }
                Err(CaptureError::Camera(e)) => {
                    error!(capture = capture_id, error = %e, "Error accessing camera");
                    state.status_message = messages::camera_access_error(e.message());
                }
                Err(e) => {
                    error!(capture = capture_id, error = %e, "Capture failed");
                    state.status_message = messages::capture_failed(&e.to_string());
                }
            }
        });
    }
}

/// Frees the capture slot if the task ends without reporting
struct CaptureGuard {
    shared: Arc<Shared>,
    capture_id: u64,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let capture_id = self.capture_id;
        self.shared.update(|state| {
            if state.is_capture_current(capture_id) {
                state.capture = None;
            }
        });
    }
}
