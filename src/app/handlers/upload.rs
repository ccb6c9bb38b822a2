// SPDX-License-Identifier: GPL-3.0-only

//! Upload and reset handlers

use crate::app::state::TaskSlot;
use crate::app::{Shared, Workflow, abort_all};
use crate::constants::messages;
use crate::errors::{InvalidCommand, UploadError};
use crate::pipelines::upload::UploadReceipt;
use crate::storage::MediaKind;
use std::sync::Arc;
use tracing::{debug, error, info};

impl Workflow {
    // =========================================================================
    // Upload Handlers
    // =========================================================================

    /// Upload the current proof for the current identifier
    ///
    /// Enabled only when both are set and no upload is running.
    pub fn upload(&self) -> Result<(), InvalidCommand> {
        let (upload_id, identifier, media) = self.shared.update(|state| {
            if state.uploading {
                return Err(InvalidCommand::AlreadyUploading);
            }
            let (Some(identifier), Some(media)) = (state.identifier.clone(), state.media.clone())
            else {
                return Err(InvalidCommand::UploadNotReady);
            };

            let upload_id = state.next_id();
            state.upload = Some(TaskSlot::new(upload_id));
            state.uploading = true;
            state.status_message = messages::UPLOAD_STARTED.to_string();
            Ok((upload_id, identifier, media))
        })?;

        info!(
            upload = upload_id,
            identifier = %identifier,
            kind = %media.kind,
            size = media.payload.len(),
            "Starting upload"
        );

        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            let _guard = UploadGuard {
                shared: shared.clone(),
                upload_id,
            };
            let result = shared
                .upload
                .run(&identifier, &media, |stage| shared.upload_stage(upload_id, stage))
                .await;
            shared.finish_upload(upload_id, &identifier, media.kind, result);
        });
        self.attach_task(handle, |state| {
            state
                .upload
                .as_mut()
                .filter(|u| u.id == upload_id)
                .map(|u| &mut u.handle)
        });
        Ok(())
    }

    // =========================================================================
    // Reset Handlers
    // =========================================================================

    /// Return to the initial state
    ///
    /// Cancels the scan, any capture and any upload in flight, closes every
    /// session and releases the preview of the current proof.
    pub fn reset(&self) {
        let tasks = self.shared.update(|state| {
            let tasks = state.cancel_all();
            if let Some(media) = state.media.take() {
                self.shared.previews.revoke(&media.preview_uri);
            }
            state.clear();
            tasks
        });
        info!(cancelled = tasks.len(), "Workflow reset");
        abort_all(tasks);
    }
}

impl Shared {
    fn upload_stage(&self, upload_id: u64, stage: &str) {
        self.update(|state| {
            if state.is_upload_current(upload_id) {
                state.status_message = stage.to_string();
            }
        });
    }

    fn finish_upload(
        &self,
        upload_id: u64,
        identifier: &str,
        kind: MediaKind,
        result: Result<UploadReceipt, UploadError>,
    ) {
        self.update(|state| {
            if !state.is_upload_current(upload_id) {
                debug!(upload = upload_id, "Discarding result of a cancelled upload");
                return;
            }
            state.upload = None;
            state.uploading = false;

            match result {
                Ok(receipt) => {
                    info!(
                        upload = upload_id,
                        identifier,
                        response = %receipt.message,
                        "Upload succeeded"
                    );
                    state.status_message = messages::upload_succeeded(kind.as_str(), identifier);
                }
                Err(e) => {
                    error!(upload = upload_id, error = %e, "Upload failed");
                    state.status_message = messages::upload_failed(&e.to_string());
                }
            }
        });
    }
}

/// Clears `uploading` on every exit path of the upload task
struct UploadGuard {
    shared: Arc<Shared>,
    upload_id: u64,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        let upload_id = self.upload_id;
        self.shared.update(|state| {
            if state.is_upload_current(upload_id) {
                debug!(upload = upload_id, "Upload ended without a result");
                state.upload = None;
                state.uploading = false;
                let error = UploadError::Aborted("upload task ended".to_string());
                state.status_message = messages::upload_failed(&error.to_string());
            }
        });
    }
}
