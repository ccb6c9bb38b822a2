// SPDX-License-Identifier: GPL-3.0-only

//! Staged upload pipeline
//!
//! The operator sees three staged statuses, each held for a fixed delay,
//! before the endpoint is called:
//!
//! ```text
//! Converting media → Connecting → Uploading → endpoint.upload()
//! ```

pub mod endpoint;

pub use endpoint::{
    HttpUploadEndpoint, SimulatedUploadEndpoint, UploadEndpoint, UploadMetadata, UploadReceipt,
};

use crate::constants::messages;
use crate::errors::UploadError;
use crate::storage::{MediaKind, ProofMedia};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Staged upload to an [`UploadEndpoint`]
#[derive(Clone)]
pub struct UploadPipeline {
    endpoint: Arc<dyn UploadEndpoint>,
    stage_delays: [Duration; 3],
}

impl UploadPipeline {
    pub fn new(endpoint: Arc<dyn UploadEndpoint>, stage_delays: [Duration; 3]) -> Self {
        Self {
            endpoint,
            stage_delays,
        }
    }

    /// Build from configuration: HTTP endpoint when a URL is set, simulated otherwise
    pub fn from_config(config: &crate::Config) -> Result<Self, UploadError> {
        let endpoint: Arc<dyn UploadEndpoint> = match &config.upload.url {
            Some(url) => Arc::new(HttpUploadEndpoint::new(
                url.clone(),
                config.upload_request_timeout(),
            )?),
            None => Arc::new(SimulatedUploadEndpoint),
        };
        Ok(Self::new(endpoint, config.upload_stage_delays()))
    }

    pub fn endpoint_name(&self) -> &str {
        self.endpoint.name()
    }

    /// Run the staged upload
    ///
    /// `on_status` receives each staged status message in order.
    pub async fn run<F>(
        &self,
        identifier: &str,
        media: &ProofMedia,
        mut on_status: F,
    ) -> Result<UploadReceipt, UploadError>
    where
        F: FnMut(&str),
    {
        let stages = [
            messages::UPLOAD_CONVERTING,
            messages::UPLOAD_CONNECTING,
            messages::UPLOAD_TRANSFERRING,
        ];

        for (stage, delay) in stages.into_iter().zip(self.stage_delays) {
            debug!(stage, delay_ms = delay.as_millis(), "Upload stage");
            on_status(stage);
            tokio::time::sleep(delay).await;
        }

        let metadata = UploadMetadata {
            identifier: identifier.to_string(),
            media_kind: media.kind,
            file_name: upload_file_name(
                identifier,
                media.kind,
                &media.payload.mime_type,
                chrono::Utc::now().timestamp_millis(),
            ),
        };

        info!(
            endpoint = self.endpoint.name(),
            file = %metadata.file_name,
            "Calling upload endpoint"
        );
        self.endpoint
            .upload(media.payload.clone(), metadata)
            .await
    }
}

impl std::fmt::Debug for UploadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPipeline")
            .field("endpoint", &self.endpoint.name())
            .field("stage_delays", &self.stage_delays)
            .finish()
    }
}

/// `pod_<awb>_<millis>.<ext>`, with the AWB reduced to filename-safe characters
pub fn upload_file_name(
    identifier: &str,
    kind: MediaKind,
    mime_type: &str,
    timestamp_millis: i64,
) -> String {
    let safe: String = identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "pod_{}_{}.{}",
        safe,
        timestamp_millis,
        extension_for(kind, mime_type)
    )
}

fn extension_for(kind: MediaKind, mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/x-motion-jpeg" => "mjpeg",
        _ => kind.extension(),
    }
}
