// SPDX-License-Identifier: GPL-3.0-only

//! Upload endpoints
//!
//! - [`HttpUploadEndpoint`]: multipart `POST` to a remote store
//! - [`SimulatedUploadEndpoint`]: accepts everything, for running without a backend

use crate::backends::camera::types::MediaBlob;
use crate::errors::UploadError;
use crate::storage::MediaKind;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Metadata sent alongside the media
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadMetadata {
    /// Shipment identifier (AWB)
    pub identifier: String,
    pub media_kind: MediaKind,
    /// File name the media is stored under
    pub file_name: String,
}

/// What the endpoint answered
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: String,
}

/// Remote store accepting proof media
pub trait UploadEndpoint: Send + Sync {
    /// Human readable name for logs
    fn name(&self) -> &str;

    /// Send `blob` with `metadata`; one attempt, no retry
    fn upload(
        &self,
        blob: MediaBlob,
        metadata: UploadMetadata,
    ) -> BoxFuture<'static, Result<UploadReceipt, UploadError>>;
}

/// Multipart HTTP endpoint
///
/// Sends `file`, `awbNumber` and `mediaType` form fields and expects an
/// optional JSON body `{ "message": ... }`.
#[derive(Debug, Clone)]
pub struct HttpUploadEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpUploadEndpoint {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl UploadEndpoint for HttpUploadEndpoint {
    fn name(&self) -> &str {
        "http"
    }

    fn upload(
        &self,
        blob: MediaBlob,
        metadata: UploadMetadata,
    ) -> BoxFuture<'static, Result<UploadReceipt, UploadError>> {
        let client = self.client.clone();
        let url = self.url.clone();

        Box::pin(async move {
            info!(
                url = %url,
                identifier = %metadata.identifier,
                file = %metadata.file_name,
                size = blob.len(),
                "Uploading proof media"
            );

            let part = reqwest::multipart::Part::bytes(blob.data.to_vec())
                .file_name(metadata.file_name.clone())
                .mime_str(&blob.mime_type)
                .map_err(|e| UploadError::Transport(format!("Invalid MIME type: {}", e)))?;
            let form = reqwest::multipart::Form::new()
                .part("file", part)
                .text("awbNumber", metadata.identifier.clone())
                .text("mediaType", metadata.media_kind.as_str());

            let res = client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| UploadError::Transport(format!("Request error: {}", e)))?;

            let status = res.status();
            let body = res
                .text()
                .await
                .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

            if !status.is_success() {
                warn!(status = status.as_u16(), "Upload rejected");
                let message = if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Upload rejected")
                        .to_string()
                } else {
                    body
                };
                return Err(UploadError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!(status = status.as_u16(), "Upload response received");
            parse_receipt(&body)
        })
    }
}

/// Parse an endpoint response body; an empty body is a bare success
fn parse_receipt(body: &str) -> Result<UploadReceipt, UploadError> {
    if body.trim().is_empty() {
        return Ok(UploadReceipt {
            message: String::new(),
        });
    }
    serde_json::from_str(body).map_err(|e| UploadError::InvalidResponse(e.to_string()))
}

/// Endpoint that accepts everything without network access
#[derive(Debug, Clone, Default)]
pub struct SimulatedUploadEndpoint;

impl UploadEndpoint for SimulatedUploadEndpoint {
    fn name(&self) -> &str {
        "simulated"
    }

    fn upload(
        &self,
        blob: MediaBlob,
        metadata: UploadMetadata,
    ) -> BoxFuture<'static, Result<UploadReceipt, UploadError>> {
        Box::pin(async move {
            info!(
                identifier = %metadata.identifier,
                file = %metadata.file_name,
                size = blob.len(),
                "Simulated upload accepted"
            );
            Ok(UploadReceipt {
                message: format!("Stored {}", metadata.file_name),
            })
        })
    }
}
