// SPDX-License-Identifier: MPL-2.0

//! Captured proof media and preview handles
//!
//! A presentation layer shows the captured photo or video through an opaque
//! preview URI. The [`PreviewStore`] issues those URIs and keeps the blob
//! alive until the URI is revoked, which happens whenever the proof is
//! replaced or the workflow is reset.

use crate::backends::camera::types::MediaBlob;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// URI scheme prefix of preview handles
const PREVIEW_URI_PREFIX: &str = "blob:pod/";

/// Kind of proof media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Lowercase name used in status text and upload metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    /// File extension used for uploaded files
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Photo => "jpg",
            MediaKind::Video => "webm",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The captured delivery proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofMedia {
    pub kind: MediaKind,
    pub payload: MediaBlob,
    pub preview_uri: String,
}

/// Registry of live preview URIs
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<String, MediaBlob>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return its preview URI
    pub fn register(&self, blob: MediaBlob) -> String {
        let uri = format!("{}{}", PREVIEW_URI_PREFIX, uuid::Uuid::new_v4());
        debug!(uri = %uri, size = blob.len(), "Preview registered");
        self.lock().insert(uri.clone(), blob);
        uri
    }

    /// Look up the blob behind a preview URI
    pub fn resolve(&self, uri: &str) -> Option<MediaBlob> {
        self.lock().get(uri).cloned()
    }

    /// Release a preview URI; unknown URIs are ignored
    pub fn revoke(&self, uri: &str) -> bool {
        let removed = self.lock().remove(uri).is_some();
        if removed {
            debug!(uri = %uri, "Preview revoked");
        }
        removed
    }

    /// Number of live preview URIs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MediaBlob>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
