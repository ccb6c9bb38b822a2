// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The workflow never touches a platform camera API directly. It talks to a
//! [`CameraBackend`] that hands out [`MediaStream`]s, and every stream is
//! wrapped in a [`CameraSession`] by the [`CameraSessionManager`] so that it
//! is stopped exactly once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  Scan loop / capture ops     │
//! └──────────────┬───────────────┘
//!                │ open / close
//!                ▼
//! ┌──────────────────────────────┐
//! │   CameraSessionManager       │  ← live-session accounting, idempotent close
//! └──────────────┬───────────────┘
//!                │ acquire
//!                ▼
//! ┌──────────────────────────────┐
//! │   CameraBackend trait        │  ← common interface
//! └──────┬───────────────┬───────┘
//!        ▼               ▼
//!   ┌─────────┐    ┌───────────┐
//!   │  File   │    │ GStreamer │  (feature = "gstreamer")
//!   └─────────┘    └───────────┘
//! ```

#[cfg(feature = "gstreamer")]
pub mod live;
pub mod manager;
pub mod types;

pub use manager::{CameraSession, CameraSessionManager};
pub use types::*;

use crate::errors::CameraError;
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;

/// Result type for camera backend operations
pub type BackendResult<T> = Result<T, CameraError>;

/// Receiving end of a recorder's chunk callback
pub type ChunkSender = tokio::sync::mpsc::UnboundedSender<Vec<u8>>;

/// Camera backend trait
///
/// A backend only knows how to acquire streams. Everything about who owns a
/// stream and when it is stopped lives in [`CameraSessionManager`].
pub trait CameraBackend: Send + Sync {
    /// Human readable backend name for logs
    fn name(&self) -> &str;

    /// Request device access
    ///
    /// # Returns
    /// * `Ok(stream)` - Device acquired, frames may take a while to arrive
    /// * `Err(CameraError::AccessDenied | CameraError::NoDevice)` - Platform refused
    fn acquire(
        &self,
        constraints: CameraConstraints,
    ) -> BoxFuture<'static, BackendResult<Box<dyn MediaStream>>>;
}

/// Narrow capability over an acquired platform stream
pub trait MediaStream: Send + Sync {
    /// Stop every track of the stream and release the device
    ///
    /// Called at most once per stream by [`CameraSession`].
    fn stop(&self);

    /// Whether a full frame is available to grab
    fn is_frame_ready(&self) -> bool;

    /// Copy the current frame out of the stream
    ///
    /// Only meaningful after [`MediaStream::is_frame_ready`] returned true.
    /// Fails with [`CameraError::Disconnected`] when the device went away.
    fn grab_frame(&self) -> BackendResult<CameraFrame>;

    /// Start recording this stream
    ///
    /// Encoded chunks are pushed into `chunks` as they become available;
    /// the sender is dropped once the recorder is stopped and flushed.
    fn start_recording(&self, chunks: ChunkSender) -> BackendResult<Box<dyn MediaRecorder>>;
}

/// Running recorder attached to a stream
pub trait MediaRecorder: Send {
    /// MIME type of the assembled recording
    fn mime_type(&self) -> &str;

    /// Stop recording and flush the final chunk
    fn stop(self: Box<Self>) -> BoxFuture<'static, BackendResult<()>>;
}

/// Pick a backend
///
/// A still image `source` gives the file-backed virtual camera. Without a
/// source the live GStreamer backend is used when compiled in.
pub fn get_backend(source: Option<&Path>) -> BackendResult<Arc<dyn CameraBackend>> {
    if let Some(path) = source {
        let backend = crate::backends::virtual_camera::FileCameraBackend::from_path(path)?;
        return Ok(Arc::new(backend));
    }

    #[cfg(feature = "gstreamer")]
    {
        Ok(Arc::new(live::LiveCameraBackend::new()))
    }

    #[cfg(not(feature = "gstreamer"))]
    {
        Err(CameraError::NoDevice(
            "No live camera backend compiled in (enable the `gstreamer` feature or pass --source <image>)"
                .to_string(),
        ))
    }
}
