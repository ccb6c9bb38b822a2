// SPDX-License-Identifier: GPL-3.0-only

//! Camera session lifecycle manager
//!
//! The manager provides:
//! - Session acquisition through the active backend
//! - Idempotent, deterministic release (explicit close or drop)
//! - Live-session accounting, so teardown can be verified

use super::types::*;
use super::{BackendResult, CameraBackend, ChunkSender, MediaRecorder, MediaStream};
use crate::errors::CameraError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// One acquired camera stream
///
/// Owned by whichever operation opened it. Closing is idempotent and also
/// happens on drop, so every exit path of the owner releases the device.
pub struct CameraSession {
    id: u64,
    stream: Box<dyn MediaStream>,
    active: AtomicBool,
    live: Arc<AtomicUsize>,
}

impl CameraSession {
    /// Session number (unique per manager)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the stream is still running
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether a full frame can be grabbed right now
    pub fn is_frame_ready(&self) -> bool {
        self.is_active() && self.stream.is_frame_ready()
    }

    /// Copy the current frame out of the stream
    pub fn grab_frame(&self) -> BackendResult<CameraFrame> {
        if !self.is_active() {
            return Err(CameraError::Disconnected(
                "Camera session is closed".to_string(),
            ));
        }
        self.stream.grab_frame()
    }

    /// Attach a recorder to the stream
    pub fn start_recording(&self, chunks: ChunkSender) -> BackendResult<Box<dyn MediaRecorder>> {
        if !self.is_active() {
            return Err(CameraError::Disconnected(
                "Camera session is closed".to_string(),
            ));
        }
        self.stream.start_recording(chunks)
    }

    /// Stop the stream
    ///
    /// Returns `true` if this call actually released the device, `false` if
    /// the session was already closed.
    pub fn close(&self) -> bool {
        if self.active.swap(false, Ordering::SeqCst) {
            self.stream.stop();
            self.live.fetch_sub(1, Ordering::SeqCst);
            debug!(session = self.id, "Camera session closed");
            true
        } else {
            false
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.close() {
            debug!(session = self.id, "Camera session released on drop");
        }
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Camera session manager
///
/// Cheap to clone; clones share the backend and the session counters.
#[derive(Clone)]
pub struct CameraSessionManager {
    backend: Arc<dyn CameraBackend>,
    live: Arc<AtomicUsize>,
    opened: Arc<AtomicU64>,
}

impl CameraSessionManager {
    /// Create a new session manager on top of a backend
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        info!(backend = backend.name(), "Creating camera session manager");
        Self {
            backend,
            live: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquire a stream matching `constraints`
    ///
    /// The platform error message is passed through untouched so the caller
    /// can display it.
    pub async fn open(&self, constraints: CameraConstraints) -> BackendResult<CameraSession> {
        info!(constraints = %constraints, backend = self.backend.name(), "Opening camera session");

        let stream = self.backend.acquire(constraints).await.inspect_err(|e| {
            warn!(error = %e, "Camera acquisition failed");
        })?;

        let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        if live > 1 {
            // Capture and scan are serialized at the command layer, so this
            // means a session leaked somewhere.
            warn!(live, "More than one camera session is live");
        }
        debug!(session = id, "Camera session opened");

        Ok(CameraSession {
            id,
            stream,
            active: AtomicBool::new(true),
            live: Arc::clone(&self.live),
        })
    }

    /// Close a session; no-op when it is already closed
    pub fn close(&self, session: &CameraSession) {
        session.close();
    }

    /// Number of sessions currently open
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Number of sessions opened since creation
    pub fn sessions_opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CameraSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSessionManager")
            .field("backend", &self.backend.name())
            .field("live_sessions", &self.live_sessions())
            .finish()
    }
}
