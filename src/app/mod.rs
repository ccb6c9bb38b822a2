// SPDX-License-Identifier: MPL-2.0

//! Proof-of-delivery workflow
//!
//! This module contains the workflow state machine and the scan loop that
//! feeds it.
//!
//! # Architecture
//!
//! - `state`: Workflow state, scan cycles, commands and snapshots
//! - `frame_processor`: Barcode decoding of camera frames
//! - `scan_loop`: Cancellable frame polling for the scanner
//! - `handlers`: Command handlers, grouped by domain
//!
//! # Main Types
//!
//! - [`Workflow`]: Owns the state and executes operator commands
//! - [`WorkflowSnapshot`]: Read-only view broadcast to observers
//! - [`Command`]: Operator commands and their availability
//!
//! Commands return immediately. Long-running work (scanning, capture,
//! upload) runs on spawned tokio tasks that report back through the shared
//! state, so every command must be issued from within a tokio runtime.

pub mod frame_processor;
mod handlers;
mod scan_loop;
pub mod state;

pub use frame_processor::{BarcodeDecoder, Decoded, QrDecoder};
pub use state::{Command, ScanPhase, WorkflowSnapshot, WorkflowState};

use crate::backends::camera::{CameraBackend, CameraConstraints, CameraSessionManager};
use crate::config::Config;
use crate::errors::AppResult;
use crate::pipelines::CaptureController;
use crate::pipelines::upload::UploadPipeline;
use crate::storage::PreviewStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::info;

/// Everything the spawned tasks share with the [`Workflow`]
pub(crate) struct Shared {
    state: Mutex<WorkflowState>,
    sessions: CameraSessionManager,
    decoder: Arc<dyn BarcodeDecoder>,
    capture: CaptureController,
    upload: UploadPipeline,
    previews: PreviewStore,
    scan_constraints: CameraConstraints,
    scan_interval: Duration,
    snapshots: watch::Sender<WorkflowSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the state under the lock and publish the new snapshot
    ///
    /// Observers are only woken when the snapshot actually changed.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut WorkflowState) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        let snapshot = state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        result
    }
}

/// Abort tasks handed back by a state transition
///
/// Always called after the state lock is released.
fn abort_all(tasks: impl IntoIterator<Item = AbortHandle>) {
    for task in tasks {
        task.abort();
    }
}

/// The proof-of-delivery workflow
///
/// Single source of truth for the identifier, the proof media and the
/// scanning/uploading flags. Dropping the workflow cancels everything it
/// started and closes every camera session.
pub struct Workflow {
    shared: Arc<Shared>,
}

impl Workflow {
    /// Create a workflow over explicit components
    pub fn new(
        sessions: CameraSessionManager,
        decoder: Arc<dyn BarcodeDecoder>,
        upload: UploadPipeline,
        config: &Config,
    ) -> Self {
        let state = WorkflowState::new();
        let (snapshots, _) = watch::channel(state.snapshot());

        info!(
            upload_endpoint = upload.endpoint_name(),
            scan_interval_ms = config.scan_interval_ms,
            "Creating workflow"
        );

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                capture: CaptureController::from_config(sessions.clone(), config),
                sessions,
                decoder,
                upload,
                previews: PreviewStore::new(),
                scan_constraints: config.constraints(false),
                scan_interval: config.scan_interval(),
                snapshots,
            }),
        }
    }

    /// Create a workflow with the QR decoder and the configured upload endpoint
    pub fn from_config(backend: Arc<dyn CameraBackend>, config: &Config) -> AppResult<Self> {
        let upload = UploadPipeline::from_config(config)?;
        Ok(Self::new(
            CameraSessionManager::new(backend),
            Arc::new(QrDecoder::new()),
            upload,
            config,
        ))
    }

    /// Observe state changes
    ///
    /// The receiver starts out marked as seen; the current value is
    /// available through `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Current state
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.shared.lock().snapshot()
    }

    /// Whether `command` may be issued right now
    pub fn is_enabled(&self, command: Command) -> bool {
        self.shared.lock().is_enabled(command)
    }

    /// Preview handles of captured media
    pub fn previews(&self) -> &PreviewStore {
        &self.shared.previews
    }

    /// Session manager shared by scanning and capture
    pub fn sessions(&self) -> &CameraSessionManager {
        &self.shared.sessions
    }

    /// Cancel every task and close every session, keeping the last state
    pub fn shutdown(&self) {
        let tasks = self.shared.update(|state| state.cancel_all());
        if !tasks.is_empty() {
            info!(tasks = tasks.len(), "Shutting down workflow tasks");
        }
        abort_all(tasks);
    }

    /// Attach a spawned task's handle to the slot `attach` selects
    ///
    /// If the slot is already gone (the task finished or was superseded in
    /// the meantime), the task is aborted instead.
    fn attach_task(
        &self,
        handle: JoinHandle<()>,
        attach: impl FnOnce(&mut WorkflowState) -> Option<&mut Option<AbortHandle>>,
    ) {
        let abort = handle.abort_handle();
        let attached = self.shared.update(|state| match attach(state) {
            Some(slot) => {
                *slot = Some(abort);
                true
            }
            None => false,
        });
        if !attached {
            handle.abort();
        }
    }
}

impl Drop for Workflow {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("state", &*self.shared.lock())
            .field("sessions", &self.shared.sessions)
            .finish()
    }
}
