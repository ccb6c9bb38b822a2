// SPDX-License-Identifier: GPL-3.0-only

//! Workflow state
//!
//! [`WorkflowState`] is the single mutable hub of the workflow. It lives
//! behind one mutex; the scan loop, capture tasks and upload tasks all
//! mutate it through that lock and never hold references to each other.

use crate::backends::camera::CameraSession;
use crate::storage::{MediaKind, ProofMedia};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::AbortHandle;

/// Operator commands, the only trigger of state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    StartScan,
    StopScan,
    ManualEntry,
    CapturePhoto,
    RecordVideo,
    Upload,
    Reset,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::StartScan,
        Command::StopScan,
        Command::ManualEntry,
        Command::CapturePhoto,
        Command::RecordVideo,
        Command::Upload,
        Command::Reset,
    ];
}

/// Scan loop lifecycle
///
/// ```text
/// Idle → Initializing → Polling → { Resolved | Cancelled | Failed }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    Initializing,
    Polling,
    Resolved,
    Cancelled,
    Failed,
}

impl ScanPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanPhase::Resolved | ScanPhase::Cancelled | ScanPhase::Failed
        )
    }
}

/// One run of the scan loop
///
/// The cycle only observes the session (weakly); the scan task owns it.
/// `task` is the handle of the scan task, which also carries the single
/// pending re-arm timer, so aborting it cancels that timer.
pub(crate) struct ScanCycle {
    pub id: u64,
    pub cancelled: Arc<AtomicBool>,
    pub session: Weak<CameraSession>,
    pub task: Option<AbortHandle>,
}

impl ScanCycle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
            session: Weak::new(),
            task: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Flag the cycle, close its session and hand back the task to abort
    ///
    /// Called with the state lock held, so an in-flight poll that checks the
    /// flag afterwards always loses. The returned handle is aborted after the
    /// lock is released.
    pub fn close(mut self) -> Option<AbortHandle> {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(session) = self.session.upgrade() {
            session.close();
        }
        self.task.take()
    }
}

/// A spawned capture or upload, identified so late completions can be told apart
///
/// A capture records its session here once acquired, so the session can be
/// closed under the state lock instead of whenever the aborted task drops.
pub(crate) struct TaskSlot {
    pub id: u64,
    pub handle: Option<AbortHandle>,
    pub session: Weak<CameraSession>,
}

impl TaskSlot {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            handle: None,
            session: Weak::new(),
        }
    }

    /// Close the slot's session and hand back the task to abort
    pub fn close(self) -> Option<AbortHandle> {
        if let Some(session) = self.session.upgrade() {
            session.close();
        }
        self.handle
    }
}

/// Everything the workflow knows
#[derive(Default)]
pub struct WorkflowState {
    pub identifier: Option<String>,
    pub media: Option<ProofMedia>,
    pub scanning: bool,
    pub uploading: bool,
    pub status_message: String,
    pub scan_message: String,
    pub scan_phase: ScanPhase,
    pub(crate) scan_cycle: Option<ScanCycle>,
    pub(crate) capture: Option<TaskSlot>,
    pub(crate) upload: Option<TaskSlot>,
    next_id: u64,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh id for a scan cycle, capture or upload
    pub(crate) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Kind of the current proof media
    pub fn media_type(&self) -> Option<MediaKind> {
        self.media.as_ref().map(|m| m.kind)
    }

    /// End the live scan cycle, if any, as cancelled
    pub(crate) fn cancel_scan(&mut self) -> Option<AbortHandle> {
        let task = self.scan_cycle.take().and_then(ScanCycle::close);
        if self.scanning {
            self.scanning = false;
            self.scan_phase = ScanPhase::Cancelled;
            self.scan_message.clear();
        }
        task
    }

    /// End the capture in flight, closing its session
    pub(crate) fn cancel_capture(&mut self) -> Option<AbortHandle> {
        self.capture.take().and_then(TaskSlot::close)
    }

    /// End the scan cycle and every in-flight capture and upload
    ///
    /// Returns the task handles to abort once the lock is released.
    pub(crate) fn cancel_all(&mut self) -> Vec<AbortHandle> {
        let mut tasks: Vec<AbortHandle> = self.cancel_scan().into_iter().collect();
        tasks.extend(self.cancel_capture());
        tasks.extend(self.upload.take().and_then(TaskSlot::close));
        self.uploading = false;
        tasks
    }

    /// Return every field to its initial value
    ///
    /// Tasks must have been cancelled first. The id counter keeps running so
    /// results of tasks from before the reset stay distinguishable.
    pub(crate) fn clear(&mut self) {
        let next_id = self.next_id;
        *self = Self {
            next_id,
            ..Self::default()
        };
    }

    pub fn capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// Whether `cycle_id` is still the live, uncancelled scan cycle
    pub(crate) fn is_scan_live(&self, cycle_id: u64) -> bool {
        self.scan_cycle
            .as_ref()
            .is_some_and(|c| c.id == cycle_id && !c.is_cancelled())
    }

    pub(crate) fn is_capture_current(&self, capture_id: u64) -> bool {
        self.capture.as_ref().is_some_and(|c| c.id == capture_id)
    }

    pub(crate) fn is_upload_current(&self, upload_id: u64) -> bool {
        self.upload.as_ref().is_some_and(|u| u.id == upload_id)
    }

    /// Whether `command` may be issued right now
    pub fn is_enabled(&self, command: Command) -> bool {
        match command {
            Command::StartScan => !self.scanning,
            Command::StopScan => self.scanning,
            Command::Upload => {
                self.identifier.is_some() && self.media.is_some() && !self.uploading
            }
            Command::ManualEntry
            | Command::CapturePhoto
            | Command::RecordVideo
            | Command::Reset => true,
        }
    }

    pub fn enabled_commands(&self) -> Vec<Command> {
        Command::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            identifier: self.identifier.clone(),
            media_type: self.media_type(),
            preview_uri: self.media.as_ref().map(|m| m.preview_uri.clone()),
            media_size: self.media.as_ref().map(|m| m.payload.len()),
            scanning: self.scanning,
            uploading: self.uploading,
            capturing: self.capturing(),
            scan_phase: self.scan_phase,
            status_message: self.status_message.clone(),
            scan_message: self.scan_message.clone(),
            enabled: self.enabled_commands(),
        }
    }
}

impl std::fmt::Debug for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowState")
            .field("identifier", &self.identifier)
            .field("media_type", &self.media_type())
            .field("scanning", &self.scanning)
            .field("uploading", &self.uploading)
            .field("scan_phase", &self.scan_phase)
            .field("status_message", &self.status_message)
            .field("scan_message", &self.scan_message)
            .finish()
    }
}

/// Read-only view of [`WorkflowState`] published to observers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowSnapshot {
    pub identifier: Option<String>,
    pub media_type: Option<MediaKind>,
    pub preview_uri: Option<String>,
    pub media_size: Option<usize>,
    pub scanning: bool,
    pub uploading: bool,
    pub capturing: bool,
    pub scan_phase: ScanPhase,
    pub status_message: String,
    pub scan_message: String,
    pub enabled: Vec<Command>,
}

impl WorkflowSnapshot {
    pub fn is_enabled(&self, command: Command) -> bool {
        self.enabled.contains(&command)
    }
}
