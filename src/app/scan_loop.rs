// SPDX-License-Identifier: GPL-3.0-only

//! Scan loop
//!
//! One spawned task per scan cycle:
//!
//! ```text
//! acquire ──▶ poll ──▶ decode ──▶ complete_poll ──┬──▶ sleep(interval) ──▶ poll ...
//!                                                 └──▶ done (resolved / failed / cancelled)
//! ```
//!
//! Poll N+1 is only scheduled after poll N's state mutation finished, so
//! polls never overlap. Every mutation first checks, under the state lock,
//! that the cycle is still the live one; a stop or reset that happened while
//! a poll was in flight therefore always wins.

use super::Shared;
use super::frame_processor::BarcodeDecoder;
use super::state::ScanPhase;
use crate::backends::camera::CameraSession;
use crate::constants::messages;
use crate::errors::CameraError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one poll of the active session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// No full frame yet
    NotReady,
    /// Frame decoded, no code in it
    NoCode,
    /// Frame decoded to an identifier
    Decoded(String),
    /// The stream failed while grabbing
    Failed(CameraError),
}

/// Whether the loop goes on after a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Rearm,
    Finished,
}

/// Run one scan cycle to completion
pub(crate) async fn run(shared: Arc<Shared>, cycle_id: u64) {
    let session = match shared.sessions.open(shared.scan_constraints).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            shared.fail_scan(cycle_id, &e);
            return;
        }
    };

    if !shared.attach_session(cycle_id, &session) {
        debug!(cycle = cycle_id, "Scan cancelled during camera initialization");
        session.close();
        return;
    }

    loop {
        let outcome = poll_once(&session, &shared.decoder).await;
        match shared.complete_poll(cycle_id, outcome) {
            Verdict::Rearm => tokio::time::sleep(shared.scan_interval).await,
            Verdict::Finished => break,
        }
    }

    session.close();
}

/// Pull one frame from the session and decode it
///
/// Decoding runs on the blocking pool; a full-resolution frame takes tens
/// of milliseconds through rqrr.
pub(crate) async fn poll_once(
    session: &CameraSession,
    decoder: &Arc<dyn BarcodeDecoder>,
) -> PollOutcome {
    if !session.is_frame_ready() {
        return PollOutcome::NotReady;
    }

    let frame = match session.grab_frame() {
        Ok(frame) => frame,
        Err(e) => return PollOutcome::Failed(e),
    };

    let decoder = Arc::clone(decoder);
    let decoded = tokio::task::spawn_blocking(move || decoder.decode(&frame))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Barcode decode task panicked");
            None
        });

    match decoded {
        Some(decoded) if !decoded.text.trim().is_empty() => PollOutcome::Decoded(decoded.text),
        _ => PollOutcome::NoCode,
    }
}

impl Shared {
    /// Record the acquired session on the cycle and enter `Polling`
    ///
    /// Returns `false` when the cycle was cancelled while acquiring.
    fn attach_session(&self, cycle_id: u64, session: &Arc<CameraSession>) -> bool {
        self.update(|state| {
            if !state.is_scan_live(cycle_id) {
                return false;
            }
            if let Some(cycle) = state.scan_cycle.as_mut() {
                cycle.session = Arc::downgrade(session);
            }
            state.scan_phase = ScanPhase::Polling;
            state.scan_message = messages::SCAN_SCANNING.to_string();
            debug!(cycle = cycle_id, session = session.id(), "Scan polling started");
            true
        })
    }

    /// Acquisition failed: surface the platform message and end the cycle
    fn fail_scan(&self, cycle_id: u64, error: &CameraError) {
        self.update(|state| {
            if !state.is_scan_live(cycle_id) {
                debug!(cycle = cycle_id, "Discarding camera error of a stale scan");
                return;
            }
            warn!(cycle = cycle_id, error = %error, "Error accessing camera");
            // Our own task: nothing to abort
            let _ = state.scan_cycle.take().and_then(|cycle| cycle.close());
            state.scanning = false;
            state.scan_phase = ScanPhase::Failed;
            state.scan_message = messages::scan_camera_error(error.message());
            state.status_message = messages::camera_access_error(error.message());
        });
    }

    /// Apply a poll outcome, unless the cycle is no longer live
    pub(crate) fn complete_poll(&self, cycle_id: u64, outcome: PollOutcome) -> Verdict {
        self.update(|state| {
            if !state.is_scan_live(cycle_id) {
                debug!(cycle = cycle_id, ?outcome, "Discarding late poll result");
                return Verdict::Finished;
            }

            match outcome {
                PollOutcome::NotReady => {
                    state.scan_message = messages::SCAN_LOADING_FEED.to_string();
                    Verdict::Rearm
                }
                PollOutcome::NoCode => {
                    state.scan_message = messages::SCAN_SCANNING.to_string();
                    Verdict::Rearm
                }
                PollOutcome::Decoded(text) => {
                    info!(cycle = cycle_id, identifier = %text, "Barcode detected");
                    // Closes the session before anyone can observe the result
                    let _ = state.scan_cycle.take().and_then(|cycle| cycle.close());
                    state.scanning = false;
                    state.scan_phase = ScanPhase::Resolved;
                    state.scan_message = messages::scan_detected(&text);
                    state.status_message = messages::scanned_awb(&text);
                    state.identifier = Some(text);
                    Verdict::Finished
                }
                PollOutcome::Failed(error) => {
                    warn!(cycle = cycle_id, error = %error, "Camera failed while scanning");
                    let _ = state.scan_cycle.take().and_then(|cycle| cycle.close());
                    state.scanning = false;
                    state.scan_phase = ScanPhase::Failed;
                    state.scan_message = messages::scan_camera_error(error.message());
                    state.status_message = messages::camera_access_error(error.message());
                    Verdict::Finished
                }
            }
        })
    }
}
