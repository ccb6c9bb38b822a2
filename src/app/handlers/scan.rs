// SPDX-License-Identifier: GPL-3.0-only

//! Identifier handlers
//!
//! Handles barcode scanning and manual AWB entry.

use crate::app::state::{ScanCycle, ScanPhase};
use crate::app::{Workflow, abort_all, scan_loop};
use crate::constants::messages;
use crate::errors::InvalidCommand;
use tracing::info;

impl Workflow {
    // =========================================================================
    // Scan Handlers
    // =========================================================================

    /// Start a scan cycle
    ///
    /// Any capture in flight is cancelled first: the camera serves one
    /// command at a time and the latest command wins.
    pub fn start_scan(&self) -> Result<(), InvalidCommand> {
        let (cycle_id, stale) = self.shared.update(|state| {
            if state.scanning {
                return Err(InvalidCommand::AlreadyScanning);
            }
            let stale = state.cancel_capture();

            let cycle_id = state.next_id();
            state.scan_cycle = Some(ScanCycle::new(cycle_id));
            state.scanning = true;
            state.scan_phase = ScanPhase::Initializing;
            state.scan_message = messages::SCAN_INITIALIZING.to_string();
            state.status_message.clear();
            Ok((cycle_id, stale))
        })?;
        abort_all(stale);

        info!(cycle = cycle_id, "Starting barcode scan");
        let handle = tokio::spawn(scan_loop::run(self.shared.clone(), cycle_id));
        self.attach_task(handle, |state| {
            state
                .scan_cycle
                .as_mut()
                .filter(|c| c.id == cycle_id)
                .map(|c| &mut c.task)
        });
        Ok(())
    }

    /// Stop the running scan
    ///
    /// Closes the session and cancels the pending re-arm timer. A poll that
    /// is in flight when this runs is discarded.
    pub fn stop_scan(&self) -> Result<(), InvalidCommand> {
        let task = self.shared.update(|state| {
            if !state.scanning {
                return Err(InvalidCommand::NotScanning);
            }
            Ok(state.cancel_scan())
        })?;
        info!("Barcode scan stopped");
        abort_all(task);
        Ok(())
    }

    // =========================================================================
    // Manual Entry Handlers
    // =========================================================================

    /// Set the identifier from operator input
    ///
    /// The input is trimmed; blank input is rejected without touching the
    /// state. A running scan is stopped so it cannot overwrite the value.
    pub fn manual_entry(&self, input: &str) -> Result<(), InvalidCommand> {
        let identifier = input.trim();
        if identifier.is_empty() {
            return Err(InvalidCommand::EmptyIdentifier);
        }

        let task = self.shared.update(|state| {
            let task = state.cancel_scan();
            state.identifier = Some(identifier.to_string());
            state.status_message = messages::manual_awb(identifier);
            task
        });
        abort_all(task);

        info!(identifier, "Manual AWB entered");
        Ok(())
    }
}
