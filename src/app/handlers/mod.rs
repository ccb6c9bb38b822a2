// SPDX-License-Identifier: GPL-3.0-only

//! Command handler modules
//!
//! This module organizes command handlers by functional domain,
//! keeping related functionality together for easier maintenance.

mod capture;
mod scan;
mod upload;
