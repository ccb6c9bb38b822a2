// SPDX-License-Identifier: MPL-2.0

//! Capture and upload pipelines
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera       │ ──▶ │  Photo Pipeline   │ ──▶ │  JPEG blob   │
//! │ session      │     │  - first frame    │     │              │
//! │              │     │  - encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera       │ ──▶ │  Video Recorder   │ ──▶ │  Video blob  │
//! │ session+mic  │     │  - fixed duration │     │              │
//! │              │     │  - chunk assembly │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Proof media  │ ──▶ │  Upload Pipeline  │ ──▶ │   Endpoint   │
//! │ + AWB        │     │  - staged status  │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! Every capture opens its own short-lived session and closes it on all
//! exit paths; none of them reuse the scan loop's session.
//!
//! # Modules
//!
//! - [`photo`]: First-frame capture and still encoding
//! - [`video`]: Fixed-duration recording
//! - [`upload`]: Staged upload to the remote store
//! - [`controller`]: One-shot capture operations over the session manager

pub mod controller;
pub mod photo;
pub mod upload;
pub mod video;

pub use controller::{CapturedMedia, CaptureController};
