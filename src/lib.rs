// SPDX-License-Identifier: MPL-2.0

//! pod-capture - proof-of-delivery capture workflow
//!
//! This library lets a field operative resolve a shipment identifier (AWB)
//! by scanning a QR code or typing it in, capture a photo or a short video
//! as delivery proof, and upload that proof to a remote store.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Workflow state machine, scan loop and barcode decoding
//! - [`backends`]: Camera backend abstraction and session lifecycle
//! - [`pipelines`]: Photo capture, video recording and staged upload
//! - [`config`]: User configuration handling
//! - [`storage`]: Proof media and preview handles
//!
//! # Example
//!
//! ```no_run
//! use pod_capture::{Config, Workflow, backends::camera::get_backend};
//! use std::path::Path;
//!
//! # async fn demo() -> pod_capture::errors::AppResult<()> {
//! let config = Config::load()?;
//! let backend = get_backend(Some(Path::new("label.png")))?;
//! let workflow = Workflow::from_config(backend, &config)?;
//!
//! let mut updates = workflow.subscribe();
//! workflow.start_scan()?;
//! updates.wait_for(|s| s.identifier.is_some()).await.ok();
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use app::{Command, ScanPhase, Workflow, WorkflowSnapshot};
pub use config::Config;
pub use storage::{MediaKind, ProofMedia};
