// SPDX-License-Identifier: MPL-2.0

//! Video proof pipeline
//!
//! Recording is fixed-length: the recorder is stopped by its timer, never by
//! the operator.

pub mod recorder;

pub use recorder::VideoRecorder;
