// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! Feeds the workflow from a file instead of a device. Used by the CLI's
//! `--source` option and handy for exercising the scan loop against a
//! printed label photographed earlier.

mod file_source;

pub use file_source::{FileCameraBackend, load_image_as_frame};
