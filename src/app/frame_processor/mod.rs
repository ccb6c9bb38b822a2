// SPDX-License-Identifier: MPL-2.0

//! Barcode decoding for the scan loop
//!
//! The scan loop hands every ready frame to a [`BarcodeDecoder`]. Decoding
//! is a pure function of the frame: no I/O, no retained state between calls,
//! and "nothing found" is `None` rather than an error.

pub mod tasks;
pub mod types;

pub use tasks::qr_detector::QrDecoder;
pub use types::Decoded;

use crate::backends::camera::types::CameraFrame;

/// Decodes one frame into an identifier
pub trait BarcodeDecoder: Send + Sync {
    /// First decodable code in `frame`, if any
    fn decode(&self, frame: &CameraFrame) -> Option<Decoded>;
}

impl<F> BarcodeDecoder for F
where
    F: Fn(&CameraFrame) -> Option<Decoded> + Send + Sync,
{
    fn decode(&self, frame: &CameraFrame) -> Option<Decoded> {
        self(frame)
    }
}
