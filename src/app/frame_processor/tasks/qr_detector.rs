// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoding
//!
//! This module implements QR code decoding using the rqrr crate.
//! Frames are converted to luminance (stride padding skipped) and
//! downscaled when larger than the configured maximum dimension, since
//! AWB labels fill a good part of the frame and decode fine at 640px.

use crate::app::frame_processor::BarcodeDecoder;
use crate::app::frame_processor::types::Decoded;
use crate::backends::camera::types::CameraFrame;
use tracing::{debug, trace};

/// QR code decoder
pub struct QrDecoder {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: crate::constants::decoder::MAX_DIMENSION,
        }
    }

    /// Create a QR decoder with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Decode a tightly packed RGBA buffer
    pub fn decode_rgba(&self, pixels: &[u8], width: u32, height: u32) -> Option<String> {
        let frame = CameraFrame::from_rgba(width, height, pixels.to_vec());
        decode_sync(&frame, self.max_dimension).map(|d| d.text)
    }
}

impl BarcodeDecoder for QrDecoder {
    fn decode(&self, frame: &CameraFrame) -> Option<Decoded> {
        decode_sync(frame, self.max_dimension)
    }
}

/// Synchronous QR decoding of one frame
fn decode_sync(frame: &CameraFrame, max_dimension: u32) -> Option<Decoded> {
    if !frame.is_complete() {
        debug!(
            width = frame.width,
            height = frame.height,
            len = frame.data.len(),
            "Skipping incomplete frame"
        );
        return None;
    }

    let start = std::time::Instant::now();
    let width = frame.width;
    let height = frame.height;

    let luma = luminance_plane(frame);

    let (luma, proc_width, proc_height) = if width > max_dimension || height > max_dimension {
        let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
        let new_width = ((width as f32 / scale) as u32).max(1);
        let new_height = ((height as f32 / scale) as u32).max(1);
        (
            downscale_luma(&luma, width, height, new_width, new_height),
            new_width,
            new_height,
        )
    } else {
        (luma, width, height)
    };

    trace!(
        proc_width,
        proc_height,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared luminance plane"
    );

    let w = proc_width as usize;
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(w, proc_height as usize, |x, y| {
            luma[y * w + x]
        });
    let grids = prepared.detect_grids();

    trace!(
        count = grids.len(),
        detection_ms = start.elapsed().as_millis(),
        "QR grid detection complete"
    );

    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => {
                debug!(
                    content = %content,
                    total_ms = start.elapsed().as_millis(),
                    "Decoded QR code"
                );
                return Some(Decoded { text: content });
            }
            Err(e) => {
                debug!(error = %e, "Failed to decode QR grid");
            }
        }
    }

    None
}

/// Convert an RGBA frame to a packed luminance plane (BT.601 weights)
fn luminance_plane(frame: &CameraFrame) -> Vec<u8> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;

    let mut result = Vec::with_capacity(width * height);

    for y in 0..height {
        let row = &frame.data[y * stride..y * stride + width * 4];
        for px in row.chunks_exact(4) {
            let luma = (px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000;
            result.push(luma as u8);
        }
    }

    result
}

/// Downscale a luminance plane using bilinear interpolation
fn downscale_luma(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Vec<u8> {
    let src_width = src_width as usize;
    let src_height = src_height as usize;

    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    let get_pixel = |px: usize, py: usize| -> f32 {
        src.get(py * src_width + px).copied().unwrap_or(0) as f32
    };

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = (src_x as usize).min(src_width - 1);
            let y0 = (src_y as usize).min(src_height - 1);
            let x1 = (x0 + 1).min(src_width - 1);
            let y1 = (y0 + 1).min(src_height - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let value = get_pixel(x0, y0) * (1.0 - x_frac) * (1.0 - y_frac)
                + get_pixel(x1, y0) * x_frac * (1.0 - y_frac)
                + get_pixel(x0, y1) * (1.0 - x_frac) * y_frac
                + get_pixel(x1, y1) * x_frac * y_frac;

            result.push(value as u8);
        }
    }

    result
}
