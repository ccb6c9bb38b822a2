// SPDX-License-Identifier: GPL-3.0-only

//! Async photo encoding
//!
//! Turns an RGBA camera frame into a still-image blob:
//! - JPEG (with quality control, default for proof photos)
//! - PNG (lossless)
//!
//! Encoding runs on the blocking pool so the scan loop and timers keep
//! ticking while a large frame is compressed.

use crate::backends::camera::types::{CameraFrame, MediaBlob};
use crate::errors::CaptureError;
use image::{ImageFormat, RgbImage, RgbaImage};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    /// MIME type of encoded data
    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "image/jpeg",
            EncodingFormat::Png => "image/png",
        }
    }
}

/// Photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    jpeg_quality: u8,
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoEncoder {
    /// Create a new encoder with JPEG format and the default proof quality
    pub fn new() -> Self {
        Self {
            format: EncodingFormat::Jpeg,
            jpeg_quality: crate::constants::camera::PHOTO_JPEG_QUALITY,
        }
    }

    /// Set encoding format
    pub fn with_format(mut self, format: EncodingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set JPEG quality (1-100, ignored for PNG)
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Encode a frame asynchronously
    ///
    /// # Returns
    /// * `Ok(MediaBlob)` - Encoded still image
    /// * `Err(CaptureError::EncodingFailed)` - Frame was malformed or the codec failed
    pub async fn encode(&self, frame: CameraFrame) -> Result<MediaBlob, CaptureError> {
        info!(
            width = frame.width,
            height = frame.height,
            format = ?self.format,
            "Starting encoding"
        );

        let encoder = *self;

        // Run encoding in background task (CPU-bound)
        tokio::task::spawn_blocking(move || encoder.encode_sync(&frame))
            .await
            .map_err(|e| CaptureError::EncodingFailed(format!("Encoding task error: {}", e)))?
    }

    /// Encode a frame on the current thread
    pub fn encode_sync(&self, frame: &CameraFrame) -> Result<MediaBlob, CaptureError> {
        let data = match self.format {
            EncodingFormat::Jpeg => encode_jpeg(frame, self.jpeg_quality)?,
            EncodingFormat::Png => encode_png(frame)?,
        };

        debug!(size = data.len(), "Encoding complete");
        Ok(MediaBlob::new(data, self.format.mime_type()))
    }
}

fn to_rgba_image(frame: &CameraFrame) -> Result<RgbaImage, CaptureError> {
    if !frame.is_complete() {
        return Err(CaptureError::EncodingFailed(format!(
            "Incomplete {}x{} frame ({} bytes)",
            frame.width,
            frame.height,
            frame.data.len()
        )));
    }
    RgbaImage::from_raw(frame.width, frame.height, frame.to_packed_rgba()).ok_or_else(|| {
        CaptureError::EncodingFailed("RGBA data does not match frame dimensions".to_string())
    })
}

/// Encode an RGBA frame as JPEG (alpha is dropped)
pub fn encode_jpeg(frame: &CameraFrame, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let rgb: RgbImage = image::DynamicImage::ImageRgba8(to_rgba_image(frame)?).to_rgb8();

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    // Create JPEG encoder with quality setting
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);

    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CaptureError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    Ok(buffer)
}

/// Encode an RGBA frame as PNG
pub fn encode_png(frame: &CameraFrame) -> Result<Vec<u8>, CaptureError> {
    let rgba = to_rgba_image(frame)?;
    let mut buffer = Vec::new();

    rgba.write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| CaptureError::EncodingFailed(format!("PNG encoding failed: {}", e)))?;

    Ok(buffer)
}
