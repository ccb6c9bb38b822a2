// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Towards the operator (laptop webcam, phone front camera)
    #[default]
    User,
    /// Away from the operator (phone rear camera)
    Environment,
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::User => write!(f, "user"),
            Facing::Environment => write!(f, "environment"),
        }
    }
}

/// Acquisition constraints
///
/// Width and height are ideals, not requirements; backends pick the closest
/// mode they have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
    /// Also open the microphone (video proof only)
    pub wants_audio: bool,
}

impl std::fmt::Display for CameraConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} ({}{})",
            self.ideal_width,
            self.ideal_height,
            self.facing,
            if self.wants_audio { ", audio" } else { "" }
        )
    }
}

/// A single RGBA frame
///
/// Rows may be padded: `stride` is the byte length of one row and can be
/// larger than `width * 4`.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub stride: u32,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed RGBA frame
    pub fn from_rgba(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// True when the buffer holds every row the dimensions promise
    pub fn is_complete(&self) -> bool {
        let needed = if self.height == 0 {
            0
        } else {
            self.stride as usize * (self.height as usize - 1) + self.width as usize * 4
        };
        self.width > 0 && self.height > 0 && self.data.len() >= needed
    }

    /// Copy the frame into a tightly packed RGBA buffer (stride padding removed)
    pub fn to_packed_rgba(&self) -> Vec<u8> {
        let width = self.width as usize;
        let height = self.height as usize;
        let stride = self.stride as usize;

        let mut result = Vec::with_capacity(width * height * 4);

        for y in 0..height {
            let row_start = y * stride;
            let row_end = row_start + width * 4;
            if row_end <= self.data.len() {
                result.extend_from_slice(&self.data[row_start..row_end]);
            }
        }

        result
    }
}

/// Binary media payload with its MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub data: Arc<[u8]>,
    pub mime_type: String,
}

impl MediaBlob {
    pub fn new(data: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Concatenate recorder chunks into one blob
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self::new(chunks.concat(), mime_type)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MediaBlob({}, {} bytes)", self.mime_type, self.data.len())
    }
}
