// SPDX-License-Identifier: MPL-2.0

//! Error types for the proof-of-delivery workflow
//!
//! Camera and upload failures never escape the workflow: they are caught at
//! the component boundary and turned into status text. The types here exist
//! so that the boundary conversion has something structured to work with,
//! and so that library users driving the components directly get proper
//! `Result`s.

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Camera acquisition or streaming errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Photo/video capture errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Upload endpoint errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A command was issued while it is disabled
    #[error(transparent)]
    InvalidCommand(#[from] InvalidCommand),
    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Camera-specific errors
///
/// The `Display` output of each variant is the platform message verbatim,
/// since it ends up in front of the operator unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// Permission to use the camera was refused
    #[error("{0}")]
    AccessDenied(String),
    /// No camera device matched the constraints
    #[error("{0}")]
    NoDevice(String),
    /// Camera went away while a session was open
    #[error("{0}")]
    Disconnected(String),
    /// Recorder could not be started or finalized
    #[error("{0}")]
    Recorder(String),
}

impl CameraError {
    /// Platform message carried by this error
    pub fn message(&self) -> &str {
        match self {
            CameraError::AccessDenied(msg)
            | CameraError::NoDevice(msg)
            | CameraError::Disconnected(msg)
            | CameraError::Recorder(msg) => msg,
        }
    }
}

/// Photo/video capture errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Camera could not be acquired or failed mid-capture
    #[error(transparent)]
    Camera(#[from] CameraError),
    /// Still image encoding failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Upload endpoint errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The endpoint could not be reached
    #[error("{0}")]
    Transport(String),
    /// The endpoint answered with a non-success status
    #[error("{message} (status {status})")]
    Rejected { status: u16, message: String },
    /// The endpoint answered with a body we could not read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The upload task died before reporting a result
    #[error("{0}")]
    Aborted(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
    /// Config file is not valid JSON for [`crate::Config`]
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    /// A value is out of range
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A workflow command issued while it is disabled
///
/// Presentation layers are expected to grey out the control instead of
/// surfacing this; the workflow leaves its state untouched when it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidCommand {
    #[error("A scan is already in progress")]
    AlreadyScanning,
    #[error("No scan is in progress")]
    NotScanning,
    #[error("Scan an AWB and capture media before uploading")]
    UploadNotReady,
    #[error("An upload is already in progress")]
    AlreadyUploading,
    #[error("Identifier is empty")]
    EmptyIdentifier,
}

// Conversion from String for ad-hoc errors
impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}
