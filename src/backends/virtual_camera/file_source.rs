// SPDX-License-Identifier: GPL-3.0-only

//! File source streaming for the virtual camera
//!
//! Serves a still image as a camera stream. The stream only reports a frame
//! after a warm-up delay so that consumers see the same "feed not ready yet"
//! phase a real device has.

use crate::backends::camera::types::{CameraConstraints, CameraFrame};
use crate::backends::camera::{
    BackendResult, CameraBackend, ChunkSender, MediaRecorder, MediaStream,
};
use crate::constants::{camera, file_formats, virtual_camera as vc_timing};
use crate::errors::CameraError;
use crate::pipelines::photo::encoding::encode_jpeg;
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Load an image file as an RGBA camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(CameraError::NoDevice(format!(
            "Unsupported camera source format: {}",
            path.display()
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        CameraError::NoDevice(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    info!(width, height, "Image loaded successfully");

    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

/// Virtual camera backed by a still image
#[derive(Debug, Clone)]
pub struct FileCameraBackend {
    frame: CameraFrame,
    warmup: Duration,
    record_frame_duration: Duration,
}

impl FileCameraBackend {
    /// Serve the image at `path`
    pub fn from_path(path: &Path) -> BackendResult<Self> {
        Ok(Self::from_frame(load_image_as_frame(path)?))
    }

    /// Serve an in-memory frame
    pub fn from_frame(frame: CameraFrame) -> Self {
        Self {
            frame,
            warmup: vc_timing::WARMUP,
            record_frame_duration: vc_timing::RECORD_FRAME_DURATION,
        }
    }

    /// Override the delay before the first frame is ready
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }
}

impl CameraBackend for FileCameraBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn acquire(
        &self,
        constraints: CameraConstraints,
    ) -> BoxFuture<'static, BackendResult<Box<dyn MediaStream>>> {
        let frame = self.frame.clone();
        let warmup = self.warmup;
        let record_frame_duration = self.record_frame_duration;

        Box::pin(async move {
            if constraints.wants_audio {
                debug!("File source has no audio track, recording video only");
            }
            debug!(
                width = frame.width,
                height = frame.height,
                requested = %constraints,
                "File camera stream acquired"
            );
            Ok(Box::new(FileStream {
                frame,
                ready_at: tokio::time::Instant::now() + warmup,
                stopped: Arc::new(AtomicBool::new(false)),
                record_frame_duration,
            }) as Box<dyn MediaStream>)
        })
    }
}

/// Stream over a still image
struct FileStream {
    frame: CameraFrame,
    ready_at: tokio::time::Instant,
    stopped: Arc<AtomicBool>,
    record_frame_duration: Duration,
}

impl MediaStream for FileStream {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        debug!("File camera stream stopped");
    }

    fn is_frame_ready(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && tokio::time::Instant::now() >= self.ready_at
    }

    fn grab_frame(&self) -> BackendResult<CameraFrame> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CameraError::Disconnected("Stream has been stopped".into()));
        }
        Ok(CameraFrame {
            captured_at: Instant::now(),
            ..self.frame.clone()
        })
    }

    fn start_recording(&self, chunks: ChunkSender) -> BackendResult<Box<dyn MediaRecorder>> {
        // Every recorded frame is the same image, encode it once
        let jpeg = encode_jpeg(&self.frame, camera::PHOTO_JPEG_QUALITY)
            .map_err(|e| CameraError::Recorder(e.to_string()))?;

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let stopped = Arc::clone(&self.stopped);
        let frame_duration = self.record_frame_duration;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration);
            let mut sent = 0u64;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if stopped.load(Ordering::SeqCst) {
                            warn!("Stream stopped while recording");
                            break;
                        }
                        if chunks.send(jpeg.clone()).is_err() {
                            break;
                        }
                        sent += 1;
                    }
                }
            }
            debug!(chunks = sent, "File recorder finished");
            // `chunks` is dropped here, which closes the receiving side
        });

        info!("File recorder started");
        Ok(Box::new(FileRecorder {
            stop_tx: Some(stop_tx),
            task,
        }))
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Motion-JPEG recorder over a file stream
struct FileRecorder {
    stop_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl MediaRecorder for FileRecorder {
    fn mime_type(&self) -> &str {
        vc_timing::RECORDING_MIME
    }

    fn stop(mut self: Box<Self>) -> BoxFuture<'static, BackendResult<()>> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let task = self.task;
        Box::pin(async move {
            task.await
                .map_err(|e| CameraError::Recorder(format!("Recorder task failed: {}", e)))
        })
    }
}
