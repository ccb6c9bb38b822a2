// SPDX-License-Identifier: GPL-3.0-only

//! Shared mocks for integration tests
//!
//! Everything here is scripted and counts what happens to it, so tests can
//! check acquisition, teardown and endpoint calls without a device or a
//! network.

#![allow(dead_code)]

use futures::future::BoxFuture;
use pod_capture::Workflow;
use pod_capture::app::{BarcodeDecoder, Decoded};
use pod_capture::backends::camera::{
    BackendResult, CameraBackend, CameraConstraints, CameraFrame, CameraSessionManager,
    ChunkSender, MediaRecorder, MediaStream,
};
use pod_capture::config::Config;
use pod_capture::errors::{CameraError, UploadError};
use pod_capture::pipelines::upload::{
    UploadEndpoint, UploadMetadata, UploadPipeline, UploadReceipt,
};
use pod_capture::backends::camera::MediaBlob;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counters shared between a [`MockBackend`] and the streams it hands out
#[derive(Debug, Default)]
pub struct CameraStats {
    pub acquired: AtomicUsize,
    pub stopped: AtomicUsize,
    pub readiness_checks: AtomicUsize,
    pub grabs: AtomicUsize,
    pub recordings: AtomicUsize,
    pub last_constraints: Mutex<Option<CameraConstraints>>,
}

impl CameraStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }
}

/// Scripted camera backend
#[derive(Clone)]
pub struct MockBackend {
    pub stats: Arc<CameraStats>,
    acquire_error: Option<CameraError>,
    acquire_delay: Duration,
    not_ready_checks: usize,
    fail_grab_after: Option<usize>,
    chunks: Vec<Vec<u8>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(CameraStats::default()),
            acquire_error: None,
            acquire_delay: Duration::ZERO,
            not_ready_checks: 0,
            fail_grab_after: None,
            chunks: vec![vec![1, 2, 3]],
        }
    }

    /// Every acquisition fails with `error`
    pub fn failing(error: CameraError) -> Self {
        Self {
            acquire_error: Some(error),
            ..Self::new()
        }
    }

    /// Acquisition takes `delay` of (simulated) time
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    /// The first `checks` readiness checks of each stream report no frame
    pub fn with_not_ready_checks(mut self, checks: usize) -> Self {
        self.not_ready_checks = checks;
        self
    }

    /// Grabs after the first `grabs` fail as a disconnect
    pub fn with_grab_failure_after(mut self, grabs: usize) -> Self {
        self.fail_grab_after = Some(grabs);
        self
    }

    /// Chunks the recorder emits as soon as it starts
    pub fn with_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks;
        self
    }
}

impl CameraBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn acquire(
        &self,
        constraints: CameraConstraints,
    ) -> BoxFuture<'static, BackendResult<Box<dyn MediaStream>>> {
        let backend = self.clone();
        Box::pin(async move {
            if !backend.acquire_delay.is_zero() {
                tokio::time::sleep(backend.acquire_delay).await;
            }
            if let Some(error) = backend.acquire_error.clone() {
                return Err(error);
            }
            backend.stats.acquired.fetch_add(1, Ordering::SeqCst);
            *backend.stats.last_constraints.lock().unwrap() = Some(constraints);
            Ok(Box::new(MockStream {
                checks: AtomicUsize::new(0),
                backend,
            }) as Box<dyn MediaStream>)
        })
    }
}

struct MockStream {
    backend: MockBackend,
    checks: AtomicUsize,
}

impl MediaStream for MockStream {
    fn stop(&self) {
        self.backend.stats.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn is_frame_ready(&self) -> bool {
        self.backend
            .stats
            .readiness_checks
            .fetch_add(1, Ordering::SeqCst);
        self.checks.fetch_add(1, Ordering::SeqCst) >= self.backend.not_ready_checks
    }

    fn grab_frame(&self) -> BackendResult<CameraFrame> {
        let grabs = self.backend.stats.grabs.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.backend.fail_grab_after {
            if grabs >= limit {
                return Err(CameraError::Disconnected("Device unplugged".to_string()));
            }
        }
        Ok(test_frame())
    }

    fn start_recording(&self, chunks: ChunkSender) -> BackendResult<Box<dyn MediaRecorder>> {
        self.backend
            .stats
            .recordings
            .fetch_add(1, Ordering::SeqCst);
        for chunk in &self.backend.chunks {
            let _ = chunks.send(chunk.clone());
        }
        Ok(Box::new(MockRecorder {
            chunks: Some(chunks),
        }))
    }
}

struct MockRecorder {
    chunks: Option<ChunkSender>,
}

impl MediaRecorder for MockRecorder {
    fn mime_type(&self) -> &str {
        "video/webm"
    }

    fn stop(mut self: Box<Self>) -> BoxFuture<'static, BackendResult<()>> {
        // Flushing closes the chunk channel
        self.chunks.take();
        Box::pin(async { Ok(()) })
    }
}

/// A small grey RGBA frame
pub fn test_frame() -> CameraFrame {
    CameraFrame::from_rgba(8, 8, vec![128u8; 8 * 8 * 4])
}

/// Decoder that replays a script of results, then finds nothing
#[derive(Default)]
pub struct ScriptedDecoder {
    script: Mutex<VecDeque<Option<String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedDecoder {
    pub fn new(script: &[Option<&str>]) -> Self {
        Self {
            script: Mutex::new(script.iter().map(|s| s.map(str::to_string)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Never finds a code
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BarcodeDecoder for ScriptedDecoder {
    fn decode(&self, _frame: &CameraFrame) -> Option<Decoded> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .map(Decoded::new)
    }
}

/// Upload endpoint answering with a fixed result and recording every call
pub struct MockEndpoint {
    result: Result<String, String>,
    pub calls: Mutex<Vec<(UploadMetadata, MediaBlob)>>,
}

impl MockEndpoint {
    pub fn accepting() -> Self {
        Self {
            result: Ok("stored".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl UploadEndpoint for MockEndpoint {
    fn name(&self) -> &str {
        "mock"
    }

    fn upload(
        &self,
        blob: MediaBlob,
        metadata: UploadMetadata,
    ) -> BoxFuture<'static, Result<UploadReceipt, UploadError>> {
        self.calls.lock().unwrap().push((metadata, blob));
        let result = self.result.clone();
        Box::pin(async move {
            result
                .map(|message| UploadReceipt { message })
                .map_err(UploadError::Transport)
        })
    }
}

/// Everything a test needs to drive and inspect a workflow
pub struct Harness {
    pub workflow: Workflow,
    pub camera: Arc<CameraStats>,
    pub sessions: CameraSessionManager,
    pub decoder: Arc<ScriptedDecoder>,
    pub endpoint: Arc<MockEndpoint>,
}

impl Harness {
    pub fn new(backend: MockBackend, decoder: ScriptedDecoder, endpoint: MockEndpoint) -> Self {
        let camera = backend.stats.clone();
        let sessions = CameraSessionManager::new(Arc::new(backend));
        let decoder = Arc::new(decoder);
        let endpoint = Arc::new(endpoint);
        let config = Config::default();

        let upload = UploadPipeline::new(endpoint.clone(), config.upload_stage_delays());
        let workflow = Workflow::new(sessions.clone(), decoder.clone(), upload, &config);

        Self {
            workflow,
            camera,
            sessions,
            decoder,
            endpoint,
        }
    }

    pub fn with_decoder(decoder: ScriptedDecoder) -> Self {
        Self::new(MockBackend::new(), decoder, MockEndpoint::accepting())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        Self::new(backend, ScriptedDecoder::empty(), MockEndpoint::accepting())
    }

    pub fn with_endpoint(endpoint: MockEndpoint) -> Self {
        Self::new(MockBackend::new(), ScriptedDecoder::empty(), endpoint)
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&pod_capture::WorkflowSnapshot) -> bool,
    ) -> pod_capture::WorkflowSnapshot {
        let mut updates = self.workflow.subscribe();
        let snapshot = updates
            .wait_for(predicate)
            .await
            .expect("workflow dropped while waiting")
            .clone();
        snapshot
    }
}
