// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the workflow state machine
//!
//! All tests run on a paused clock, so every timer in the workflow fires
//! at an exact simulated instant.

mod common;

use common::{Harness, MockBackend, MockEndpoint, ScriptedDecoder};
use pod_capture::errors::{CameraError, InvalidCommand};
use pod_capture::{Command, MediaKind, ScanPhase, WorkflowSnapshot};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_scan_resolves_after_two_empty_polls() {
    let h = Harness::with_decoder(ScriptedDecoder::new(&[None, None, Some("AWB123456789")]));
    let start = Instant::now();

    h.workflow.start_scan().unwrap();
    let snapshot = h.wait_for(|s| s.identifier.is_some()).await;

    assert_eq!(snapshot.identifier.as_deref(), Some("AWB123456789"));
    assert!(!snapshot.scanning);
    assert_eq!(snapshot.scan_phase, ScanPhase::Resolved);
    assert_eq!(snapshot.scan_message, "Detected: AWB123456789");
    assert_eq!(snapshot.status_message, "Scanned AWB: AWB123456789");

    // Polls at 0, 200 and 400 ms
    assert_eq!(start.elapsed(), Duration::from_millis(400));
    assert_eq!(h.decoder.calls(), 3);
    assert_eq!(h.camera.acquired(), 1);
    assert_eq!(h.camera.stopped(), 1);
    assert_eq!(h.sessions.live_sessions(), 0);

    // Nothing polls after resolution
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.decoder.calls(), 3);
    assert_eq!(h.camera.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scan_uses_video_only_constraints() {
    let h = Harness::with_decoder(ScriptedDecoder::new(&[Some("AWB1")]));
    h.workflow.start_scan().unwrap();
    h.wait_for(|s| s.identifier.is_some()).await;

    let constraints = h.camera.last_constraints.lock().unwrap().unwrap();
    assert!(!constraints.wants_audio);
    assert_eq!((constraints.ideal_width, constraints.ideal_height), (1280, 720));
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_decode_closes_session_once() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.start_scan().unwrap();
    h.wait_for(|s| s.scan_phase == ScanPhase::Polling).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    h.workflow.stop_scan().unwrap();
    let calls_at_stop = h.decoder.calls();
    assert_eq!(h.camera.stopped(), 1);
    assert_eq!(h.sessions.live_sessions(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let snapshot = h.workflow.snapshot();
    assert!(!snapshot.scanning);
    assert_eq!(snapshot.scan_phase, ScanPhase::Cancelled);
    assert!(snapshot.identifier.is_none());
    assert_eq!(h.decoder.calls(), calls_at_stop);
    assert_eq!(h.camera.grabs(), calls_at_stop);
    assert_eq!(h.camera.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_initialization() {
    let h = Harness::with_backend(MockBackend::new().with_acquire_delay(Duration::from_secs(1)));

    h.workflow.start_scan().unwrap();
    assert_eq!(h.workflow.snapshot().scan_message, "Initializing camera...");
    h.workflow.stop_scan().unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.sessions.live_sessions(), 0);
    assert_eq!(h.camera.acquired(), 0);
    assert!(!h.workflow.snapshot().scanning);
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_not_scanning_is_rejected() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());
    let before = h.workflow.snapshot();

    assert_eq!(h.workflow.stop_scan(), Err(InvalidCommand::NotScanning));
    assert_eq!(h.workflow.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_scan_is_rejected() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.start_scan().unwrap();
    assert_eq!(h.workflow.start_scan(), Err(InvalidCommand::AlreadyScanning));

    h.wait_for(|s| s.scan_phase == ScanPhase::Polling).await;
    assert_eq!(h.camera.acquired(), 1);
    assert_eq!(h.sessions.live_sessions(), 1);

    h.workflow.stop_scan().unwrap();
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_failure_surfaces_message() {
    let h = Harness::with_backend(MockBackend::failing(CameraError::AccessDenied(
        "Permission denied".to_string(),
    )));

    h.workflow.start_scan().unwrap();
    let snapshot = h.wait_for(|s| !s.scanning).await;

    assert_eq!(snapshot.scan_phase, ScanPhase::Failed);
    assert_eq!(snapshot.scan_message, "Camera error: Permission denied");
    assert_eq!(
        snapshot.status_message,
        "Error accessing camera: Permission denied"
    );
    assert!(snapshot.is_enabled(Command::StartScan));
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_while_scanning_fails_the_cycle() {
    let h = Harness::new(
        MockBackend::new().with_grab_failure_after(1),
        ScriptedDecoder::empty(),
        MockEndpoint::accepting(),
    );

    h.workflow.start_scan().unwrap();
    let snapshot = h.wait_for(|s| !s.scanning).await;

    assert_eq!(snapshot.scan_phase, ScanPhase::Failed);
    assert_eq!(
        snapshot.status_message,
        "Error accessing camera: Device unplugged"
    );
    assert_eq!(h.decoder.calls(), 1);
    assert_eq!(h.camera.stopped(), 1);
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_loading_feed_before_first_frame() {
    let h = Harness::new(
        MockBackend::new().with_not_ready_checks(2),
        ScriptedDecoder::new(&[Some("AWB42")]),
        MockEndpoint::accepting(),
    );
    let mut updates = h.workflow.subscribe();
    let start = Instant::now();

    h.workflow.start_scan().unwrap();

    let mut scan_messages: Vec<String> = Vec::new();
    loop {
        updates.changed().await.unwrap();
        let snapshot = updates.borrow_and_update().clone();
        if scan_messages.last() != Some(&snapshot.scan_message) {
            scan_messages.push(snapshot.scan_message.clone());
        }
        if snapshot.identifier.is_some() {
            break;
        }
    }

    assert!(scan_messages.contains(&"Loading camera feed...".to_string()));
    assert_eq!(scan_messages.last().map(String::as_str), Some("Detected: AWB42"));
    // Not-ready polls never reach the decoder
    assert_eq!(h.decoder.calls(), 1);
    assert_eq!(start.elapsed(), Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_manual_entry_opens_no_session() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.manual_entry("  AWB999 ").unwrap();

    let snapshot = h.workflow.snapshot();
    assert_eq!(snapshot.identifier.as_deref(), Some("AWB999"));
    assert_eq!(snapshot.status_message, "Manual AWB entered: AWB999");
    assert_eq!(h.sessions.sessions_opened(), 0);
    assert_eq!(h.camera.acquired(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_blank_manual_entry_is_ignored() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());
    h.workflow.manual_entry("AWB1").unwrap();
    let before = h.workflow.snapshot();

    assert_eq!(
        h.workflow.manual_entry("   "),
        Err(InvalidCommand::EmptyIdentifier)
    );
    assert_eq!(h.workflow.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn test_manual_entry_stops_running_scan() {
    let h = Harness::with_decoder(ScriptedDecoder::new(&[None, None, None, Some("AWB_SCANNED")]));

    h.workflow.start_scan().unwrap();
    h.wait_for(|s| s.scan_phase == ScanPhase::Polling).await;
    h.workflow.manual_entry("AWB_TYPED").unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = h.workflow.snapshot();
    assert_eq!(snapshot.identifier.as_deref(), Some("AWB_TYPED"));
    assert!(!snapshot.scanning);
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_photo_capture_publishes_proof() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.capture_photo();
    let snapshot = h.wait_for(|s| s.media_type.is_some()).await;

    assert_eq!(snapshot.media_type, Some(MediaKind::Photo));
    assert_eq!(snapshot.status_message, "Photo captured. Ready to upload.");
    assert!(!snapshot.capturing);
    assert_eq!(h.camera.acquired(), 1);
    assert_eq!(h.camera.stopped(), 1);
    assert_eq!(h.sessions.live_sessions(), 0);

    let uri = snapshot.preview_uri.unwrap();
    assert!(uri.starts_with("blob:pod/"));
    let blob = h.workflow.previews().resolve(&uri).unwrap();
    assert_eq!(blob.mime_type, "image/jpeg");
    assert_eq!(&blob.data[..2], &[0xFF, 0xD8]);
}

#[tokio::test(start_paused = true)]
async fn test_photo_waits_for_first_frame() {
    let h = Harness::with_backend(MockBackend::new().with_not_ready_checks(5));

    h.workflow.capture_photo();
    h.wait_for(|s| s.media_type.is_some()).await;

    assert_eq!(h.camera.grabs(), 1);
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_photo_capture_failure_reports_camera_error() {
    let h = Harness::with_backend(MockBackend::failing(CameraError::NoDevice(
        "Requested device not found".to_string(),
    )));

    h.workflow.capture_photo();
    let snapshot = h.wait_for(|s| !s.capturing).await;

    assert!(snapshot.media_type.is_none());
    assert_eq!(
        snapshot.status_message,
        "Error accessing camera: Requested device not found"
    );
}

async fn record_with_chunks(chunks: Vec<Vec<u8>>) -> (WorkflowSnapshot, Duration, Harness) {
    let h = Harness::with_backend(MockBackend::new().with_chunks(chunks));
    let start = Instant::now();

    h.workflow.record_video();
    let recording = h.wait_for(|s| s.status_message.starts_with("Recording")).await;
    assert_eq!(recording.status_message, "Recording video for 5 seconds...");

    let snapshot = h.wait_for(|s| s.media_type.is_some()).await;
    (snapshot, start.elapsed(), h)
}

#[tokio::test(start_paused = true)]
async fn test_video_without_chunks() {
    let (snapshot, elapsed, h) = record_with_chunks(vec![]).await;

    assert_eq!(elapsed, Duration::from_millis(5000));
    assert_eq!(snapshot.media_type, Some(MediaKind::Video));
    assert_eq!(snapshot.media_size, Some(0));
    assert_eq!(snapshot.status_message, "Video recorded. Ready to upload.");
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_video_with_one_chunk() {
    let (snapshot, elapsed, _h) = record_with_chunks(vec![vec![7; 10]]).await;

    assert_eq!(elapsed, Duration::from_millis(5000));
    assert_eq!(snapshot.media_size, Some(10));
}

#[tokio::test(start_paused = true)]
async fn test_video_with_many_chunks_skips_empty_ones() {
    let (snapshot, elapsed, h) =
        record_with_chunks(vec![vec![1; 4], vec![], vec![2; 6], vec![3; 5]]).await;

    assert_eq!(elapsed, Duration::from_millis(5000));
    assert_eq!(snapshot.media_size, Some(15));

    let constraints = h.camera.last_constraints.lock().unwrap().unwrap();
    assert!(constraints.wants_audio);

    let blob = h
        .workflow
        .previews()
        .resolve(&snapshot.preview_uri.unwrap())
        .unwrap();
    assert_eq!(blob.mime_type, "video/webm");
    assert_eq!(&blob.data[..5], &[1, 1, 1, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_new_capture_replaces_media_and_revokes_preview() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.capture_photo();
    let first = h.wait_for(|s| s.media_type.is_some()).await;
    let first_uri = first.preview_uri.unwrap();

    h.workflow.record_video();
    let second = h
        .wait_for(|s| s.media_type == Some(MediaKind::Video))
        .await;

    assert!(h.workflow.previews().resolve(&first_uri).is_none());
    assert_eq!(h.workflow.previews().len(), 1);
    assert_ne!(second.preview_uri.unwrap(), first_uri);
}

#[tokio::test(start_paused = true)]
async fn test_capture_while_scanning_cancels_scan() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.start_scan().unwrap();
    h.wait_for(|s| s.scan_phase == ScanPhase::Polling).await;

    h.workflow.capture_photo();
    let cancelled = h.workflow.snapshot();
    assert!(!cancelled.scanning);
    assert_eq!(cancelled.scan_phase, ScanPhase::Cancelled);

    h.wait_for(|s| s.media_type.is_some()).await;
    assert_eq!(h.camera.acquired(), 2);
    assert_eq!(h.camera.stopped(), 2);
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_latest_capture_wins() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.record_video();
    h.wait_for(|s| s.status_message.starts_with("Recording")).await;
    h.workflow.capture_photo();
    assert_eq!(h.sessions.live_sessions(), 0);

    h.wait_for(|s| s.media_type.is_some()).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = h.workflow.snapshot();
    assert_eq!(snapshot.media_type, Some(MediaKind::Photo));
    assert_eq!(snapshot.status_message, "Photo captured. Ready to upload.");
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_upload_requires_identifier_and_media() {
    let h = Harness::with_endpoint(MockEndpoint::accepting());

    assert_eq!(h.workflow.upload(), Err(InvalidCommand::UploadNotReady));
    h.workflow.manual_entry("AWB1").unwrap();
    assert!(!h.workflow.is_enabled(Command::Upload));
    assert_eq!(h.workflow.upload(), Err(InvalidCommand::UploadNotReady));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.endpoint.call_count(), 0);
    assert!(!h.workflow.snapshot().uploading);
}

#[tokio::test(start_paused = true)]
async fn test_upload_success() {
    let h = Harness::with_endpoint(MockEndpoint::accepting());
    let mut updates = h.workflow.subscribe();

    h.workflow.manual_entry("AWB1").unwrap();
    h.workflow.capture_photo();
    h.wait_for(|s| s.is_enabled(Command::Upload)).await;

    let start = Instant::now();
    h.workflow.upload().unwrap();
    assert!(h.workflow.snapshot().uploading);
    assert!(!h.workflow.is_enabled(Command::Upload));
    assert_eq!(h.workflow.upload(), Err(InvalidCommand::AlreadyUploading));

    let mut statuses: Vec<String> = Vec::new();
    loop {
        updates.changed().await.unwrap();
        let snapshot = updates.borrow_and_update().clone();
        statuses.push(snapshot.status_message.clone());
        if !snapshot.uploading && snapshot.status_message.starts_with("Successfully") {
            break;
        }
    }

    assert_eq!(start.elapsed(), Duration::from_millis(800 + 1200 + 2000));
    let stages: Vec<&str> = statuses
        .iter()
        .map(String::as_str)
        .filter(|s| {
            matches!(
                *s,
                "Converting media for upload..."
                    | "Connecting to cloud storage..."
                    | "Uploading media file..."
            )
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            "Converting media for upload...",
            "Connecting to cloud storage...",
            "Uploading media file...",
        ]
    );

    let snapshot = h.workflow.snapshot();
    assert!(!snapshot.uploading);
    assert!(snapshot.status_message.contains("AWB1"));
    assert!(snapshot.status_message.contains("photo"));

    let calls = h.endpoint.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (metadata, blob) = &calls[0];
    assert_eq!(metadata.identifier, "AWB1");
    assert_eq!(metadata.media_kind, MediaKind::Photo);
    assert!(metadata.file_name.starts_with("pod_AWB1_"));
    assert!(metadata.file_name.ends_with(".jpg"));
    assert_eq!(blob.mime_type, "image/jpeg");
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure() {
    let h = Harness::with_endpoint(MockEndpoint::failing("network down"));

    h.workflow.manual_entry("AWB2").unwrap();
    h.workflow.record_video();
    h.wait_for(|s| s.is_enabled(Command::Upload)).await;

    h.workflow.upload().unwrap();
    let snapshot = h
        .wait_for(|s| !s.uploading && s.status_message.contains("failed"))
        .await;

    assert!(snapshot.status_message.contains("network down"));
    assert!(snapshot.is_enabled(Command::Upload));
    assert_eq!(h.endpoint.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_returns_initial_state() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());
    let initial = h.workflow.snapshot();

    h.workflow.manual_entry("AWB3").unwrap();
    h.workflow.capture_photo();
    let with_media = h.wait_for(|s| s.media_type.is_some()).await;
    h.workflow.start_scan().unwrap();
    h.wait_for(|s| s.scan_phase == ScanPhase::Polling).await;

    h.workflow.reset();

    assert_eq!(h.workflow.snapshot(), initial);
    assert_eq!(h.sessions.live_sessions(), 0);
    assert!(h.workflow.previews().is_empty());
    assert!(
        h.workflow
            .previews()
            .resolve(&with_media.preview_uri.unwrap())
            .is_none()
    );

    // No timer left to fire
    let calls = h.decoder.calls();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.decoder.calls(), calls);
    assert_eq!(h.workflow.snapshot(), initial);
}

#[tokio::test(start_paused = true)]
async fn test_reset_aborts_upload() {
    let h = Harness::with_endpoint(MockEndpoint::accepting());

    h.workflow.manual_entry("AWB4").unwrap();
    h.workflow.capture_photo();
    h.wait_for(|s| s.is_enabled(Command::Upload)).await;
    h.workflow.upload().unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    h.workflow.reset();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = h.workflow.snapshot();
    assert!(!snapshot.uploading);
    assert!(snapshot.status_message.is_empty());
    assert_eq!(h.endpoint.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_aborts_recording() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.record_video();
    h.wait_for(|s| s.status_message.starts_with("Recording")).await;
    assert_eq!(h.sessions.live_sessions(), 1);
    h.workflow.reset();

    // Closed by reset itself, not by the aborted task
    assert_eq!(h.sessions.live_sessions(), 0);
    assert_eq!(h.camera.stopped(), 1);

    h.workflow.start_scan().unwrap();
    h.wait_for(|s| s.scan_phase == ScanPhase::Polling).await;
    assert_eq!(h.camera.acquired(), 2);
    assert_eq!(h.sessions.live_sessions(), 1);

    h.workflow.stop_scan().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = h.workflow.snapshot();
    assert!(snapshot.media_type.is_none());
    assert!(!snapshot.capturing);
    assert_eq!(h.sessions.live_sessions(), 0);
    assert_eq!(h.camera.stopped(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_scan_start_closes_capture_session() {
    let h = Harness::with_decoder(ScriptedDecoder::new(&[Some("AWB42")]));

    h.workflow.record_video();
    h.wait_for(|s| s.status_message.starts_with("Recording")).await;

    h.workflow.start_scan().unwrap();
    assert_eq!(h.sessions.live_sessions(), 0);
    assert!(!h.workflow.snapshot().capturing);

    let snapshot = h.wait_for(|s| s.identifier.is_some()).await;
    assert_eq!(snapshot.identifier.as_deref(), Some("AWB42"));
    assert!(snapshot.media_type.is_none());
    assert_eq!(h.camera.acquired(), 2);
    assert_eq!(h.sessions.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_closes_scan_session() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());

    h.workflow.start_scan().unwrap();
    h.wait_for(|s| s.scan_phase == ScanPhase::Polling).await;
    assert_eq!(h.sessions.live_sessions(), 1);

    let common::Harness {
        workflow,
        sessions,
        camera,
        ..
    } = h;
    drop(workflow);

    assert_eq!(sessions.live_sessions(), 0);
    assert_eq!(camera.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_enabled_commands_follow_state() {
    let h = Harness::with_decoder(ScriptedDecoder::empty());
    assert!(h.workflow.is_enabled(Command::StartScan));
    assert!(!h.workflow.is_enabled(Command::StopScan));
    assert!(!h.workflow.is_enabled(Command::Upload));

    h.workflow.start_scan().unwrap();
    let snapshot = h.workflow.snapshot();
    assert!(!snapshot.is_enabled(Command::StartScan));
    assert!(snapshot.is_enabled(Command::StopScan));
    assert!(snapshot.is_enabled(Command::ManualEntry));
    assert!(snapshot.is_enabled(Command::Reset));
}
