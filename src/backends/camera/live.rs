// SPDX-License-Identifier: GPL-3.0-only

//! Live camera backend on GStreamer
//!
//! One pipeline per session:
//!
//! ```text
//! autovideosrc ! videoconvert ! tee ─┬─ queue ! videoscale ! RGBA caps ! appsink "sink"
//!                                    └─ queue ! valve "video_valve" ! vp8enc ! webmmux ! appsink "recsink"
//! autoaudiosrc ! valve "audio_valve" ! audioconvert ! opusenc ! webmmux     (audio sessions only)
//! ```
//!
//! The preview branch keeps the latest RGBA frame for the scan loop and photo
//! capture. The recording branch is held closed by its valves until a
//! recorder is started; stopping sends EOS and waits for the muxer to flush.

use super::types::{CameraConstraints, CameraFrame};
use super::{BackendResult, CameraBackend, ChunkSender, MediaRecorder, MediaStream};
use crate::constants::pipeline;
use crate::errors::CameraError;
use futures::future::BoxFuture;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// GStreamer camera backend using the platform's default devices
#[derive(Debug, Default)]
pub struct LiveCameraBackend;

impl LiveCameraBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for LiveCameraBackend {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn acquire(
        &self,
        constraints: CameraConstraints,
    ) -> BoxFuture<'static, BackendResult<Box<dyn MediaStream>>> {
        Box::pin(async move {
            // State changes block until the device answers
            let stream = tokio::task::spawn_blocking(move || LiveStream::start(constraints))
                .await
                .map_err(|e| CameraError::NoDevice(format!("Camera task failed: {}", e)))??;
            Ok(Box::new(stream) as Box<dyn MediaStream>)
        })
    }
}

fn pipeline_description(constraints: &CameraConstraints) -> String {
    let mut description = format!(
        "autovideosrc ! videoconvert ! tee name=t \
         t. ! queue ! videoscale ! video/x-raw,format={format},width={width},height={height} \
            ! appsink name=sink \
         t. ! queue ! valve name=video_valve drop=true ! videoconvert \
            ! vp8enc deadline=1 ! webmmux name=mux streamable=true ! appsink name=recsink sync=false",
        format = pipeline::OUTPUT_FORMAT,
        width = constraints.ideal_width,
        height = constraints.ideal_height,
    );
    if constraints.wants_audio {
        description.push_str(
            " autoaudiosrc ! valve name=audio_valve drop=true ! audioconvert ! audioresample \
             ! opusenc ! queue ! mux.",
        );
    }
    description
}

type LatestFrame = Arc<Mutex<Option<CameraFrame>>>;

struct LiveStream {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    recsink: AppSink,
    latest: LatestFrame,
}

impl LiveStream {
    fn start(constraints: CameraConstraints) -> BackendResult<Self> {
        gstreamer::init()
            .map_err(|e| CameraError::NoDevice(format!("Failed to initialize GStreamer: {}", e)))?;

        if constraints.facing != super::types::Facing::User {
            debug!(facing = %constraints.facing, "Facing mode is not selectable, using default device");
        }

        let description = pipeline_description(&constraints);
        debug!(pipeline = %description, "Creating camera pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| CameraError::NoDevice(format!("Failed to create pipeline: {}", e)))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| CameraError::NoDevice("Launch line is not a pipeline".to_string()))?;

        let appsink = sink_by_name(&pipeline, "sink")?;
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);
        let recsink = sink_by_name(&pipeline, "recsink")?;

        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let frame_slot = latest.clone();
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info =
                        VideoInfo::from_caps(caps).map_err(|_| gstreamer::FlowError::Error)?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        stride: video_info.stride()[0] as u32,
                        captured_at: Instant::now(),
                    };
                    *frame_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            let _ = pipeline.set_state(gstreamer::State::Null);
            CameraError::NoDevice(format!("Failed to start camera: {}", e))
        })?;

        info!(constraints = %constraints, "Live camera pipeline playing");
        Ok(Self {
            pipeline,
            appsink,
            recsink,
            latest,
        })
    }

    /// First error posted on the bus since the last check
    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let message = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
        match message.view() {
            gstreamer::MessageView::Error(err) => Some(err.error().to_string()),
            _ => None,
        }
    }
}

fn sink_by_name(pipeline: &gstreamer::Pipeline, name: &str) -> BackendResult<AppSink> {
    pipeline
        .by_name(name)
        .ok_or_else(|| CameraError::NoDevice(format!("Pipeline has no `{}` element", name)))?
        .dynamic_cast::<AppSink>()
        .map_err(|_| CameraError::NoDevice(format!("`{}` is not an appsink", name)))
}

impl MediaStream for LiveStream {
    fn stop(&self) {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        self.recsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop camera pipeline");
        }
        info!("Live camera pipeline stopped");
    }

    fn is_frame_ready(&self) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn grab_frame(&self) -> BackendResult<CameraFrame> {
        if let Some(message) = self.bus_error() {
            return Err(CameraError::Disconnected(message));
        }
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| CameraError::Disconnected("No frame available".to_string()))
    }

    fn start_recording(&self, chunks: ChunkSender) -> BackendResult<Box<dyn MediaRecorder>> {
        self.recsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;
                    chunks
                        .send(map.as_slice().to_vec())
                        .map_err(|_| gstreamer::FlowError::Flushing)?;
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        for valve in ["video_valve", "audio_valve"] {
            if let Some(element) = self.pipeline.by_name(valve) {
                element.set_property("drop", false);
            }
        }

        debug!("Recording branch opened");
        Ok(Box::new(LiveRecorder {
            pipeline: self.pipeline.clone(),
            recsink: self.recsink.clone(),
        }))
    }
}

struct LiveRecorder {
    pipeline: gstreamer::Pipeline,
    recsink: AppSink,
}

impl MediaRecorder for LiveRecorder {
    fn mime_type(&self) -> &str {
        pipeline::RECORDING_MIME
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, BackendResult<()>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                self.pipeline.send_event(gstreamer::event::Eos::new());

                let bus = self.pipeline.bus();
                let outcome = bus.and_then(|bus| {
                    bus.timed_pop_filtered(
                        gstreamer::ClockTime::from_seconds(pipeline::STOP_TIMEOUT_SECS),
                        &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
                    )
                });

                // Dropping the callbacks drops the chunk sender
                self.recsink
                    .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

                match outcome.as_ref().map(|m| m.view()) {
                    Some(gstreamer::MessageView::Error(err)) => {
                        Err(CameraError::Recorder(err.error().to_string()))
                    }
                    Some(_) => Ok(()),
                    None => {
                        warn!("Recorder did not flush before timeout");
                        Ok(())
                    }
                }
            })
            .await
            .map_err(|e| CameraError::Recorder(format!("Recorder task failed: {}", e)))?
        })
    }
}
