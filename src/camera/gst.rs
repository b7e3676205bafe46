use super::{FrameSource, FrameStream};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// How long the pipeline may take to reach `Playing`
const STARTUP_TIMEOUT_SECS: u64 = 3;
/// No samples for this long counts as a lost stream
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(5);

struct ActiveCapture {
    pipeline: Pipeline,
    stream: FrameStream,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// V4L2 webcam captured through a GStreamer pipeline as raw RGB
pub struct GstCamera {
    config: CameraConfig,
    frame_counter: Arc<AtomicU64>,
    active: Mutex<Option<ActiveCapture>>,
}

impl GstCamera {
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        info!(
            "Initializing GStreamer camera for device {} ({}x{} @ {}fps)",
            config.index, config.resolution.0, config.resolution.1, config.fps
        );

        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        Ok(Self {
            config,
            frame_counter: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        })
    }

    fn pipeline_description(&self) -> String {
        let (width, height) = self.config.resolution;
        format!(
            "v4l2src device=/dev/video{} ! \
             videoconvert ! videoscale ! \
             video/x-raw,format=RGB,width={},height={},framerate={}/1 ! \
             appsink name=sink sync=false max-buffers=2 drop=true",
            self.config.index, width, height, self.config.fps
        )
    }

    fn build_pipeline(&self) -> Result<(Pipeline, AppSink), CameraError> {
        let description = self.pipeline_description();
        debug!("Creating GStreamer pipeline: {}", description);

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        Ok((pipeline, appsink))
    }

    fn frame_from_sample(
        sample: &gstreamer::Sample,
        frame_counter: &AtomicU64,
    ) -> Result<FrameData, CameraError> {
        let lost = |details: String| CameraError::StreamLost { details };

        let buffer = sample
            .buffer()
            .ok_or_else(|| lost("No buffer in sample".to_string()))?;
        let caps = sample
            .caps()
            .ok_or_else(|| lost("No caps in sample".to_string()))?;
        let video_info = VideoInfo::from_caps(caps)
            .map_err(|e| lost(format!("Failed to get video info: {}", e)))?;
        let map = buffer
            .map_readable()
            .map_err(|e| lost(format!("Failed to map buffer: {}", e)))?;

        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Captured RGB frame {} ({}x{}, {} bytes)",
            frame_id,
            video_info.width(),
            video_info.height(),
            map.len()
        );

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            video_info.width(),
            video_info.height(),
            FrameFormat::Rgb24,
        ))
    }

    fn spawn_capture_loop(
        &self,
        mut samples: mpsc::UnboundedReceiver<gstreamer::Sample>,
        sender: watch::Sender<Option<FrameData>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let frame_counter = Arc::clone(&self.frame_counter);

        tokio::spawn(async move {
            let mut last_sample_time = tokio::time::Instant::now();
            let mut watchdog_interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sample = samples.recv() => {
                        let Some(sample) = sample else {
                            warn!("GStreamer sample channel closed");
                            break;
                        };
                        match Self::frame_from_sample(&sample, &frame_counter) {
                            Ok(frame) => {
                                last_sample_time = tokio::time::Instant::now();
                                if sender.send(Some(frame)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => error!("Error processing GStreamer sample: {}", e),
                        }
                    }
                    _ = watchdog_interval.tick() => {
                        if last_sample_time.elapsed() >= WATCHDOG_TIMEOUT {
                            error!("No camera frames received for {:?}", WATCHDOG_TIMEOUT);
                            break;
                        }
                    }
                }
            }

            debug!("GStreamer capture loop stopped");
        })
    }
}

#[async_trait]
impl FrameSource for GstCamera {
    async fn acquire(&self) -> Result<FrameStream, CameraError> {
        if let Some(capture) = self.active.lock().as_ref() {
            debug!("GStreamer camera already acquired");
            return Ok(capture.stream.clone());
        }

        let (pipeline, appsink) = self.build_pipeline()?;
        let (tx, rx) = mpsc::unbounded_channel();

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let _ = tx.send(sample);
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        let unavailable = |details: String| {
            let _ = pipeline.set_state(gstreamer::State::Null);
            CameraError::unavailable(details)
        };

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| unavailable(format!("Failed to start pipeline: {}", e)))?;

        // Blocks until the device opened or gave up
        let probe = pipeline.clone();
        let started = tokio::task::spawn_blocking(move || {
            probe
                .state(gstreamer::ClockTime::from_seconds(STARTUP_TIMEOUT_SECS))
                .0
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result);
        started.map_err(|e| unavailable(format!("Device did not start playing: {}", e)))?;

        let (sender, receiver) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = self.spawn_capture_loop(rx, sender, cancel.clone());
        let stream = FrameStream::new(receiver);

        let mut active = self.active.lock();
        if let Some(capture) = active.as_ref() {
            // Lost a race with a concurrent acquire
            cancel.cancel();
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Ok(capture.stream.clone());
        }
        *active = Some(ActiveCapture {
            pipeline,
            stream: stream.clone(),
            cancel,
            task,
        });

        info!("GStreamer camera /dev/video{} acquired", self.config.index);
        Ok(stream)
    }

    async fn release(&self) {
        let capture = self.active.lock().take();

        let Some(capture) = capture else {
            debug!("GStreamer camera is not acquired");
            return;
        };

        capture.cancel.cancel();
        if let Err(e) = capture.pipeline.set_state(gstreamer::State::Null) {
            error!("Failed to stop GStreamer pipeline: {}", e);
        }

        match tokio::time::timeout(Duration::from_secs(3), capture.task).await {
            Ok(Ok(())) => debug!("GStreamer capture task completed"),
            Ok(Err(e)) => error!("Error waiting for GStreamer capture task: {}", e),
            Err(_) => warn!("GStreamer capture task did not complete within timeout"),
        }

        info!("GStreamer camera released");
    }

    fn is_acquired(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for GstCamera {
    fn drop(&mut self) {
        if let Some(capture) = self.active.get_mut().take() {
            capture.cancel.cancel();
            let _ = capture.pipeline.set_state(gstreamer::State::Null);
        }
    }
}
