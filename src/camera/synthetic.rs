use super::{FrameSource, FrameStream};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

struct ActiveCapture {
    stream: FrameStream,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Frame source that generates blank RGB frames at the configured rate.
///
/// Needs no hardware. It can be switched unavailable to behave like a
/// camera whose permission was denied.
pub struct SyntheticCamera {
    config: CameraConfig,
    available: AtomicBool,
    acquisitions: AtomicU32,
    frame_counter: Arc<AtomicU64>,
    active: Mutex<Option<ActiveCapture>>,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Self {
        info!(
            "Initializing synthetic camera ({}x{} @ {}fps)",
            config.resolution.0, config.resolution.1, config.fps
        );
        Self {
            config,
            available: AtomicBool::new(true),
            acquisitions: AtomicU32::new(0),
            frame_counter: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    /// A camera that refuses every acquisition
    pub fn unavailable(config: CameraConfig) -> Self {
        let camera = Self::new(config);
        camera.set_available(false);
        camera
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful device acquisitions so far
    pub fn acquisitions(&self) -> u32 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    /// Stop producing frames without releasing, as if the device was unplugged
    pub fn interrupt(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            warn!("Synthetic camera stream interrupted");
            active.cancel.cancel();
        }
    }

    fn spawn_capture_loop(
        &self,
        sender: watch::Sender<Option<FrameData>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let (width, height) = self.config.resolution;
        let frame_interval = Duration::from_millis(1000 / self.config.fps.max(1) as u64);
        let frame_counter = Arc::clone(&self.frame_counter);

        let frame_len = width as usize * height as usize * FrameFormat::Rgb24.bytes_per_pixel();

        tokio::spawn(async move {
            // Every frame shares one black buffer
            let pixels = Arc::new(vec![0u8; frame_len]);
            let mut interval_timer = tokio::time::interval(frame_interval);

            debug!("Synthetic capture loop started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval_timer.tick() => {
                        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
                        let frame = FrameData {
                            id: frame_id,
                            timestamp: SystemTime::now(),
                            data: Arc::clone(&pixels),
                            width,
                            height,
                            format: FrameFormat::Rgb24,
                        };
                        trace!("Generated synthetic frame {}", frame_id);
                        if sender.send(Some(frame)).is_err() {
                            break;
                        }
                    }
                }
            }

            debug!("Synthetic capture loop stopped");
        })
    }
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    async fn acquire(&self) -> Result<FrameStream, CameraError> {
        let mut active = self.active.lock();

        if let Some(capture) = active.as_ref() {
            debug!("Synthetic camera already acquired");
            return Ok(capture.stream.clone());
        }

        if !self.available.load(Ordering::SeqCst) {
            error!("Synthetic camera unavailable");
            return Err(CameraError::unavailable("Camera permission denied"));
        }

        let (sender, receiver) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = self.spawn_capture_loop(sender, cancel.clone());
        let stream = FrameStream::new(receiver);

        *active = Some(ActiveCapture {
            stream: stream.clone(),
            cancel,
            task,
        });
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        info!("Synthetic camera acquired");
        Ok(stream)
    }

    async fn release(&self) {
        let capture = self.active.lock().take();

        let Some(capture) = capture else {
            debug!("Synthetic camera is not acquired");
            return;
        };

        capture.cancel.cancel();
        match tokio::time::timeout(Duration::from_secs(3), capture.task).await {
            Ok(Ok(())) => debug!("Synthetic capture task completed"),
            Ok(Err(e)) => error!("Error waiting for synthetic capture task: {}", e),
            Err(_) => warn!("Synthetic capture task did not complete within timeout"),
        }

        info!("Synthetic camera released");
    }

    fn is_acquired(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        if let Some(capture) = self.active.get_mut().take() {
            capture.cancel.cancel();
        }
    }
}
