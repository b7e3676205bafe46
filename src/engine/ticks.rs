use super::scheduler::EngineInner;
use super::types::EngineState;
use crate::camera::FrameStream;
use crate::classifier::{FaceObservation, ObjectSignals};
use crate::events::FocusEvent;
use crate::hysteresis::FaceSignal;
use crate::models::ClassifierFamily;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Periodic timer whose first tick is one period from now. Ticks that come
/// due while an inference is still running are skipped, not queued.
fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

impl EngineInner {
    /// Object timer: one inference per tick, results applied immediately
    pub(super) async fn run_object_loop(
        self: Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        stream: FrameStream,
    ) {
        let mut ticker = ticker(self.detection.tick_interval());
        debug!("Object timer started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !stream.is_live() {
                self.stream_lost(generation).await;
                break;
            }

            let Some(backend) = self.registry.object_backend() else {
                trace!("Object model not ready, skipping tick");
                continue;
            };
            let Some(frame) = stream.latest() else {
                continue;
            };

            match self.object_classifier.classify(backend.as_ref(), &frame).await {
                Ok(signals) => self.apply_object_tick(generation, signals),
                Err(e) => warn!("Object tick failed, counters unchanged: {}", e),
            }
        }

        debug!("Object timer stopped");
    }

    /// Face timer: waits out the startup delay, then one inference per tick
    pub(super) async fn run_face_loop(
        self: Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        stream: FrameStream,
    ) {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.detection.face_startup_delay()) => {}
        }

        let mut ticker = ticker(self.detection.tick_interval());
        debug!("Face timer started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !stream.is_live() {
                self.stream_lost(generation).await;
                break;
            }

            let Some(backend) = self.registry.face_backend() else {
                trace!("Face model not ready, skipping tick");
                continue;
            };
            let Some(frame) = stream.latest() else {
                continue;
            };

            match self.face_classifier.classify(backend.as_ref(), &frame).await {
                Ok(Some(observation)) => self.apply_face_tick(generation, frame.id, observation),
                Ok(None) => {}
                Err(e) => warn!("Face tick failed, counters unchanged: {}", e),
            }
        }

        debug!("Face timer stopped");
    }

    async fn stream_lost(self: &Arc<Self>, generation: u64) {
        self.events.emit(FocusEvent::CameraStatusChanged {
            connected: false,
            timestamp: std::time::SystemTime::now(),
        });
        self.fail_session(generation, "Camera stream lost".to_string())
            .await;
    }

    /// True when a tick result from `generation` may still touch the state
    fn accepts(generation: u64, current: u64, state: EngineState, family: ClassifierFamily) -> bool {
        if current != generation || state != EngineState::Running {
            trace!("Discarding {} tick from an ended session", family);
            return false;
        }
        true
    }

    pub(super) fn apply_object_tick(&self, generation: u64, signals: ObjectSignals) {
        let mut shared = self.shared.lock();
        if !Self::accepts(generation, shared.generation, shared.state, ClassifierFamily::Object) {
            return;
        }

        shared.objects = signals;
        self.refresh_verdict(shared);
    }

    pub(super) fn apply_face_tick(&self, generation: u64, frame_id: u64, observation: FaceObservation) {
        let mut shared = self.shared.lock();
        if !Self::accepts(generation, shared.generation, shared.state, ClassifierFamily::Face) {
            return;
        }

        // A missing face is negative evidence for gaze and eye closure, so an
        // absent tick ends any looking-away or eyes-closed run
        let hysteresis = &mut shared.hysteresis;
        hysteresis.update(FaceSignal::NoFace, !observation.face_found);
        hysteresis.update(
            FaceSignal::LookingAway,
            observation.looking_away.unwrap_or(false),
        );
        hysteresis.update(
            FaceSignal::EyesClosed,
            observation.eyes_closed.unwrap_or(false),
        );
        shared.face_detected = Some(observation.face_found);

        let counters = shared.hysteresis.counters();
        trace!("Face tick on frame {}: {:?}", frame_id, counters);

        match observation.landmarks {
            Some(landmarks) => self.events.emit(FocusEvent::FaceOverlay {
                frame_id,
                landmarks,
            }),
            None => self.events.emit(FocusEvent::OverlayCleared),
        }
        self.events.emit(FocusEvent::CountersUpdated { counters });

        self.refresh_verdict(shared);
    }
}
