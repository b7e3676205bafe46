use super::scheduler::{DetectionEngine, EngineInner, Session};
use super::types::EngineState;
use crate::error::{CameraError, ModelError, Result};
use crate::events::FocusEvent;
use crate::models::{ClassifierFamily, ModelReadiness};
use crate::verdict::DistractionVerdict;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How long a freshly acquired camera may take to deliver its first frame
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

impl DetectionEngine {
    /// Start a detection session.
    ///
    /// A no-op while a session is already running. When the camera cannot be
    /// acquired the engine returns to `Idle`, the listeners receive the
    /// terminal `none` verdict and the camera error is returned.
    pub async fn start(&self) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock().await;

        {
            let mut shared = self.inner.shared.lock();
            if shared.state != EngineState::Idle {
                debug!("Start ignored, engine is {:?}", shared.state);
                return Ok(());
            }
            self.inner.set_state(&mut shared, EngineState::Starting);
        }

        info!("Starting distraction detection");
        self.inner.ensure_models_loading();

        let mut stream = match self.inner.source.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to acquire camera: {}", e);
                self.inner.abort_start(&e).await;
                return Err(e.into());
            }
        };
        self.inner.events.emit(FocusEvent::CameraStatusChanged {
            connected: true,
            timestamp: SystemTime::now(),
        });

        let playing = match tokio::time::timeout(FIRST_FRAME_TIMEOUT, stream.wait_playing()).await {
            Ok(result) => result,
            Err(_) => Err(CameraError::StreamLost {
                details: format!("No frame within {:?}", FIRST_FRAME_TIMEOUT),
            }),
        };
        if let Err(e) = playing {
            error!("Camera never started playing: {}", e);
            self.inner.abort_start(&e).await;
            return Err(e.into());
        }

        let session_id = {
            let mut shared = self.inner.shared.lock();
            shared.generation += 1;
            shared.clear_signals();

            let generation = shared.generation;
            let cancel = CancellationToken::new();
            let mut tasks = Vec::new();

            if self.inner.family_enabled(ClassifierFamily::Object) {
                tasks.push(tokio::spawn(Arc::clone(&self.inner).run_object_loop(
                    generation,
                    cancel.clone(),
                    stream.clone(),
                )));
            }
            if self.inner.family_enabled(ClassifierFamily::Face) {
                tasks.push(tokio::spawn(Arc::clone(&self.inner).run_face_loop(
                    generation,
                    cancel.clone(),
                    stream.clone(),
                )));
            }

            let id = Uuid::new_v4().to_string();
            shared.session = Some(Session {
                id: id.clone(),
                cancel,
                tasks,
            });
            self.inner.set_state(&mut shared, EngineState::Running);
            id
        };

        info!("Detection session {} running", session_id);

        if self.inner.all_models_failed() {
            let e = self.inner.model_failure();
            self.inner
                .fail_session_locked(&format!("No classifier available: {}", e))
                .await;
            return Err(e.into());
        }

        Ok(())
    }

    /// End the current session.
    ///
    /// Clears both timers, releases the camera, clears the overlay, resets
    /// every counter and always finishes with the `none` verdict. A no-op
    /// while idle. In-flight inference results are discarded.
    pub async fn stop(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;

        if self.inner.shared.lock().state == EngineState::Idle {
            debug!("Stop ignored, engine is idle");
            return;
        }

        info!("Stopping distraction detection");
        self.inner.teardown(EngineState::Stopping).await;
    }

    /// Begin loading every enabled classifier family in the background
    pub fn preload_models(&self) {
        self.inner.ensure_models_loading();
    }
}

impl EngineInner {
    /// Spawn one load per enabled family, at most once per engine
    pub(super) fn ensure_models_loading(self: &Arc<Self>) {
        for family in [ClassifierFamily::Object, ClassifierFamily::Face] {
            if !self.family_enabled(family) {
                continue;
            }

            let requested = match family {
                ClassifierFamily::Object => &self.object_load_requested,
                ClassifierFamily::Face => &self.face_load_requested,
            };
            if requested.swap(true, Ordering::SeqCst) {
                continue;
            }

            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.events.emit(FocusEvent::ModelReadinessChanged {
                    family,
                    readiness: ModelReadiness::Loading,
                });

                let result = inner.registry.load(family).await;

                inner.events.emit(FocusEvent::ModelReadinessChanged {
                    family,
                    readiness: inner.registry.readiness(family),
                });

                if let Err(e) = result {
                    inner.events.emit(FocusEvent::SystemError {
                        component: format!("{}_model", family),
                        error: e.to_string(),
                    });
                    inner.on_model_failed(family).await;
                }
            });
        }
    }

    /// True when every enabled family failed to load
    pub(super) fn all_models_failed(&self) -> bool {
        let enabled: Vec<ClassifierFamily> = [ClassifierFamily::Object, ClassifierFamily::Face]
            .into_iter()
            .filter(|family| self.family_enabled(*family))
            .collect();

        !enabled.is_empty()
            && enabled
                .iter()
                .all(|family| matches!(self.registry.readiness(*family), ModelReadiness::Failed(_)))
    }

    pub(super) fn model_failure(&self) -> ModelError {
        for family in [ClassifierFamily::Object, ClassifierFamily::Face] {
            if let ModelReadiness::Failed(details) = self.registry.readiness(family) {
                return ModelError::LoadFailed { family, details };
            }
        }
        ModelError::NotReady(ClassifierFamily::Object)
    }

    async fn on_model_failed(self: &Arc<Self>, family: ClassifierFamily) {
        if !self.all_models_failed() {
            warn!("{} classifier unavailable, continuing without it", family);
            return;
        }

        let _lifecycle = self.lifecycle.lock().await;
        if self.shared.lock().state != EngineState::Running {
            return;
        }
        let e = self.model_failure();
        self.fail_session_locked(&format!("No classifier available: {}", e))
            .await;
    }

    /// Tear down the session started under `generation` after a fault
    pub(super) async fn fail_session(self: &Arc<Self>, generation: u64, reason: String) {
        let _lifecycle = self.lifecycle.lock().await;
        {
            let shared = self.shared.lock();
            if shared.generation != generation || shared.state != EngineState::Running {
                debug!("Ignoring stale failure: {}", reason);
                return;
            }
        }
        self.fail_session_locked(&reason).await;
    }

    /// Running -> Failed -> Idle. Caller holds the lifecycle lock.
    async fn fail_session_locked(&self, reason: &str) {
        error!("Detection session failed: {}", reason);
        self.events.emit(FocusEvent::SystemError {
            component: "engine".to_string(),
            error: reason.to_string(),
        });
        self.teardown(EngineState::Failed).await;
    }

    /// Shared exit path for stop and failure. Caller holds the lifecycle lock.
    async fn teardown(&self, via: EngineState) {
        let session = {
            let mut shared = self.shared.lock();
            shared.generation += 1;
            self.set_state(&mut shared, via);
            shared.session.take()
        };

        if let Some(session) = session {
            // Loops exit at their next await point; an inference already in
            // flight finishes and its result is dropped by the generation check
            session.cancel.cancel();
            debug!(
                "Session {} cancelled ({} timers)",
                session.id,
                session.tasks.len()
            );
        }

        self.source.release().await;
        self.events.emit(FocusEvent::CameraStatusChanged {
            connected: false,
            timestamp: SystemTime::now(),
        });
        self.events.emit(FocusEvent::OverlayCleared);

        let mut shared = self.shared.lock();
        shared.clear_signals();
        self.set_state(&mut shared, EngineState::Idle);
        self.publish_verdict(shared, DistractionVerdict::none());
        info!("Detection stopped");
    }

    /// Starting -> Idle after the camera could not be brought up
    async fn abort_start(&self, cause: &CameraError) {
        self.source.release().await;
        self.events.emit(FocusEvent::SystemError {
            component: "camera".to_string(),
            error: cause.to_string(),
        });

        let mut shared = self.shared.lock();
        shared.clear_signals();
        self.set_state(&mut shared, EngineState::Idle);
        self.publish_verdict(shared, DistractionVerdict::none());
    }
}
