use super::builder::DetectionEngineBuilder;
use super::types::{EngineState, EngineStatus, VerdictListener};
use crate::camera::FrameSource;
use crate::classifier::{FaceSignalClassifier, ObjectSignalClassifier, ObjectSignals};
use crate::config::DetectionConfig;
use crate::events::{EventBus, FocusEvent};
use crate::hysteresis::HysteresisEngine;
use crate::models::{ClassifierFamily, ModelRegistry};
use crate::verdict::{self, DistractionVerdict};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One live detection run
pub(super) struct Session {
    pub(super) id: String,
    pub(super) cancel: CancellationToken,
    pub(super) tasks: Vec<JoinHandle<()>>,
}

/// Everything a tick may read or write, guarded by one lock so a tick's
/// counter updates and the verdict it resolves are seen together.
pub(super) struct SharedState {
    pub(super) state: EngineState,
    pub(super) session: Option<Session>,
    /// Bumped on every session start and end. Tick results tagged with an
    /// older generation are discarded.
    pub(super) generation: u64,
    pub(super) hysteresis: HysteresisEngine,
    pub(super) objects: ObjectSignals,
    pub(super) face_detected: Option<bool>,
    pub(super) verdict: DistractionVerdict,
    /// Verdicts stored but not yet handed to the listeners, oldest first
    pub(super) pending: VecDeque<DistractionVerdict>,
}

impl SharedState {
    /// Forget every per-session measurement
    pub(super) fn clear_signals(&mut self) {
        self.hysteresis.reset_all();
        self.objects = ObjectSignals::default();
        self.face_detected = None;
    }
}

pub(super) struct EngineInner {
    pub(super) detection: DetectionConfig,
    pub(super) source: Arc<dyn FrameSource>,
    pub(super) registry: ModelRegistry,
    pub(super) object_classifier: ObjectSignalClassifier,
    pub(super) face_classifier: FaceSignalClassifier,
    pub(super) events: EventBus,
    pub(super) listeners: RwLock<Vec<Arc<dyn VerdictListener>>>,
    pub(super) shared: Mutex<SharedState>,
    /// Held by whichever task is delivering pending verdicts
    pub(super) notify: Mutex<()>,
    /// Serializes start, stop and failure teardown
    pub(super) lifecycle: tokio::sync::Mutex<()>,
    pub(super) object_load_requested: AtomicBool,
    pub(super) face_load_requested: AtomicBool,
}

impl EngineInner {
    pub(super) fn family_enabled(&self, family: ClassifierFamily) -> bool {
        match family {
            ClassifierFamily::Object => self.detection.object_detection_enabled,
            ClassifierFamily::Face => self.detection.face_detection_enabled,
        }
    }

    pub(super) fn set_state(&self, shared: &mut SharedState, state: EngineState) {
        if shared.state == state {
            return;
        }
        debug!("Engine state {:?} -> {:?}", shared.state, state);
        shared.state = state;
        self.events.emit(FocusEvent::EngineStateChanged {
            state,
            session_id: shared.session.as_ref().map(|s| s.id.clone()),
        });
    }

    /// Store `verdict` and queue it for the listeners.
    ///
    /// Listeners run after the state lock is released, so they may query
    /// the engine. Delivery keeps the order in which verdicts were stored.
    pub(super) fn publish_verdict(
        &self,
        mut shared: MutexGuard<'_, SharedState>,
        verdict: DistractionVerdict,
    ) {
        shared.verdict = verdict.clone();
        shared.pending.push_back(verdict);
        drop(shared);

        self.deliver_pending();
    }

    fn deliver_pending(&self) {
        loop {
            let Some(delivering) = self.notify.try_lock() else {
                // The current deliverer picks up our verdict
                return;
            };

            loop {
                let next = self.shared.lock().pending.pop_front();
                let Some(verdict) = next else { break };

                info!("Verdict: {} (distracted: {})", verdict.kind, verdict.distracted);
                self.events.emit(FocusEvent::VerdictChanged {
                    verdict: verdict.clone(),
                    timestamp: SystemTime::now(),
                });
                let listeners = self.listeners.read().clone();
                for listener in listeners {
                    listener.on_verdict_change(&verdict);
                }
            }

            drop(delivering);
            if self.shared.lock().pending.is_empty() {
                return;
            }
        }
    }

    /// Resolve the verdict from the current signals and publish it if the
    /// kind changed
    pub(super) fn refresh_verdict(&self, shared: MutexGuard<'_, SharedState>) {
        let kind = verdict::resolve(&shared.objects, &shared.hysteresis);
        if kind != shared.verdict.kind {
            self.publish_verdict(shared, DistractionVerdict::from_kind(kind));
        }
    }
}

/// Multi-signal distraction detector.
///
/// Cheap to clone; clones share the same session and listeners.
#[derive(Clone)]
pub struct DetectionEngine {
    pub(super) inner: Arc<EngineInner>,
}

impl DetectionEngine {
    pub fn builder() -> DetectionEngineBuilder {
        DetectionEngineBuilder::new()
    }

    /// Register a listener for verdict-kind changes
    pub fn on_verdict_change<L>(&self, listener: L)
    where
        L: VerdictListener + 'static,
    {
        self.inner.listeners.write().push(Arc::new(listener));
    }

    pub fn state(&self) -> EngineState {
        self.inner.shared.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    pub fn verdict(&self) -> DistractionVerdict {
        self.inner.shared.lock().verdict.clone()
    }

    pub fn status(&self) -> EngineStatus {
        let shared = self.inner.shared.lock();
        EngineStatus {
            state: shared.state,
            session_id: shared.session.as_ref().map(|s| s.id.clone()),
            verdict: shared.verdict.clone(),
            counters: shared.hysteresis.counters(),
            thresholds: shared.hysteresis.thresholds(),
            face_detected: shared.face_detected,
            object_readiness: self.inner.registry.readiness(ClassifierFamily::Object),
            face_readiness: self.inner.registry.readiness(ClassifierFamily::Face),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FocusEvent> {
        self.inner.events.subscribe()
    }
}
