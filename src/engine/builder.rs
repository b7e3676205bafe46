use super::scheduler::{DetectionEngine, EngineInner, SharedState};
use super::types::{EngineState, VerdictListener};
use crate::camera::FrameSource;
use crate::classifier::{FaceSignalClassifier, ObjectSignalClassifier, ObjectSignals};
use crate::config::FocusConfig;
use crate::error::{FocusError, Result};
use crate::events::EventBus;
use crate::hysteresis::{HysteresisEngine, SignalThresholds};
use crate::models::{ModelLoader, ModelRegistry};
use crate::verdict::DistractionVerdict;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Builder for the detection engine
pub struct DetectionEngineBuilder {
    config: FocusConfig,
    source: Option<Arc<dyn FrameSource>>,
    loader: Option<Arc<dyn ModelLoader>>,
    event_bus: Option<EventBus>,
    listeners: Vec<Arc<dyn VerdictListener>>,
}

impl DetectionEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: FocusConfig::default(),
            source: None,
            loader: None,
            event_bus: None,
            listeners: Vec::new(),
        }
    }

    pub fn config(mut self, config: FocusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn frame_source(mut self, source: Arc<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn model_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: VerdictListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Build the engine. With `preload_models` set this spawns the model
    /// loads, so it must run inside a tokio runtime.
    pub fn build(self) -> Result<DetectionEngine> {
        let source = self
            .source
            .ok_or_else(|| FocusError::system("A frame source must be specified"))?;
        let loader = self
            .loader
            .ok_or_else(|| FocusError::system("A model loader must be specified"))?;

        self.config.validate()?;

        let thresholds = &self.config.thresholds;
        let events = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(self.config.system.event_bus_capacity));

        let inner = Arc::new(EngineInner {
            detection: self.config.detection.clone(),
            source,
            registry: ModelRegistry::new(loader),
            object_classifier: ObjectSignalClassifier::from_config(thresholds),
            face_classifier: FaceSignalClassifier::from_config(thresholds),
            events,
            listeners: RwLock::new(self.listeners),
            shared: Mutex::new(SharedState {
                state: EngineState::Idle,
                session: None,
                generation: 0,
                hysteresis: HysteresisEngine::new(SignalThresholds::from(thresholds)),
                objects: ObjectSignals::default(),
                face_detected: None,
                verdict: DistractionVerdict::none(),
                pending: VecDeque::new(),
            }),
            notify: Mutex::new(()),
            lifecycle: tokio::sync::Mutex::new(()),
            object_load_requested: AtomicBool::new(false),
            face_load_requested: AtomicBool::new(false),
        });

        let engine = DetectionEngine { inner };
        if self.config.detection.preload_models {
            engine.preload_models();
        }
        Ok(engine)
    }
}

impl Default for DetectionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
