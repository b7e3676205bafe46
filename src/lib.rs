pub mod app;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod hysteresis;
pub mod models;
pub mod verdict;

pub use app::{AlertPresenter, AppCommand, FocusApp, ShutdownReason};
pub use camera::{FrameSource, FrameSourceBuilder, FrameStream, SyntheticCamera};
pub use classifier::{
    FaceDetection, FaceLandmarks, FaceObservation, FaceSignalClassifier, ObjectPrediction,
    ObjectSignal, ObjectSignalClassifier, ObjectSignals,
};
pub use config::FocusConfig;
pub use engine::{DetectionEngine, DetectionEngineBuilder, EngineState, EngineStatus, VerdictListener};
pub use error::{CameraError, FocusError, ModelError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, FocusEvent};
pub use frame::{FrameData, FrameFormat};
pub use hysteresis::{FaceSignal, HysteresisEngine, SignalCounters, SignalThresholds};
pub use models::{
    ClassifierFamily, FaceBackend, ModelLoader, ModelReadiness, ModelRegistry, ObjectBackend,
    Scenario, ScenarioLoader,
};
pub use verdict::{DistractionKind, DistractionVerdict};
