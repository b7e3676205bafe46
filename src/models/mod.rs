mod registry;
mod scripted;

pub use registry::ModelRegistry;
pub use scripted::{
    synthetic_landmarks, FaceScript, ObjectScript, Scenario, ScenarioLoader, ScriptedFaceBackend,
    ScriptedObjectBackend,
};

use crate::classifier::{FaceDetection, ObjectPrediction};
use crate::error::{ModelError, Result};
use crate::frame::FrameData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The two independent inference pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassifierFamily {
    Object,
    Face,
}

impl ClassifierFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierFamily::Object => "object",
            ClassifierFamily::Face => "face",
        }
    }
}

impl fmt::Display for ClassifierFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load state of one classifier family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelReadiness {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

impl ModelReadiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelReadiness::Ready)
    }
}

/// Opaque object-detection model
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    async fn detect(&self, frame: &FrameData) -> Result<Vec<ObjectPrediction>>;
}

/// Opaque face detector with 68-point landmarks and expression scores
#[async_trait]
pub trait FaceBackend: Send + Sync {
    async fn detect(&self, frame: &FrameData) -> Result<Vec<FaceDetection>>;
}

/// Produces the backends for both families; each method is called at most
/// once per registry.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_object(&self) -> std::result::Result<Arc<dyn ObjectBackend>, ModelError>;
    async fn load_face(&self) -> std::result::Result<Arc<dyn FaceBackend>, ModelError>;
}
