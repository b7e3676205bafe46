use crate::models::ClassifierFamily;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FocusError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Inference failed in {family} classifier: {details}")]
    Inference {
        family: ClassifierFamily,
        details: String,
    },

    #[error("System error: {message}")]
    System { message: String },
}

/// Errors raised by a frame source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Permission denied or device busy. Never retried.
    #[error("Camera device unavailable: {details}")]
    DeviceUnavailable { details: String },

    #[error("Camera stream lost: {details}")]
    StreamLost { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },
}

/// Errors raised while loading or using a classifier backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Failed to load {family} model: {details}")]
    LoadFailed {
        family: ClassifierFamily,
        details: String,
    },

    #[error("{0} model is not ready")]
    NotReady(ClassifierFamily),
}

/// Errors raised by the event bus
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

impl FocusError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn inference<S: Into<String>>(family: ClassifierFamily, details: S) -> Self {
        Self::Inference {
            family,
            details: details.into(),
        }
    }
}

impl CameraError {
    pub fn unavailable<S: Into<String>>(details: S) -> Self {
        Self::DeviceUnavailable {
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;
