use super::{FrameSource, SyntheticCamera};
use crate::config::{CameraBackend, CameraConfig};
use crate::error::{FocusError, Result};
use std::sync::Arc;

/// Builds the configured frame source
pub struct FrameSourceBuilder {
    config: Option<CameraConfig>,
}

impl FrameSourceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Arc<dyn FrameSource>> {
        let config = self
            .config
            .ok_or_else(|| FocusError::system("Camera configuration must be specified"))?;

        match config.backend {
            CameraBackend::Synthetic => Ok(Arc::new(SyntheticCamera::new(config))),
            CameraBackend::Gstreamer => Self::build_gstreamer(config),
        }
    }

    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn build_gstreamer(config: CameraConfig) -> Result<Arc<dyn FrameSource>> {
        Ok(Arc::new(super::GstCamera::new(config)?))
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    fn build_gstreamer(_config: CameraConfig) -> Result<Arc<dyn FrameSource>> {
        Err(crate::error::CameraError::Configuration {
            details: "GStreamer capture requires the `camera` feature on Linux".to_string(),
        }
        .into())
    }
}

impl Default for FrameSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
