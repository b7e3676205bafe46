mod builder;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod gst;
mod synthetic;
#[cfg(test)]
mod tests;

pub use builder::FrameSourceBuilder;
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gst::GstCamera;
pub use synthetic::SyntheticCamera;

use crate::error::CameraError;
use crate::frame::FrameData;
use async_trait::async_trait;
use tokio::sync::watch;

/// A live camera device.
///
/// A source is acquired by at most one session at a time. `acquire` on an
/// already-acquired source hands back the existing stream, and `release` is
/// safe to call any number of times.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Start the device and attach a stream. Fails fast when the device is
    /// busy or permission is denied.
    async fn acquire(&self) -> Result<FrameStream, CameraError>;

    /// Stop every underlying track and detach the stream from consumers
    async fn release(&self);

    fn is_acquired(&self) -> bool;
}

/// Consumer handle onto the most recent frame of an acquired source
#[derive(Debug, Clone)]
pub struct FrameStream {
    receiver: watch::Receiver<Option<FrameData>>,
}

impl FrameStream {
    pub fn new(receiver: watch::Receiver<Option<FrameData>>) -> Self {
        Self { receiver }
    }

    /// The latest frame, or `None` before the device delivered anything
    pub fn latest(&self) -> Option<FrameData> {
        self.receiver.borrow().clone()
    }

    /// False once the source stopped publishing, either released or lost
    pub fn is_live(&self) -> bool {
        self.receiver.has_changed().is_ok()
    }

    /// Wait until the source delivers its first frame
    pub async fn wait_playing(&mut self) -> Result<(), CameraError> {
        self.receiver
            .wait_for(Option::is_some)
            .await
            .map(|_| ())
            .map_err(|_| CameraError::StreamLost {
                details: "Camera stopped before delivering a frame".to_string(),
            })
    }
}
