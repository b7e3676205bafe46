use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// RGB24 format - uncompressed RGB data
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Rgb24 => 3,
        }
    }
}

/// One video frame as handed to the classifiers
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Monotonic frame identifier within a stream
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared so ticks can hold a frame cheaply)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Black RGB frame of the given size
    pub fn blank(id: u64, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * FrameFormat::Rgb24.bytes_per_pixel();
        Self::new(
            id,
            SystemTime::now(),
            vec![0u8; len],
            width,
            height,
            FrameFormat::Rgb24,
        )
    }

    /// True once the frame carries usable spatial dimensions.
    ///
    /// A stream that has been attached but has not yet negotiated its caps
    /// reports zero-sized frames; face inference must not run on those.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_is_rgb() {
        let frame = FrameData::blank(7, 640, 480);

        assert_eq!(frame.id, 7);
        assert_eq!(frame.format, FrameFormat::Rgb24);
        assert!(frame.has_dimensions());
        assert_eq!(frame.data.len(), 640 * 480 * 3);
    }

    #[test]
    fn test_zero_sized_frame_has_no_dimensions() {
        let frame = FrameData::new(1, SystemTime::now(), Vec::new(), 0, 0, FrameFormat::Rgb24);
        assert!(!frame.has_dimensions());

        let half = FrameData::new(2, SystemTime::now(), Vec::new(), 640, 0, FrameFormat::Rgb24);
        assert!(!half.has_dimensions());
    }
}
