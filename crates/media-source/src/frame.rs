//! Decoded video frames.

use std::sync::Arc;

use vidframe_common::error::{VidframeError, VidframeResult};

/// One decoded frame at natural resolution.
///
/// Pixels are straight (non-premultiplied) RGBA, row-major, no row padding.
/// The pixel buffer is shared so handing a frame to the compositor never
/// copies it.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Presentation time in seconds.
    pub timestamp_secs: f64,
    data: Arc<Vec<u8>>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, timestamp_secs: f64, data: Vec<u8>) -> VidframeResult<Self> {
        if width == 0 || height == 0 {
            return Err(VidframeError::source_not_ready("Frame has zero size"));
        }
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(VidframeError::invalid_input(format!(
                "Frame buffer is {} bytes, expected {expected} for {width}x{height} RGBA",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            timestamp_secs,
            data: Arc::new(data),
        })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(pixels * 4).collect();
        Self {
            width,
            height,
            timestamp_secs: 0.0,
            data: Arc::new(data),
        }
    }

    /// Size in bytes of an RGBA frame.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether both frames hold the same decoded buffer.
    pub fn shares_pixels(&self, other: &VideoFrame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn with_timestamp(mut self, timestamp_secs: f64) -> Self {
        self.timestamp_secs = timestamp_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_buffer() {
        let err = VideoFrame::new(4, 4, 0.0, vec![0; 10]).unwrap_err();
        assert!(matches!(err, VidframeError::InvalidInput { .. }));
    }

    #[test]
    fn test_rejects_zero_size() {
        let err = VideoFrame::new(0, 4, 0.0, Vec::new()).unwrap_err();
        assert!(matches!(err, VidframeError::SourceNotReady { .. }));
    }

    #[test]
    fn test_shares_pixels_tracks_the_buffer_not_the_timestamp() {
        let frame = VideoFrame::solid(2, 2, [9, 9, 9, 255]);
        let retimed = frame.clone().with_timestamp(1.5);
        let twin = VideoFrame::solid(2, 2, [9, 9, 9, 255]);
        assert!(frame.shares_pixels(&retimed));
        assert!(!frame.shares_pixels(&twin));
    }

    #[test]
    fn test_solid_fills_every_pixel() {
        let frame = VideoFrame::solid(3, 2, [1, 2, 3, 255]);
        assert_eq!(frame.data().len(), 24);
        assert!(frame.data().chunks(4).all(|px| px == [1, 2, 3, 255]));
    }
}
