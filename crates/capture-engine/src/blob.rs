//! Captured container data.

use serde::Serialize;

use vidframe_frame_model::ExportFormat;

use crate::codec::CaptureCodec;

/// An encoded container held in memory, tagged with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    /// Media type, possibly with a `codecs` parameter.
    pub mime: String,
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Join chunks in arrival order.
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime: impl Into<String>) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }
        Self::new(bytes, mime)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Container format named by the media type.
    pub fn format(&self) -> Option<ExportFormat> {
        ExportFormat::from_mime(&self.mime)
    }
}

/// Counters for one recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CaptureStats {
    /// Frames handed to the encoder.
    pub frames_captured: u64,
    /// Ticks skipped because no video frame was available.
    pub frames_dropped: u64,
    pub chunks: u64,
    pub bytes: u64,
}

impl CaptureStats {
    /// Drop rate as a percentage.
    pub fn drop_rate(&self) -> f64 {
        let total = self.frames_captured + self.frames_dropped;
        if total == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / total as f64 * 100.0
    }
}

/// Result of a successful recording.
#[derive(Debug, Clone)]
pub struct RecordedMedia {
    pub blob: MediaBlob,
    pub codec: CaptureCodec,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Wall-clock length of the capture.
    pub duration_secs: f64,
    pub stats: CaptureStats,
}
