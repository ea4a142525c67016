//! Vidframe Capture Engine
//!
//! Records the export-mode composition as a real-time encoded stream.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                RecordingPipeline                 │
//! │                                                  │
//! │  VideoSource ──► Compositor ──► Surface (RGBA)   │
//! │   (playing)       30 fps tick        │           │
//! │                                      ▼           │
//! │                              StreamEncoder       │
//! │                          (ffmpeg, vp9/vp8/h264)  │
//! │                                      │ chunks    │
//! │                                      ▼ / 100 ms  │
//! │                                  MediaBlob       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Playback state of the source is captured before recording and restored
//! on every exit path.

pub mod blob;
pub mod cancel;
pub mod codec;
pub mod completion;
pub mod encoder;
pub mod pipeline;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use blob::{CaptureStats, MediaBlob, RecordedMedia};
pub use cancel::CancelFlag;
pub use codec::CaptureCodec;
pub use completion::{completion_pair, CompletionError, CompletionSignal, EncoderCompletion};
pub use encoder::{
    EncoderFactory, EncoderParams, EncoderSession, EncoderSummary, FfmpegEncoderFactory,
    StreamEncoder,
};
pub use pipeline::{RecordingParams, RecordingPipeline, RecordingState};
