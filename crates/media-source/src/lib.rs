//! Vidframe Media Source
//!
//! The decodable video handle the compositor and recording pipeline drive.
//! The handle is owned by the caller; this crate only defines how it is
//! observed and controlled:
//! - **Source:** [`VideoSource`] trait (metadata, position, play/pause/seek,
//!   loop flag, ended notification, current frame)
//! - **Upload:** [`UploadedFile`], a validated video file handle
//! - **Snapshot:** [`PlaybackSnapshot`] for restoring playback after export
//! - **Ffmpeg:** [`FfmpegVideoSource`], file playback through `ffmpeg`

pub mod ffmpeg;
pub mod frame;
pub mod probe;
pub mod snapshot;
pub mod source;
pub mod upload;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use ffmpeg::FfmpegVideoSource;
pub use frame::VideoFrame;
pub use probe::{command_exists, probe_video};
pub use snapshot::PlaybackSnapshot;
pub use source::{PlaybackState, VideoMetadata, VideoSource};
pub use upload::UploadedFile;
