//! The video source contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use vidframe_common::error::VidframeResult;

use crate::frame::VideoFrame;

/// Playback state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Paused,
    Playing,
    /// Reached the end with looping off.
    Ended,
}

/// Decoded stream properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Natural pixel width.
    pub width: u32,
    /// Natural pixel height.
    pub height: u32,
    pub duration_secs: f64,
    pub frame_rate: f64,
}

impl VideoMetadata {
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Whether a frame of this source can be rendered.
    pub fn has_picture(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// A decodable video handle.
///
/// Owned by the caller. The recording pipeline mutates its position and
/// loop flag for the duration of an export and restores both afterwards.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Metadata, if already known.
    fn metadata(&self) -> Option<VideoMetadata>;

    /// Wait until metadata (duration in particular) is known.
    async fn wait_for_metadata(&self) -> VidframeResult<VideoMetadata>;

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    fn state(&self) -> PlaybackState;

    /// Watch playback state changes. `Ended` is the end notification.
    fn subscribe(&self) -> watch::Receiver<PlaybackState>;

    /// Seek and wait until the frame at `secs` is available.
    async fn seek(&self, secs: f64) -> VidframeResult<()>;

    async fn play(&self) -> VidframeResult<()>;

    async fn pause(&self) -> VidframeResult<()>;

    fn is_looping(&self) -> bool;

    fn set_looping(&self, looping: bool);

    /// The frame at the current position, at natural resolution.
    fn current_frame(&self) -> Option<VideoFrame>;
}
