//! Scoped playback restoration.

use vidframe_common::error::VidframeResult;

use crate::source::{PlaybackState, VideoSource};

/// Playback state captured before an export takes over a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub position: f64,
    pub looping: bool,
    pub state: PlaybackState,
}

impl PlaybackSnapshot {
    pub fn capture(source: &dyn VideoSource) -> Self {
        Self {
            position: source.position(),
            looping: source.is_looping(),
            state: source.state(),
        }
    }

    /// Put the source back: loop flag and position as captured, paused.
    ///
    /// The loop flag and pause are applied even if the seek fails; the
    /// first error is returned.
    pub async fn restore(&self, source: &dyn VideoSource) -> VidframeResult<()> {
        source.set_looping(self.looping);
        let paused = source.pause().await;
        let seeked = source.seek(self.position).await;

        tracing::debug!(
            position = self.position,
            looping = self.looping,
            "Restored source playback"
        );
        paused.and(seeked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeVideoSource, SourceCall};

    #[tokio::test]
    async fn test_restore_puts_back_loop_and_position() {
        let source = FakeVideoSource::new(32, 18, 10.0).with_looping(true);
        source.seek(3.0).await.unwrap();
        let snapshot = PlaybackSnapshot::capture(&source);
        assert!(snapshot.looping);

        source.set_looping(false);
        source.seek(0.0).await.unwrap();
        source.play().await.unwrap();

        snapshot.restore(&source).await.unwrap();
        assert!(source.is_looping());
        assert_eq!(source.state(), PlaybackState::Paused);
        assert_eq!(source.position(), 3.0);
    }

    #[tokio::test]
    async fn test_restore_pauses_even_when_seek_fails() {
        let source = FakeVideoSource::new(32, 18, 10.0);
        let snapshot = PlaybackSnapshot::capture(&source);
        source.play().await.unwrap();
        source.fail_seeks();

        assert!(snapshot.restore(&source).await.is_err());
        assert_eq!(source.state(), PlaybackState::Paused);
        assert!(source.calls().contains(&SourceCall::Pause));
    }
}
