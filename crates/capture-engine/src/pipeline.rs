//! The recording state machine.
//!
//! `Idle → Preparing → Recording → Finalizing → {Complete | Cancelled | Failed}`
//!
//! The source is rewound and played once from the start. Each tick of a
//! fixed-rate interval composites the current frame in export mode and
//! feeds it to a stream encoder; the encoder's chunks are collected until it
//! signals completion.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use vidframe_common::clock::{frame_interval, RecordingClock};
use vidframe_common::config::ExportDefaults;
use vidframe_common::error::{VidframeError, VidframeResult};
use vidframe_frame_model::GradientSpec;
use vidframe_geometry::RenderGeometry;
use vidframe_media_source::{PlaybackSnapshot, PlaybackState, VideoFrame, VideoSource};
use vidframe_render_engine::{Compositor, RenderMode, SharedSurface, SurfaceClaim, SurfaceMode};

use crate::blob::{CaptureStats, MediaBlob, RecordedMedia};
use crate::cancel::CancelFlag;
use crate::completion::CompletionError;
use crate::encoder::{EncoderFactory, EncoderParams, EncoderSession};

const DRIFT_THRESHOLD_MS: f64 = 100.0;

/// Recording pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    /// Waiting for metadata and the rewind to frame zero.
    Preparing,
    /// Source playing, frames flowing into the encoder.
    Recording,
    /// Waiting for the encoder's final chunk.
    Finalizing,
    Complete,
    Cancelled,
    Failed,
}

impl RecordingState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

/// What to record.
#[derive(Debug, Clone)]
pub struct RecordingParams {
    /// Export-mode geometry; its canvas size is the stream size.
    pub geometry: RenderGeometry,
    pub gradient: GradientSpec,
    pub fps: u32,
    pub flush_interval: Duration,
}

impl RecordingParams {
    pub fn new(geometry: RenderGeometry, gradient: GradientSpec) -> Self {
        Self::from_defaults(&ExportDefaults::default(), geometry, gradient)
    }

    pub fn from_defaults(
        defaults: &ExportDefaults,
        geometry: RenderGeometry,
        gradient: GradientSpec,
    ) -> Self {
        Self {
            geometry,
            gradient,
            fps: defaults.capture_fps,
            flush_interval: Duration::from_millis(defaults.flush_interval_ms),
        }
    }
}

/// Drives a [`VideoSource`] through one playback while encoding the
/// export-mode composition.
pub struct RecordingPipeline {
    source: Arc<dyn VideoSource>,
    surface: SharedSurface,
    encoders: Arc<dyn EncoderFactory>,
    compositor: Compositor,
    state_tx: watch::Sender<RecordingState>,
}

impl RecordingPipeline {
    pub fn new(
        source: Arc<dyn VideoSource>,
        surface: SharedSurface,
        encoders: Arc<dyn EncoderFactory>,
    ) -> Self {
        let (state_tx, _) = watch::channel(RecordingState::Idle);
        Self {
            source,
            surface,
            encoders,
            compositor: Compositor::new(),
            state_tx,
        }
    }

    pub fn state(&self) -> RecordingState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.state_tx.subscribe()
    }

    /// Record one full playback of the source.
    ///
    /// The source's position and loop flag are restored and playback is
    /// left paused on every exit path. A set `cancel` flag ends the run with
    /// [`VidframeError::UserCancelled`] and no blob.
    pub async fn record(
        &mut self,
        params: &RecordingParams,
        cancel: &CancelFlag,
    ) -> VidframeResult<RecordedMedia> {
        if params.fps == 0 {
            return Err(VidframeError::invalid_input("Capture frame rate must be positive"));
        }

        let claim = match self.surface.claim(SurfaceMode::Export) {
            Ok(claim) => claim,
            Err(e) => {
                self.set_state(RecordingState::Failed);
                return Err(e);
            }
        };

        self.set_state(RecordingState::Preparing);
        let snapshot = PlaybackSnapshot::capture(self.source.as_ref());

        let result = self.run(&claim, params, cancel).await;

        if let Err(e) = snapshot.restore(self.source.as_ref()).await {
            tracing::warn!(error = %e, "Failed to restore source playback");
        }
        drop(claim);
        self.compositor.reset();

        match &result {
            Ok(media) => {
                tracing::info!(
                    codec = media.codec.label(),
                    bytes = media.blob.len(),
                    frames = media.stats.frames_captured,
                    dropped = media.stats.frames_dropped,
                    duration_secs = media.duration_secs,
                    "Recording complete"
                );
                self.set_state(RecordingState::Complete);
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("Recording cancelled");
                self.set_state(RecordingState::Cancelled);
            }
            Err(e) => {
                tracing::error!(error = %e, "Recording failed");
                self.set_state(RecordingState::Failed);
            }
        }
        result
    }

    async fn run(
        &mut self,
        claim: &SurfaceClaim,
        params: &RecordingParams,
        cancel: &CancelFlag,
    ) -> VidframeResult<RecordedMedia> {
        check_cancelled(cancel)?;

        let metadata = match self.source.metadata() {
            Some(metadata) => metadata,
            None => {
                tracing::debug!("Waiting for source metadata");
                self.source.wait_for_metadata().await?
            }
        };
        if !metadata.has_picture() {
            return Err(VidframeError::source_not_ready("Video has no picture"));
        }
        if !(metadata.duration_secs.is_finite() && metadata.duration_secs > 0.0) {
            return Err(VidframeError::source_not_ready("Video duration is unknown"));
        }
        if !params.geometry.is_renderable() {
            return Err(VidframeError::source_not_ready("Export geometry is empty"));
        }

        self.source.pause().await?;
        self.source.set_looping(false);
        self.source.seek(0.0).await?;
        check_cancelled(cancel)?;

        let mut playback = self.source.subscribe();
        playback.borrow_and_update();

        let (width, height) = params.geometry.canvas_size();
        let EncoderSession {
            mut encoder,
            mut chunks,
            completion,
        } = self
            .encoders
            .start(EncoderParams {
                width,
                height,
                fps: params.fps,
                flush_interval: params.flush_interval,
            })
            .await?;
        let codec = encoder.codec();

        tracing::info!(
            width,
            height,
            fps = params.fps,
            codec = codec.label(),
            encoder = self.encoders.name(),
            duration_secs = metadata.duration_secs,
            "Recording started"
        );
        self.set_state(RecordingState::Recording);

        let clock = RecordingClock::start();
        if let Err(e) = self.source.play().await {
            encoder.abort().await;
            return Err(e);
        }

        let mut ticker = tokio::time::interval(frame_interval(params.fps));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut collected: Vec<Vec<u8>> = Vec::new();
        let mut stats = CaptureStats::default();
        let mut chunks_open = true;
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                biased;

                changed = playback.changed() => {
                    let ended = changed.is_err()
                        || *playback.borrow_and_update() == PlaybackState::Ended;
                    if ended {
                        break;
                    }
                }

                chunk = chunks.recv(), if chunks_open => match chunk {
                    Some(chunk) => collected.push(chunk),
                    None => chunks_open = false,
                },

                _ = ticker.tick() => {
                    if cancel.is_cancelled() {
                        encoder.abort().await;
                        return Err(VidframeError::UserCancelled);
                    }

                    ticks += 1;
                    match self.source.current_frame() {
                        Some(frame) => {
                            let pushed = match self.compose(claim, &frame, params) {
                                Ok(rgba) => encoder.push_frame(&rgba).await,
                                Err(e) => Err(e),
                            };
                            if let Err(e) = pushed {
                                encoder.abort().await;
                                return Err(e);
                            }
                            stats.frames_captured += 1;
                        }
                        None => stats.frames_dropped += 1,
                    }

                    if ticks % u64::from(params.fps) == 0 {
                        let drift = clock.frame_drift(ticks, params.fps);
                        if drift.exceeds_threshold_ms(DRIFT_THRESHOLD_MS) {
                            tracing::warn!(
                                drift_ms = drift.drift_ms(),
                                frames = ticks,
                                "Capture clock drift exceeds 100ms"
                            );
                        }
                    }
                }
            }
        }
        let duration_secs = clock.elapsed_secs();

        self.set_state(RecordingState::Finalizing);
        if cancel.is_cancelled() {
            encoder.abort().await;
            return Err(VidframeError::UserCancelled);
        }

        tracing::debug!(frames = stats.frames_captured, "Finalizing encoder");
        if let Err(e) = encoder.finish().await {
            return Err(cancelled_or(cancel, e));
        }
        if chunks_open {
            while let Some(chunk) = chunks.recv().await {
                collected.push(chunk);
            }
        }

        match completion.wait().await {
            Ok(summary) => {
                tracing::debug!(chunks = summary.chunks, bytes = summary.bytes, "Encoder completed");
            }
            Err(CompletionError::Cancelled) => return Err(VidframeError::UserCancelled),
            Err(CompletionError::Failed(message)) => {
                return Err(cancelled_or(cancel, VidframeError::capture(message)));
            }
        }

        stats.chunks = collected.len() as u64;
        stats.bytes = collected.iter().map(|c| c.len() as u64).sum();
        if stats.bytes == 0 {
            return Err(VidframeError::capture("no data recorded"));
        }

        if stats.frames_dropped > 0 {
            tracing::warn!(
                dropped = stats.frames_dropped,
                drop_rate = stats.drop_rate(),
                "Ticks without a video frame"
            );
        }

        Ok(RecordedMedia {
            blob: MediaBlob::from_chunks(collected, codec.mime_type()),
            codec,
            width,
            height,
            fps: params.fps,
            duration_secs,
            stats,
        })
    }

    fn compose(
        &mut self,
        claim: &SurfaceClaim,
        frame: &VideoFrame,
        params: &RecordingParams,
    ) -> VidframeResult<Vec<u8>> {
        let compositor = &mut self.compositor;
        claim.with_surface(|surface| {
            compositor.draw(
                surface,
                frame,
                &params.geometry,
                &params.gradient,
                RenderMode::Export,
            )?;
            Ok(surface.to_rgba())
        })
    }

    fn set_state(&self, state: RecordingState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "Recording state changed");
        }
    }
}

fn check_cancelled(cancel: &CancelFlag) -> VidframeResult<()> {
    if cancel.is_cancelled() {
        return Err(VidframeError::UserCancelled);
    }
    Ok(())
}

/// Failures observed after the caller cancelled are reported as the
/// cancellation.
fn cancelled_or(cancel: &CancelFlag, error: VidframeError) -> VidframeError {
    if cancel.is_cancelled() {
        VidframeError::UserCancelled
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use vidframe_frame_model::{FrameConfig, QualityTier};
    use vidframe_geometry::{DisplayConstraints, Size};
    use vidframe_media_source::fake::FakeVideoSource;

    use crate::codec::CaptureCodec;
    use crate::fake::FakeEncoderFactory;

    fn params(width: u32, height: u32) -> RecordingParams {
        let geometry = RenderGeometry::for_export(
            Size::from_pixels(width, height),
            &FrameConfig::default(),
            &DisplayConstraints::new(Size::new(800.0, 800.0)),
            QualityTier::P720,
        )
        .unwrap();
        RecordingParams::new(geometry, GradientSpec::default())
    }

    fn build(
        source: Arc<FakeVideoSource>,
        factory: FakeEncoderFactory,
    ) -> (RecordingPipeline, SharedSurface) {
        let surface = SharedSurface::new(1, 1).unwrap();
        let pipeline = RecordingPipeline::new(source, surface.clone(), Arc::new(factory));
        (pipeline, surface)
    }

    #[test]
    fn test_params_follow_export_defaults() {
        let p = params(160, 90);
        assert_eq!(p.fps, 30);
        assert_eq!(p.flush_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_terminal_states() {
        assert!(RecordingState::Complete.is_terminal());
        assert!(RecordingState::Cancelled.is_terminal());
        assert!(!RecordingState::Finalizing.is_terminal());
    }

    #[tokio::test]
    async fn test_records_whole_playback() {
        let source = Arc::new(FakeVideoSource::new(160, 90, 0.3));
        let factory = FakeEncoderFactory::new(CaptureCodec::Vp9);
        let log = factory.log();
        let (mut pipeline, surface) = build(Arc::clone(&source), factory);

        let p = params(160, 90);
        let media = pipeline.record(&p, &CancelFlag::new()).await.unwrap();

        assert_eq!(pipeline.state(), RecordingState::Complete);
        assert_eq!(media.blob.mime, CaptureCodec::Vp9.mime_type());
        assert_eq!((media.width, media.height), p.geometry.canvas_size());
        assert!(media.stats.frames_captured > 0);
        assert_eq!(log.frames(), media.stats.frames_captured);
        assert_eq!(media.blob.len() as u64, log.frames() * 4);
        assert!(surface.owner().is_none());
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_never_starts_encoder() {
        let source = Arc::new(FakeVideoSource::new(160, 90, 5.0));
        let factory = FakeEncoderFactory::new(CaptureCodec::Vp9);
        let log = factory.log();
        let (mut pipeline, _) = build(source, factory);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = pipeline.record(&params(160, 90), &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(pipeline.state(), RecordingState::Cancelled);
        assert!(log.params().is_empty());
    }

    #[tokio::test]
    async fn test_surface_held_by_preview_fails_recording() {
        let source = Arc::new(FakeVideoSource::new(160, 90, 5.0));
        let (mut pipeline, surface) = build(source, FakeEncoderFactory::new(CaptureCodec::Vp9));
        let _preview = surface.claim(SurfaceMode::Preview).unwrap();

        assert!(pipeline
            .record(&params(160, 90), &CancelFlag::new())
            .await
            .is_err());
        assert_eq!(pipeline.state(), RecordingState::Failed);
    }

    #[tokio::test]
    async fn test_zero_frame_rate_is_rejected() {
        let source = Arc::new(FakeVideoSource::new(160, 90, 5.0));
        let (mut pipeline, _) = build(source, FakeEncoderFactory::new(CaptureCodec::Vp9));
        let mut p = params(160, 90);
        p.fps = 0;
        assert!(matches!(
            pipeline.record(&p, &CancelFlag::new()).await,
            Err(VidframeError::InvalidInput { .. })
        ));
    }
}
