//! Preview redraw loop.
//!
//! A tokio task ticks at the display refresh rate and, while the source
//! has a frame, composites it in preview mode and hands the surface to a
//! [`PreviewSink`]. The loop holds the preview claim on the shared surface
//! for as long as it runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use vidframe_common::clock::frame_interval;
use vidframe_common::config::PreviewDefaults;
use vidframe_common::error::VidframeResult;
use vidframe_frame_model::{FrameConfig, GradientSpec};
use vidframe_geometry::{DisplayConstraints, GeometryCache, RenderGeometry, Size};
use vidframe_media_source::VideoSource;

use crate::compositor::{Compositor, RenderMode};
use crate::surface::{SharedSurface, Surface, SurfaceClaim, SurfaceMode};

/// Receives every drawn preview frame.
pub trait PreviewSink: Send + Sync {
    fn present(&self, surface: &Surface, geometry: &RenderGeometry) -> VidframeResult<()>;
}

/// Inputs that affect preview geometry. Changing any of them requires a
/// restart.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSettings {
    pub frame: FrameConfig,
    pub gradient: GradientSpec,
    pub constraints: DisplayConstraints,
    pub refresh_rate_hz: u32,
}

impl PreviewSettings {
    pub fn from_defaults(defaults: &PreviewDefaults, frame: FrameConfig, gradient: GradientSpec) -> Self {
        Self {
            frame,
            gradient,
            constraints: DisplayConstraints {
                viewport: Size::new(
                    f64::from(defaults.viewport_width),
                    f64::from(defaults.viewport_height),
                ),
                max_height_fraction: defaults.max_height_fraction,
                min_width: defaults.min_width,
            },
            refresh_rate_hz: defaults.refresh_rate_hz,
        }
    }
}

/// Explicit start/stop scheduler for the preview.
pub struct PreviewLoop {
    source: Arc<dyn VideoSource>,
    surface: SharedSurface,
    sink: Arc<dyn PreviewSink>,
    cache: Arc<Mutex<GeometryCache>>,
    running: Option<RunningLoop>,
}

struct RunningLoop {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<u64>,
}

fn lock(cache: &Mutex<GeometryCache>) -> MutexGuard<'_, GeometryCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PreviewLoop {
    pub fn new(
        source: Arc<dyn VideoSource>,
        surface: SharedSurface,
        sink: Arc<dyn PreviewSink>,
    ) -> Self {
        Self {
            source,
            surface,
            sink,
            cache: Arc::new(Mutex::new(GeometryCache::new())),
            running: None,
        }
    }

    /// Start drawing with `settings`. A loop that is already running is
    /// stopped first, so there is never more than one.
    pub async fn start(&mut self, settings: PreviewSettings) -> VidframeResult<()> {
        self.stop().await;
        let claim = self.surface.claim(SurfaceMode::Preview)?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_preview(
            claim,
            Arc::clone(&self.source),
            Arc::clone(&self.sink),
            Arc::clone(&self.cache),
            settings,
            stop_rx,
        ));
        self.running = Some(RunningLoop { stop_tx, handle });
        tracing::debug!("Preview loop started");
        Ok(())
    }

    /// Apply geometry-affecting changes.
    pub async fn restart(&mut self, settings: PreviewSettings) -> VidframeResult<()> {
        self.start(settings).await
    }

    /// Stop the loop and release the surface. Returns the number of frames
    /// the stopped loop presented.
    pub async fn stop(&mut self) -> u64 {
        let Some(running) = self.running.take() else {
            return 0;
        };
        let _ = running.stop_tx.send(());
        match running.handle.await {
            Ok(frames) => {
                tracing::debug!(frames, "Preview loop stopped");
                frames
            }
            Err(e) => {
                tracing::warn!(error = %e, "Preview loop ended abnormally");
                0
            }
        }
    }

    /// Stop and forget the last-known-good geometry.
    pub async fn unmount(&mut self) {
        self.stop().await;
        lock(&self.cache).invalidate();
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    pub fn cached_geometry(&self) -> Option<RenderGeometry> {
        lock(&self.cache).last()
    }
}

async fn run_preview(
    claim: SurfaceClaim,
    source: Arc<dyn VideoSource>,
    sink: Arc<dyn PreviewSink>,
    cache: Arc<Mutex<GeometryCache>>,
    settings: PreviewSettings,
    mut stop_rx: oneshot::Receiver<()>,
) -> u64 {
    let mut compositor = Compositor::new();
    let mut ticker = tokio::time::interval(frame_interval(settings.refresh_rate_hz));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut presented = 0u64;

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        let Some(frame) = source.current_frame() else {
            continue;
        };
        let fresh = source.metadata().and_then(|meta| {
            RenderGeometry::for_preview(
                Size::from_pixels(meta.width, meta.height),
                &settings.frame,
                &settings.constraints,
            )
        });
        let Some(geometry) = lock(&cache).resolve(fresh) else {
            continue;
        };

        let result = claim.with_surface(|surface| {
            compositor.draw(surface, &frame, &geometry, &settings.gradient, RenderMode::Preview)?;
            sink.present(surface, &geometry)
        });
        match result {
            Ok(()) => presented += 1,
            Err(e) => tracing::warn!(error = %e, "Preview frame failed"),
        }
    }

    presented
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use vidframe_media_source::fake::FakeVideoSource;

    #[derive(Default)]
    struct CountingSink {
        frames: AtomicU64,
    }

    impl PreviewSink for CountingSink {
        fn present(&self, surface: &Surface, geometry: &RenderGeometry) -> VidframeResult<()> {
            assert_eq!(surface.size(), geometry.canvas_size());
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn settings() -> PreviewSettings {
        PreviewSettings::from_defaults(
            &PreviewDefaults::default(),
            FrameConfig {
                padding: 8.0,
                ..FrameConfig::default()
            },
            GradientSpec::default(),
        )
    }

    fn preview(source: FakeVideoSource) -> (PreviewLoop, Arc<CountingSink>, SharedSurface) {
        let sink = Arc::new(CountingSink::default());
        let surface = SharedSurface::new(1, 1).unwrap();
        let source: Arc<dyn VideoSource> = Arc::new(source);
        let preview = PreviewLoop::new(source, surface.clone(), sink.clone());
        (preview, sink, surface)
    }

    #[tokio::test]
    async fn test_presents_frames_until_stopped() {
        let (mut preview, sink, surface) = preview(FakeVideoSource::new(48, 27, 5.0));
        preview.start(settings()).await.unwrap();
        assert!(preview.is_running());
        assert_eq!(surface.owner(), Some(SurfaceMode::Preview));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let presented = preview.stop().await;
        assert!(presented > 0);
        assert_eq!(presented, sink.frames.load(Ordering::SeqCst));
        assert_eq!(surface.owner(), None);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(sink.frames.load(Ordering::SeqCst), presented);
    }

    #[tokio::test]
    async fn test_restart_replaces_running_loop() {
        let (mut preview, _sink, surface) = preview(FakeVideoSource::new(48, 27, 5.0));
        preview.start(settings()).await.unwrap();
        let mut wider = settings();
        wider.frame.padding = 20.0;
        preview.restart(wider).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let geometry = preview.cached_geometry().unwrap();
        assert_eq!(geometry.destination.x, 20.0);
        assert_eq!(surface.owner(), Some(SurfaceMode::Preview));
        preview.stop().await;
    }

    #[tokio::test]
    async fn test_export_claim_blocks_preview() {
        let (mut preview, _sink, surface) = preview(FakeVideoSource::new(48, 27, 5.0));
        let export = surface.claim(SurfaceMode::Export).unwrap();
        assert!(preview.start(settings()).await.is_err());
        assert!(!preview.is_running());
        drop(export);
        preview.start(settings()).await.unwrap();
        preview.stop().await;
    }

    #[tokio::test]
    async fn test_no_frames_without_metadata() {
        let source = FakeVideoSource::new(48, 27, 5.0).with_pending_metadata();
        let (mut preview, sink, _surface) = preview(source);
        preview.start(settings()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        preview.stop().await;
        assert_eq!(sink.frames.load(Ordering::SeqCst), 0);
        assert!(preview.cached_geometry().is_none());
    }

    #[tokio::test]
    async fn test_unmount_clears_cached_geometry() {
        let (mut preview, _sink, _surface) = preview(FakeVideoSource::new(48, 27, 5.0));
        preview.start(settings()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(preview.cached_geometry().is_some());

        preview.unmount().await;
        assert!(!preview.is_running());
        assert!(preview.cached_geometry().is_none());
    }
}
