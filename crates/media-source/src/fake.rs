//! In-memory [`VideoSource`] driven by the tokio clock.
//!
//! Position advances with wall time while playing; reaching the duration
//! either loops or publishes `Ended`. Every control call is recorded so
//! tests can assert on how a source was driven.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use vidframe_common::error::{VidframeError, VidframeResult};

use crate::frame::VideoFrame;
use crate::source::{PlaybackState, VideoMetadata, VideoSource};

/// A control call made on a [`FakeVideoSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCall {
    Seek(f64),
    Play,
    Pause,
    SetLooping(bool),
}

pub struct FakeVideoSource {
    metadata: VideoMetadata,
    metadata_ready: AtomicBool,
    fail_seeks: AtomicBool,
    frame: VideoFrame,
    shared: Arc<FakeShared>,
    calls: Mutex<Vec<SourceCall>>,
}

struct FakeShared {
    clock: Mutex<FakeClock>,
    looping: AtomicBool,
    state_tx: watch::Sender<PlaybackState>,
}

#[derive(Default)]
struct FakeClock {
    base: f64,
    started_at: Option<Instant>,
    ticker: Option<JoinHandle<()>>,
    /// Bumped whenever the clock stops or restarts so a stale ticker
    /// cannot end playback.
    generation: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeClock {
    fn position(&self, duration: f64) -> f64 {
        let elapsed = self
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (self.base + elapsed).min(duration)
    }

    fn halt(&mut self, duration: f64) {
        self.base = self.position(duration);
        self.started_at = None;
        self.generation += 1;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl FakeVideoSource {
    /// A source of the given natural size and duration showing a solid
    /// color frame.
    pub fn new(width: u32, height: u32, duration_secs: f64) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Paused);
        Self {
            metadata: VideoMetadata {
                width,
                height,
                duration_secs,
                frame_rate: 30.0,
            },
            metadata_ready: AtomicBool::new(true),
            fail_seeks: AtomicBool::new(false),
            frame: VideoFrame::solid(width, height, [200, 40, 40, 255]),
            shared: Arc::new(FakeShared {
                clock: Mutex::new(FakeClock::default()),
                looping: AtomicBool::new(false),
                state_tx,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report no metadata until `wait_for_metadata` is awaited.
    pub fn with_pending_metadata(self) -> Self {
        self.metadata_ready.store(false, Ordering::Release);
        self
    }

    pub fn with_looping(self, looping: bool) -> Self {
        self.shared.looping.store(looping, Ordering::Release);
        self
    }

    /// Make every subsequent seek fail.
    pub fn fail_seeks(&self) {
        self.fail_seeks.store(true, Ordering::Release);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: SourceCall) {
        lock(&self.calls).push(call);
    }

    fn start_clock(&self, clock: &mut FakeClock) {
        if clock.base >= self.metadata.duration_secs {
            clock.base = 0.0;
        }
        clock.started_at = Some(Instant::now());
        clock.generation += 1;
        let remaining = (self.metadata.duration_secs - clock.base).max(0.0);
        let shared = Arc::clone(&self.shared);
        let duration = self.metadata.duration_secs;
        let generation = clock.generation;
        clock.ticker = Some(tokio::spawn(run_ticker(
            shared, remaining, duration, generation,
        )));
    }
}

async fn run_ticker(shared: Arc<FakeShared>, mut remaining: f64, duration: f64, generation: u64) {
    loop {
        tokio::time::sleep(Duration::from_secs_f64(remaining)).await;
        let mut clock = lock(&shared.clock);
        if clock.generation != generation {
            return;
        }
        if shared.looping.load(Ordering::Acquire) {
            clock.base = 0.0;
            clock.started_at = Some(Instant::now());
            remaining = duration;
            continue;
        }
        clock.base = duration;
        clock.started_at = None;
        clock.ticker = None;
        shared.state_tx.send_replace(PlaybackState::Ended);
        return;
    }
}

#[async_trait]
impl VideoSource for FakeVideoSource {
    fn metadata(&self) -> Option<VideoMetadata> {
        self.metadata_ready
            .load(Ordering::Acquire)
            .then_some(self.metadata)
    }

    async fn wait_for_metadata(&self) -> VidframeResult<VideoMetadata> {
        tokio::task::yield_now().await;
        self.metadata_ready.store(true, Ordering::Release);
        Ok(self.metadata)
    }

    fn position(&self) -> f64 {
        lock(&self.shared.clock).position(self.metadata.duration_secs)
    }

    fn state(&self) -> PlaybackState {
        *self.shared.state_tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state_tx.subscribe()
    }

    async fn seek(&self, secs: f64) -> VidframeResult<()> {
        self.record(SourceCall::Seek(secs));
        if self.fail_seeks.load(Ordering::Acquire) {
            return Err(VidframeError::source_not_ready("seek failed"));
        }
        tokio::task::yield_now().await;

        let duration = self.metadata.duration_secs;
        let mut clock = lock(&self.shared.clock);
        let playing = clock.started_at.is_some();
        clock.halt(duration);
        clock.base = secs.clamp(0.0, duration);
        if playing {
            self.start_clock(&mut clock);
        } else if self.state() == PlaybackState::Ended {
            self.shared.state_tx.send_replace(PlaybackState::Paused);
        }
        Ok(())
    }

    async fn play(&self) -> VidframeResult<()> {
        self.record(SourceCall::Play);
        let mut clock = lock(&self.shared.clock);
        if clock.started_at.is_none() {
            self.start_clock(&mut clock);
        }
        self.shared.state_tx.send_replace(PlaybackState::Playing);
        Ok(())
    }

    async fn pause(&self) -> VidframeResult<()> {
        self.record(SourceCall::Pause);
        let mut clock = lock(&self.shared.clock);
        let was_playing = clock.started_at.is_some();
        clock.halt(self.metadata.duration_secs);
        if was_playing {
            self.shared.state_tx.send_replace(PlaybackState::Paused);
        }
        Ok(())
    }

    fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Acquire)
    }

    fn set_looping(&self, looping: bool) {
        self.record(SourceCall::SetLooping(looping));
        self.shared.looping.store(looping, Ordering::Release);
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        self.metadata_ready
            .load(Ordering::Acquire)
            .then(|| self.frame.clone().with_timestamp(self.position()))
    }
}
