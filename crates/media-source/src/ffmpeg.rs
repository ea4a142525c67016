//! File playback through an `ffmpeg` rawvideo decoder.
//!
//! While playing, a reader thread pulls RGBA frames from an `ffmpeg -re`
//! process so frames arrive at the stream's own pace, and publishes the
//! latest one. Seeking decodes a single frame at the target position.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use async_trait::async_trait;
use tokio::sync::watch;

use vidframe_common::config::FfmpegConfig;
use vidframe_common::error::{VidframeError, VidframeResult};

use crate::frame::VideoFrame;
use crate::probe::probe_video;
use crate::source::{PlaybackState, VideoMetadata, VideoSource};
use crate::upload::UploadedFile;

/// A video file played through `ffmpeg`.
pub struct FfmpegVideoSource {
    file: UploadedFile,
    ffmpeg: PathBuf,
    metadata: VideoMetadata,
    shared: Arc<Shared>,
    player: tokio::sync::Mutex<Option<Player>>,
}

struct Shared {
    position: Mutex<f64>,
    frame: Mutex<Option<VideoFrame>>,
    looping: AtomicBool,
    state_tx: watch::Sender<PlaybackState>,
}

struct Player {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn publish(&self, frame: VideoFrame) {
        *lock(&self.position) = frame.timestamp_secs;
        *lock(&self.frame) = Some(frame);
    }

    fn set_state(&self, state: PlaybackState) {
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}

impl FfmpegVideoSource {
    /// Probe `file` and decode its first frame.
    pub async fn open(file: UploadedFile, config: &FfmpegConfig) -> VidframeResult<Self> {
        let metadata = probe_video(&config.ffprobe, &file.path).await?;
        let (state_tx, _) = watch::channel(PlaybackState::Paused);

        let source = Self {
            file,
            ffmpeg: config.ffmpeg.clone(),
            metadata,
            shared: Arc::new(Shared {
                position: Mutex::new(0.0),
                frame: Mutex::new(None),
                looping: AtomicBool::new(false),
                state_tx,
            }),
            player: tokio::sync::Mutex::new(None),
        };
        source.seek(0.0).await?;

        tracing::info!(
            path = %source.file.path.display(),
            width = metadata.width,
            height = metadata.height,
            duration_secs = metadata.duration_secs,
            "Opened video source"
        );
        Ok(source)
    }

    pub fn file(&self) -> &UploadedFile {
        &self.file
    }

    fn frame_duration(&self) -> f64 {
        1.0 / self.metadata.frame_rate.max(1.0)
    }

    /// Last position at which a frame can still be decoded.
    fn last_frame_position(&self) -> f64 {
        (self.metadata.duration_secs - self.frame_duration()).max(0.0)
    }

    async fn decode_frame_at(&self, secs: f64) -> VidframeResult<VideoFrame> {
        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-ss"])
            .arg(format!("{secs:.3}"))
            .arg("-i")
            .arg(&self.file.path)
            .args(["-frames:v", "1", "-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| VidframeError::source_not_ready(format!("Failed to start ffmpeg: {e}")))?;

        let len = VideoFrame::byte_len(self.metadata.width, self.metadata.height);
        if !output.status.success() || output.stdout.len() < len {
            return Err(VidframeError::source_not_ready(format!(
                "No frame decoded at {secs:.3}s: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut data = output.stdout;
        data.truncate(len);
        VideoFrame::new(self.metadata.width, self.metadata.height, secs, data)
    }

    /// Stop the reader thread. Returns whether playback was running.
    async fn stop_player(&self) -> bool {
        let player = self.player.lock().await.take();
        let Some(player) = player else {
            return false;
        };

        let was_running = !player.thread.is_finished();
        player.stop.store(true, Ordering::Release);
        if tokio::task::spawn_blocking(move || player.thread.join())
            .await
            .is_err()
        {
            tracing::warn!("Playback thread did not shut down cleanly");
        }
        if *self.shared.state_tx.borrow() == PlaybackState::Playing {
            self.shared.set_state(PlaybackState::Paused);
        }
        was_running
    }
}

#[async_trait]
impl VideoSource for FfmpegVideoSource {
    fn metadata(&self) -> Option<VideoMetadata> {
        Some(self.metadata)
    }

    async fn wait_for_metadata(&self) -> VidframeResult<VideoMetadata> {
        Ok(self.metadata)
    }

    fn position(&self) -> f64 {
        *lock(&self.shared.position)
    }

    fn state(&self) -> PlaybackState {
        *self.shared.state_tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state_tx.subscribe()
    }

    async fn seek(&self, secs: f64) -> VidframeResult<()> {
        let was_playing = self.stop_player().await;
        let target = if secs.is_finite() {
            secs.clamp(0.0, self.last_frame_position())
        } else {
            0.0
        };

        let frame = self.decode_frame_at(target).await?;
        self.shared.publish(frame);
        if self.state() == PlaybackState::Ended {
            self.shared.set_state(PlaybackState::Paused);
        }
        tracing::debug!(target_secs = target, "Seek complete");

        if was_playing {
            self.play().await?;
        }
        Ok(())
    }

    async fn play(&self) -> VidframeResult<()> {
        let mut slot = self.player.lock().await;
        if let Some(player) = slot.as_ref() {
            if !player.thread.is_finished() {
                return Ok(());
            }
        }

        let mut start = self.position();
        if start >= self.last_frame_position() {
            start = 0.0;
        }

        let child = spawn_decoder(&self.ffmpeg, &self.file.path, start)
            .map_err(|e| VidframeError::source_not_ready(format!("Failed to start ffmpeg: {e}")))?;

        let stop = Arc::new(AtomicBool::new(false));
        let ctx = PlayerContext {
            ffmpeg: self.ffmpeg.clone(),
            path: self.file.path.clone(),
            metadata: self.metadata,
            shared: Arc::clone(&self.shared),
            stop: Arc::clone(&stop),
        };
        let thread = std::thread::Builder::new()
            .name("vidframe-playback".to_string())
            .spawn(move || run_player(ctx, child, start))?;

        *slot = Some(Player { stop, thread });
        self.shared.set_state(PlaybackState::Playing);
        tracing::debug!(start_secs = start, "Playback started");
        Ok(())
    }

    async fn pause(&self) -> VidframeResult<()> {
        self.stop_player().await;
        Ok(())
    }

    fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Acquire)
    }

    fn set_looping(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Release);
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        lock(&self.shared.frame).clone()
    }
}

impl Drop for FfmpegVideoSource {
    fn drop(&mut self) {
        if let Some(player) = self.player.get_mut().take() {
            player.stop.store(true, Ordering::Release);
        }
    }
}

struct PlayerContext {
    ffmpeg: PathBuf,
    path: PathBuf,
    metadata: VideoMetadata,
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
}

fn spawn_decoder(ffmpeg: &Path, path: &Path, start_secs: f64) -> std::io::Result<Child> {
    Command::new(ffmpeg)
        .args(["-hide_banner", "-loglevel", "error", "-re", "-ss"])
        .arg(format!("{start_secs:.3}"))
        .arg("-i")
        .arg(path)
        .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
}

fn run_player(ctx: PlayerContext, mut child: Child, mut start: f64) {
    let VideoMetadata {
        width,
        height,
        frame_rate,
        duration_secs,
    } = ctx.metadata;
    let frame_len = VideoFrame::byte_len(width, height);

    loop {
        let mut frames_read: u64 = 0;
        if let Some(mut stdout) = child.stdout.take() {
            let mut buf = vec![0u8; frame_len];
            while !ctx.stop.load(Ordering::Acquire) {
                if stdout.read_exact(&mut buf).is_err() {
                    break;
                }
                let ts = start + frames_read as f64 / frame_rate.max(1.0);
                frames_read += 1;
                let data = std::mem::replace(&mut buf, vec![0u8; frame_len]);
                match VideoFrame::new(width, height, ts, data) {
                    Ok(frame) => ctx.shared.publish(frame),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping malformed frame");
                    }
                }
            }
        }

        let _ = child.kill();
        let _ = child.wait();

        if ctx.stop.load(Ordering::Acquire) {
            return;
        }

        if ctx.shared.looping.load(Ordering::Acquire) {
            match spawn_decoder(&ctx.ffmpeg, &ctx.path, 0.0) {
                Ok(next) => {
                    tracing::debug!(frames_read, "Looping playback");
                    child = next;
                    start = 0.0;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to restart looped playback");
                    ctx.shared.set_state(PlaybackState::Paused);
                    return;
                }
            }
        }

        *lock(&ctx.shared.position) = duration_secs;
        ctx.shared.set_state(PlaybackState::Ended);
        tracing::debug!(frames_read, "Playback reached end");
        return;
    }
}
