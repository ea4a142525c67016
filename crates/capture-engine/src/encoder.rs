//! Stream encoders fed with composited RGBA frames.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use vidframe_common::error::{VidframeError, VidframeResult};

pub use crate::completion::EncoderSummary;
use crate::codec::{list_encoders, negotiate_codec, CaptureCodec};
use crate::completion::{completion_pair, CompletionError, CompletionSignal, EncoderCompletion};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Stream parameters fixed for the lifetime of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderParams {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// How often accumulated output is handed out as a chunk.
    pub flush_interval: Duration,
}

impl EncoderParams {
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Write side of a running encoder.
#[async_trait]
pub trait StreamEncoder: Send {
    fn codec(&self) -> CaptureCodec;

    /// Submit one straight RGBA frame of the configured size.
    async fn push_frame(&mut self, rgba: &[u8]) -> VidframeResult<()>;

    /// End the stream. Remaining output is flushed as chunks and the
    /// completion resolves after the last one.
    async fn finish(&mut self) -> VidframeResult<()>;

    /// Stop without finalizing. The completion rejects with
    /// [`CompletionError::Cancelled`].
    async fn abort(&mut self);
}

/// A started encoder with its output channel and completion handle.
pub struct EncoderSession {
    pub encoder: Box<dyn StreamEncoder>,
    /// Closed after the final chunk.
    pub chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    pub completion: EncoderCompletion,
}

/// Starts encoders.
#[async_trait]
pub trait EncoderFactory: Send + Sync {
    async fn start(&self, params: EncoderParams) -> VidframeResult<EncoderSession>;

    fn name(&self) -> &str;
}

/// Encodes through an `ffmpeg` child process: rawvideo on stdin, the
/// container on stdout.
pub struct FfmpegEncoderFactory {
    ffmpeg: PathBuf,
}

impl FfmpegEncoderFactory {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Pick the first supported capture codec.
    pub async fn negotiate(&self) -> VidframeResult<CaptureCodec> {
        let listing = list_encoders(&self.ffmpeg).await?;
        negotiate_codec(&listing).ok_or_else(|| {
            VidframeError::capture(format!(
                "No supported capture codec (tried {})",
                CaptureCodec::PREFERENCE
                    .iter()
                    .map(|c| c.encoder())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }
}

#[async_trait]
impl EncoderFactory for FfmpegEncoderFactory {
    async fn start(&self, params: EncoderParams) -> VidframeResult<EncoderSession> {
        let codec = self.negotiate().await?;

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .arg("-s")
            .arg(format!("{}x{}", params.width, params.height))
            .arg("-r")
            .arg(params.fps.to_string())
            .args(["-i", "pipe:0", "-an", "-c:v", codec.encoder()])
            .args(codec.encoder_args())
            .args(["-pix_fmt", "yuv420p"])
            .args(codec.muxer_args())
            .arg("pipe:1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| VidframeError::capture(format!("Failed to start ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VidframeError::capture("Failed to open ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VidframeError::capture("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VidframeError::capture("Failed to capture ffmpeg stderr"))?;

        tracing::info!(
            pid = child.id(),
            codec = codec.encoder(),
            width = params.width,
            height = params.height,
            fps = params.fps,
            "Capture encoder started"
        );

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (signal, completion) = completion_pair();
        let (kill_tx, kill_rx) = oneshot::channel();
        let aborted = Arc::new(AtomicBool::new(false));

        let pump = tokio::spawn(pump_output(stdout, chunk_tx, params.flush_interval));
        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let supervisor_aborted = Arc::clone(&aborted);
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Ok(()) = kill_rx => {
                    let _ = child.start_kill();
                    child.wait().await
                }
            };
            let pumped = pump.await;
            let stderr_output = stderr_task.await.unwrap_or_default();
            settle(
                signal,
                supervisor_aborted.load(Ordering::Acquire),
                status,
                pumped,
                stderr_output,
            );
        });

        Ok(EncoderSession {
            encoder: Box::new(FfmpegStreamEncoder {
                codec,
                frame_len: params.frame_len(),
                stdin: Some(stdin),
                kill_tx: Some(kill_tx),
                aborted,
                frames: 0,
            }),
            chunks: chunk_rx,
            completion,
        })
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn settle(
    signal: CompletionSignal,
    aborted: bool,
    status: std::io::Result<std::process::ExitStatus>,
    pumped: Result<std::io::Result<EncoderSummary>, tokio::task::JoinError>,
    stderr_output: String,
) {
    if aborted {
        tracing::info!("Capture encoder aborted");
        signal.reject(CompletionError::Cancelled);
        return;
    }

    let summary = match pumped {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            signal.reject(CompletionError::Failed(format!("Failed reading encoder output: {e}")));
            return;
        }
        Err(e) => {
            signal.reject(CompletionError::Failed(format!("Encoder reader panicked: {e}")));
            return;
        }
    };

    match status {
        Ok(status) if status.success() => {
            tracing::info!(
                chunks = summary.chunks,
                bytes = summary.bytes,
                "Capture encoder finished"
            );
            signal.resolve(summary);
        }
        Ok(status) => signal.reject(CompletionError::Failed(format!(
            "ffmpeg capture failed (status {status}): {}",
            stderr_output.trim()
        ))),
        Err(e) => signal.reject(CompletionError::Failed(format!(
            "Failed to wait on ffmpeg: {e}"
        ))),
    }
}

/// Accumulate encoder output and hand it out every `flush_interval`.
async fn pump_output(
    mut stdout: ChildStdout,
    chunks: mpsc::UnboundedSender<Vec<u8>>,
    flush_interval: Duration,
) -> std::io::Result<EncoderSummary> {
    let mut summary = EncoderSummary::default();
    let mut pending = Vec::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut ticker = tokio::time::interval(flush_interval.max(Duration::from_millis(1)));
    ticker.tick().await;

    let emit = |pending: &mut Vec<u8>, summary: &mut EncoderSummary| {
        if pending.is_empty() {
            return;
        }
        summary.chunks += 1;
        summary.bytes += pending.len() as u64;
        let _ = chunks.send(std::mem::take(pending));
    };

    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    break;
                }
                pending.extend_from_slice(&buf[..n]);
            }
            _ = ticker.tick() => emit(&mut pending, &mut summary),
        }
    }
    emit(&mut pending, &mut summary);
    Ok(summary)
}

/// Write side of an ffmpeg capture process.
pub struct FfmpegStreamEncoder {
    codec: CaptureCodec,
    frame_len: usize,
    stdin: Option<ChildStdin>,
    kill_tx: Option<oneshot::Sender<()>>,
    aborted: Arc<AtomicBool>,
    frames: u64,
}

#[async_trait]
impl StreamEncoder for FfmpegStreamEncoder {
    fn codec(&self) -> CaptureCodec {
        self.codec
    }

    async fn push_frame(&mut self, rgba: &[u8]) -> VidframeResult<()> {
        if rgba.len() != self.frame_len {
            return Err(VidframeError::capture(format!(
                "Frame is {} bytes, encoder expects {}",
                rgba.len(),
                self.frame_len
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| VidframeError::capture("Encoder input already closed"))?;
        stdin
            .write_all(rgba)
            .await
            .map_err(|e| VidframeError::capture(format!("Encoder rejected frame: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    async fn finish(&mut self) -> VidframeResult<()> {
        let Some(mut stdin) = self.stdin.take() else {
            return Ok(());
        };
        stdin
            .flush()
            .await
            .map_err(|e| VidframeError::capture(format!("Failed to flush encoder input: {e}")))?;
        drop(stdin);
        // Dropping the kill sender without sending leaves the process to
        // exit on its own.
        self.kill_tx.take();
        tracing::debug!(frames = self.frames, "Encoder input closed");
        Ok(())
    }

    async fn abort(&mut self) {
        self.aborted.store(true, Ordering::Release);
        self.stdin.take();
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }
        tracing::debug!(frames = self.frames, "Encoder aborted");
    }
}
