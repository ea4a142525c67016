//! Container/codec conversion of captured media.
//!
//! The engine is loaded lazily through a [`TranscoderHandle`] the first time
//! an export needs it and reused afterwards. A failed load is not
//! remembered; the next export tries again.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::OnceCell;

use vidframe_capture_engine::codec::list_encoders;
use vidframe_capture_engine::{CancelFlag, MediaBlob};
use vidframe_common::error::{VidframeError, VidframeResult};
use vidframe_frame_model::{ExportFormat, QualityTier};
use vidframe_geometry::transcode_dimensions;
use vidframe_media_source::command_exists;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One conversion job.
#[derive(Debug, Clone, Copy)]
pub struct TranscodeRequest<'a> {
    pub input: &'a MediaBlob,
    /// Pixel size of the captured stream.
    pub width: u32,
    pub height: u32,
    pub target: ExportFormat,
    pub quality: QualityTier,
}

impl TranscodeRequest<'_> {
    /// Output size: the tier ceiling applied again, with even sides.
    pub fn output_dimensions(&self) -> (u32, u32) {
        transcode_dimensions(self.width, self.height, self.quality)
    }
}

/// An initialized transcoding engine.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `request.input` to `request.target`.
    ///
    /// Returns [`VidframeError::UserCancelled`] if `cancel` is set while the
    /// conversion runs.
    async fn transcode(
        &self,
        request: TranscodeRequest<'_>,
        cancel: &CancelFlag,
    ) -> VidframeResult<MediaBlob>;

    fn name(&self) -> &str;
}

/// Creates the engine on first use.
#[async_trait]
pub trait TranscoderLoader: Send + Sync {
    async fn load(&self) -> VidframeResult<Arc<dyn Transcoder>>;
}

/// Session-scoped owner of the transcoding engine.
pub struct TranscoderHandle {
    loader: Box<dyn TranscoderLoader>,
    engine: OnceCell<Arc<dyn Transcoder>>,
}

impl TranscoderHandle {
    pub fn new(loader: impl TranscoderLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            engine: OnceCell::new(),
        }
    }

    /// The engine, loading it if no earlier load succeeded.
    pub async fn get(&self) -> VidframeResult<Arc<dyn Transcoder>> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                tracing::info!("Initializing transcoder");
                match self.loader.load().await {
                    Ok(engine) => {
                        tracing::info!(engine = engine.name(), "Transcoder ready");
                        Ok(engine)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Transcoder initialization failed");
                        Err(match e {
                            VidframeError::TranscodeFailed { .. } => e,
                            other => VidframeError::transcode(other.to_string()),
                        })
                    }
                }
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }
}

/// Loads an [`FfmpegTranscoder`] after checking the binary and its H.264
/// encoder are usable.
pub struct FfmpegTranscoderLoader {
    ffmpeg: PathBuf,
    work_root: PathBuf,
}

impl FfmpegTranscoderLoader {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            work_root: std::env::temp_dir(),
        }
    }

    /// Parent of the engine's scratch directory.
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }
}

#[async_trait]
impl TranscoderLoader for FfmpegTranscoderLoader {
    async fn load(&self) -> VidframeResult<Arc<dyn Transcoder>> {
        if !command_exists(&self.ffmpeg).await {
            return Err(VidframeError::transcode(format!(
                "{} is not available",
                self.ffmpeg.display()
            )));
        }
        let encoders = list_encoders(&self.ffmpeg)
            .await
            .map_err(|e| VidframeError::transcode(e.to_string()))?;
        if !encoders.contains("libx264") {
            return Err(VidframeError::transcode("ffmpeg has no libx264 encoder"));
        }

        let work_dir = self
            .work_root
            .join(format!("vidframe-transcode-{}", std::process::id()));
        tokio::fs::create_dir_all(&work_dir).await.map_err(|e| {
            VidframeError::transcode(format!(
                "Cannot create work directory {}: {e}",
                work_dir.display()
            ))
        })?;

        Ok(Arc::new(FfmpegTranscoder {
            ffmpeg: self.ffmpeg.clone(),
            work_dir,
            next_job: AtomicU64::new(0),
        }))
    }
}

/// Converts through an `ffmpeg` child process using files in a private
/// work directory.
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    work_dir: PathBuf,
    next_job: AtomicU64,
}

impl FfmpegTranscoder {
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        request: &TranscodeRequest<'_>,
        cancel: &CancelFlag,
    ) -> VidframeResult<MediaBlob> {
        tokio::fs::write(input_path, &request.input.bytes)
            .await
            .map_err(|e| VidframeError::transcode(format!("Cannot stage input: {e}")))?;

        let (width, height) = request.output_dimensions();
        let args = transcode_args(input_path, output_path, width, height, request.target);
        tracing::debug!(?args, "Running ffmpeg transcode");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VidframeError::transcode(format!("Failed to start ffmpeg: {e}")))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VidframeError::transcode("Failed to capture ffmpeg stderr"))?;
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let status = loop {
            tokio::select! {
                status = child.wait() => {
                    break status.map_err(|e| {
                        VidframeError::transcode(format!("Failed waiting for ffmpeg: {e}"))
                    })?;
                }
                _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                    if cancel.is_cancelled() {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        tracing::info!("Transcode abandoned");
                        return Err(VidframeError::UserCancelled);
                    }
                }
            }
        };

        let stderr_output = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(VidframeError::transcode(format!(
                "ffmpeg transcode failed (status {status}): {}",
                stderr_output.trim()
            )));
        }

        let bytes = tokio::fs::read(output_path)
            .await
            .map_err(|e| VidframeError::transcode(format!("Cannot read output: {e}")))?;
        if bytes.is_empty() {
            return Err(VidframeError::transcode("Transcoder produced an empty file"));
        }

        tracing::info!(
            width,
            height,
            bytes = bytes.len(),
            format = request.target.label(),
            "Transcode complete"
        );
        Ok(MediaBlob::new(bytes, request.target.mime_type()))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        request: TranscodeRequest<'_>,
        cancel: &CancelFlag,
    ) -> VidframeResult<MediaBlob> {
        if request.input.is_empty() {
            return Err(VidframeError::transcode("Captured video is empty"));
        }

        let job = self.next_job.fetch_add(1, Ordering::Relaxed);
        let input_ext = request
            .input
            .format()
            .map(ExportFormat::extension)
            .unwrap_or("bin");
        let input_path = self.work_dir.join(format!("input-{job}.{input_ext}"));
        let output_path = self
            .work_dir
            .join(format!("output-{job}.{}", request.target.extension()));

        let result = self.run(&input_path, &output_path, &request, cancel).await;

        for path in [&input_path, &output_path] {
            remove_quietly(path).await;
        }
        result
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl Drop for FfmpegTranscoder {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.work_dir) {
            tracing::debug!(error = %e, dir = %self.work_dir.display(), "Work directory cleanup failed");
        }
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::debug!(error = %e, path = %path.display(), "Temp file cleanup failed"),
    }
}

fn transcode_args(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
    target: ExportFormat,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        format!("scale={width}:{height}"),
        "-an".to_string(),
    ];
    match target {
        ExportFormat::Mp4 => args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]),
        ExportFormat::Webm => args.extend([
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-b:v".to_string(),
            "0".to_string(),
            "-crf".to_string(),
            "32".to_string(),
        ]),
    }
    args.push(output.display().to_string());
    args
}
