//! Export orchestration.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use vidframe_capture_engine::{
    CancelFlag, CaptureStats, EncoderFactory, MediaBlob, RecordedMedia, RecordingParams,
    RecordingPipeline,
};
use vidframe_common::config::ExportDefaults;
use vidframe_common::error::{VidframeError, VidframeResult};
use vidframe_frame_model::{ExportFormat, ExportSettings, FrameConfig, GradientSpec};
use vidframe_geometry::{DisplayConstraints, RenderGeometry, Size};
use vidframe_media_source::VideoSource;
use vidframe_render_engine::{PreviewLoop, SharedSurface};

use crate::sink::FileSink;
use crate::transcode::{TranscodeRequest, TranscoderHandle};

/// Status callback for export progress.
pub type StatusCallback = Box<dyn Fn(&ExportStatus) + Send + Sync>;

/// One export as chosen in the export dialog, with the styling in effect.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub settings: ExportSettings,
    pub frame: FrameConfig,
    pub gradient: GradientSpec,
    /// Preview layout the styling was chosen against.
    pub constraints: DisplayConstraints,
}

/// Stages of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Preparing,
    Recording,
    Converting,
    Saving,
    Complete,
    Cancelled,
    Failed,
}

/// A stage transition with its human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportStatus {
    pub stage: ExportStage,
    pub message: String,
}

impl ExportStatus {
    fn new(stage: ExportStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// What was delivered.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub bytes: u64,
    /// Size of the captured stream.
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub stats: CaptureStats,
}

#[derive(Debug, Clone)]
pub enum ExportOutcome {
    Complete(ExportReport),
    /// Conversion failed; the captured container was delivered instead.
    CompleteWithFallback { report: ExportReport, reason: String },
    /// Nothing was saved.
    Cancelled,
}

impl ExportOutcome {
    pub fn report(&self) -> Option<&ExportReport> {
        match self {
            Self::Complete(report) | Self::CompleteWithFallback { report, .. } => Some(report),
            Self::Cancelled => None,
        }
    }
}

/// Runs export jobs against one source and surface.
///
/// Owns neither the cancellation flag's creation nor the one-at-a-time
/// rule; the caller supplies the flag and guards with an
/// [`ExportGate`](crate::ExportGate).
pub struct ExportOrchestrator {
    source: Arc<dyn VideoSource>,
    surface: SharedSurface,
    encoders: Arc<dyn EncoderFactory>,
    transcoder: Arc<TranscoderHandle>,
    sink: Arc<dyn FileSink>,
    defaults: ExportDefaults,
    preview: Option<PreviewLoop>,
    on_status: Option<StatusCallback>,
}

impl ExportOrchestrator {
    pub fn new(
        source: Arc<dyn VideoSource>,
        surface: SharedSurface,
        encoders: Arc<dyn EncoderFactory>,
        transcoder: Arc<TranscoderHandle>,
        sink: Arc<dyn FileSink>,
    ) -> Self {
        Self {
            source,
            surface,
            encoders,
            transcoder,
            sink,
            defaults: ExportDefaults::default(),
            preview: None,
            on_status: None,
        }
    }

    pub fn with_defaults(mut self, defaults: ExportDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Preview loop to stop before recording takes the surface.
    pub fn with_preview(mut self, preview: PreviewLoop) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn on_status(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    pub fn preview_mut(&mut self) -> Option<&mut PreviewLoop> {
        self.preview.as_mut()
    }

    /// Run one export.
    ///
    /// Cancellation at any point yields [`ExportOutcome::Cancelled`] with no
    /// file saved. Source and capture failures are returned as errors;
    /// conversion failures fall back to the captured container.
    pub async fn export(
        &mut self,
        request: &ExportRequest,
        cancel: &CancelFlag,
    ) -> VidframeResult<ExportOutcome> {
        tracing::info!(
            quality = request.settings.quality.label(),
            format = request.settings.format.label(),
            "Starting export"
        );
        self.emit(ExportStatus::new(ExportStage::Preparing, "Preparing export…"));

        match self.run(request, cancel).await {
            Ok(Some(outcome)) => Ok(outcome),
            Ok(None) => Ok(self.cancelled()),
            Err(e) if e.is_cancelled() => Ok(self.cancelled()),
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                self.emit(ExportStatus::new(
                    ExportStage::Failed,
                    format!("Export failed: {e}"),
                ));
                Err(e)
            }
        }
    }

    /// `Ok(None)` means cancelled.
    async fn run(
        &mut self,
        request: &ExportRequest,
        cancel: &CancelFlag,
    ) -> VidframeResult<Option<ExportOutcome>> {
        if let Some(preview) = self.preview.as_mut() {
            preview.stop().await;
        }
        if cancel.is_cancelled() {
            self.source.pause().await?;
            return Ok(None);
        }

        let geometry = self.export_geometry(request).await?;
        let params =
            RecordingParams::from_defaults(&self.defaults, geometry, request.gradient.clone());

        self.emit(ExportStatus::new(ExportStage::Recording, "Recording video…"));
        let mut pipeline = RecordingPipeline::new(
            Arc::clone(&self.source),
            self.surface.clone(),
            Arc::clone(&self.encoders),
        );
        let media = pipeline.record(&params, cancel).await?;

        let target = request.settings.format;
        let captured = media.blob.format().unwrap_or_else(|| media.codec.container());
        let (blob, delivered, fallback) = if captured == target {
            (media.blob.clone(), target, None)
        } else {
            self.emit(ExportStatus::new(
                ExportStage::Converting,
                format!("Converting to {}…", target.label()),
            ));
            match self.convert(&media, request, cancel).await {
                Ok(converted) => (converted, target, None),
                Err(e) if e.is_recoverable_by_fallback() => {
                    tracing::warn!(
                        error = %e,
                        captured = captured.label(),
                        target = target.label(),
                        "Conversion failed, delivering captured format"
                    );
                    (media.blob.clone(), captured, Some(e.to_string()))
                }
                Err(e) => return Err(e),
            }
        };

        if cancel.is_cancelled() {
            return Ok(None);
        }

        self.emit(ExportStatus::new(ExportStage::Saving, "Saving file…"));
        let path = self.sink.save(&blob, delivered).await?;
        let report = ExportReport {
            path,
            format: delivered,
            bytes: blob.len() as u64,
            width: media.width,
            height: media.height,
            duration_secs: media.duration_secs,
            stats: media.stats,
        };

        let outcome = match fallback {
            None => {
                self.emit(ExportStatus::new(ExportStage::Complete, "Export complete!"));
                ExportOutcome::Complete(report)
            }
            Some(reason) => {
                self.emit(ExportStatus::new(
                    ExportStage::Complete,
                    format!(
                        "Export complete! {} conversion failed, saved as {} instead.",
                        target.label(),
                        delivered.label()
                    ),
                ));
                ExportOutcome::CompleteWithFallback { report, reason }
            }
        };
        if let Some(report) = outcome.report() {
            tracing::info!(path = %report.path.display(), bytes = report.bytes, "Export finished");
        }
        Ok(Some(outcome))
    }

    async fn export_geometry(&self, request: &ExportRequest) -> VidframeResult<RenderGeometry> {
        let metadata = match self.source.metadata() {
            Some(metadata) => metadata,
            None => self.source.wait_for_metadata().await?,
        };
        if !metadata.has_picture() {
            return Err(VidframeError::source_not_ready("Video has no picture"));
        }
        RenderGeometry::for_export(
            Size::from_pixels(metadata.width, metadata.height),
            &request.frame,
            &request.constraints,
            request.settings.quality,
        )
        .ok_or_else(|| VidframeError::source_not_ready("Cannot resolve export geometry"))
    }

    /// Errors other than cancellation come back as `TranscodeFailed`.
    async fn convert(
        &self,
        media: &RecordedMedia,
        request: &ExportRequest,
        cancel: &CancelFlag,
    ) -> VidframeResult<MediaBlob> {
        let engine = self.transcoder.get().await?;
        if cancel.is_cancelled() {
            return Err(VidframeError::UserCancelled);
        }
        let converted = engine
            .transcode(
                TranscodeRequest {
                    input: &media.blob,
                    width: media.width,
                    height: media.height,
                    target: request.settings.format,
                    quality: request.settings.quality,
                },
                cancel,
            )
            .await;
        match converted {
            Err(e) if !e.is_cancelled() && !e.is_recoverable_by_fallback() => {
                Err(VidframeError::transcode(e.to_string()))
            }
            other => other,
        }
    }

    fn cancelled(&self) -> ExportOutcome {
        tracing::info!("Export cancelled");
        self.emit(ExportStatus::new(ExportStage::Cancelled, "Export cancelled"));
        ExportOutcome::Cancelled
    }

    fn emit(&self, status: ExportStatus) {
        tracing::debug!(stage = ?status.stage, message = %status.message, "Export status");
        if let Some(callback) = &self.on_status {
            callback(&status);
        }
    }
}
