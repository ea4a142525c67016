//! Export a framed video.

use std::path::PathBuf;
use std::sync::Arc;

use vidframe_capture_engine::FfmpegEncoderFactory;
use vidframe_common::config::AppConfig;
use vidframe_export_engine::{
    CancelFlag, DirectorySink, ExportGate, ExportOrchestrator, ExportOutcome, ExportRequest,
    FfmpegTranscoderLoader, TranscoderHandle,
};
use vidframe_media_source::{FfmpegVideoSource, UploadedFile, VideoSource};
use vidframe_render_engine::SharedSurface;

use crate::style::{display_constraints, export_settings, load_style};

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    quality: Option<String>,
    format: Option<String>,
    style: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let settings = export_settings(config, quality.as_deref(), format.as_deref())?;
    let style = load_style(style.as_deref())?;
    let output_dir = output.unwrap_or_else(|| config.output_dir.clone());

    println!("Exporting: {}", video.display());
    println!("  Quality: {}", settings.quality);
    println!("  Format: {}", settings.format.label());
    println!("  Output directory: {}", output_dir.display());

    let file = UploadedFile::from_path(&video)?;
    let source: Arc<dyn VideoSource> = Arc::new(FfmpegVideoSource::open(file, &config.ffmpeg).await?);

    let mut orchestrator = ExportOrchestrator::new(
        source,
        SharedSurface::new(1, 1)?,
        Arc::new(FfmpegEncoderFactory::new(&config.ffmpeg.ffmpeg)),
        Arc::new(TranscoderHandle::new(FfmpegTranscoderLoader::new(
            &config.ffmpeg.ffmpeg,
        ))),
        Arc::new(DirectorySink::new(output_dir)),
    )
    .with_defaults(config.export.clone())
    .on_status(Box::new(|status| println!("  {}", status.message)));

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!();
            println!("Cancelling export...");
            on_interrupt.cancel();
        }
    });

    let gate = ExportGate::new();
    let _guard = gate.try_begin()?;

    let request = ExportRequest {
        settings,
        frame: style.frame,
        gradient: style.gradient,
        constraints: display_constraints(config),
    };

    match orchestrator.export(&request, &cancel).await {
        Ok(ExportOutcome::Complete(report)) => {
            println!();
            println!("Saved: {}", report.path.display());
            println!(
                "  {}x{}, {:.1}s, {} bytes ({} frames, {:.1}% dropped)",
                report.width,
                report.height,
                report.duration_secs,
                report.bytes,
                report.stats.frames_captured,
                report.stats.drop_rate()
            );
        }
        Ok(ExportOutcome::CompleteWithFallback { report, reason }) => {
            println!();
            println!("Saved: {}", report.path.display());
            println!("  Conversion failed: {reason}");
        }
        Ok(ExportOutcome::Cancelled) => {
            println!("Export cancelled; nothing was saved.");
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Export failed: {e}"));
        }
    }

    Ok(())
}
