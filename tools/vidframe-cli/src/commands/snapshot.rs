//! Render one framed still.

use std::path::PathBuf;

use vidframe_common::config::AppConfig;
use vidframe_geometry::{RenderGeometry, Size};
use vidframe_media_source::{FfmpegVideoSource, UploadedFile, VideoSource};
use vidframe_render_engine::render_still;

use crate::style::{display_constraints, export_settings, load_style};

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    at: f64,
    output: PathBuf,
    quality: Option<String>,
    style: Option<PathBuf>,
) -> anyhow::Result<()> {
    let settings = export_settings(config, quality.as_deref(), None)?;
    let style = load_style(style.as_deref())?;

    let source = FfmpegVideoSource::open(UploadedFile::from_path(&video)?, &config.ffmpeg).await?;
    let metadata = source.wait_for_metadata().await?;
    if !(0.0..=metadata.duration_secs).contains(&at) {
        return Err(anyhow::anyhow!(
            "Position {at}s is outside the video (0 to {:.2}s)",
            metadata.duration_secs
        ));
    }
    source.seek(at).await?;

    let frame = source
        .current_frame()
        .ok_or_else(|| anyhow::anyhow!("No frame decoded at {at}s"))?;
    let geometry = RenderGeometry::for_export(
        Size::from_pixels(metadata.width, metadata.height),
        &style.frame,
        &display_constraints(config),
        settings.quality,
    )
    .ok_or_else(|| anyhow::anyhow!("Cannot resolve geometry for this video"))?;

    let surface = render_still(&frame, &geometry, &style.gradient)?;
    surface.save_png(&output)?;

    println!(
        "Saved {}x{} frame at {at:.2}s to {}",
        surface.width(),
        surface.height(),
        output.display()
    );
    Ok(())
}
