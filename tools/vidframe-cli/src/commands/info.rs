//! Show video metadata and the geometry it resolves to.

use std::path::PathBuf;

use vidframe_common::config::AppConfig;
use vidframe_frame_model::QualityTier;
use vidframe_geometry::{resolve_display_size, RenderGeometry, Size};
use vidframe_media_source::{probe_video, UploadedFile};

use crate::style::{display_constraints, load_style};

pub async fn run(config: &AppConfig, video: PathBuf, style: Option<PathBuf>) -> anyhow::Result<()> {
    let file = UploadedFile::from_path(&video)?;
    let metadata = probe_video(&config.ffmpeg.ffprobe, &file.path).await?;
    let style = load_style(style.as_deref())?;
    let constraints = display_constraints(config);
    let natural = Size::from_pixels(metadata.width, metadata.height);

    println!("Video: {}", file.file_name());
    println!("  Type: {}", file.mime);
    println!("  Size: {} bytes", file.size_bytes);
    println!(
        "  Resolution: {}x{} @ {:.2}fps{}",
        metadata.width,
        metadata.height,
        metadata.frame_rate,
        if metadata.is_portrait() { " (portrait)" } else { "" }
    );
    println!("  Duration: {:.2}s", metadata.duration_secs);
    println!();

    println!("Preview:");
    match resolve_display_size(natural, &constraints, style.frame.scale) {
        Some(display) => println!("  Display size: {}x{}", display.width, display.height),
        None => println!("  Display size: unavailable"),
    }
    if let Some(geometry) = RenderGeometry::for_preview(natural, &style.frame, &constraints) {
        println!(
            "  Canvas: {}x{} (corner radius {:.1})",
            geometry.canvas_width, geometry.canvas_height, geometry.corner_radius
        );
    }
    println!();

    println!("Export:");
    for tier in QualityTier::ALL {
        match RenderGeometry::for_export(natural, &style.frame, &constraints, tier) {
            Some(geometry) => println!(
                "  {tier}: {}x{} (video {}x{}, scale {:.3})",
                geometry.canvas_width,
                geometry.canvas_height,
                geometry.destination.width,
                geometry.destination.height,
                geometry.scale_factor
            ),
            None => println!("  {tier}: unavailable"),
        }
    }

    Ok(())
}
