//! Single-frame rendering for stills.

use vidframe_common::error::VidframeResult;
use vidframe_frame_model::GradientSpec;
use vidframe_geometry::RenderGeometry;
use vidframe_media_source::VideoFrame;

use crate::compositor::{Compositor, RenderMode};
use crate::surface::Surface;

/// Render one export-mode frame onto a fresh surface.
pub fn render_still(
    frame: &VideoFrame,
    geometry: &RenderGeometry,
    gradient: &GradientSpec,
) -> VidframeResult<Surface> {
    let mut surface = Surface::new(geometry.canvas_width.max(1), geometry.canvas_height.max(1))?;
    Compositor::new().draw(&mut surface, frame, geometry, gradient, RenderMode::Export)?;
    tracing::debug!(
        width = surface.width(),
        height = surface.height(),
        timestamp_secs = frame.timestamp_secs,
        "Rendered still"
    );
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidframe_frame_model::{FrameConfig, QualityTier};
    use vidframe_geometry::{DisplayConstraints, Size};

    #[test]
    fn test_still_is_written_as_png() {
        let constraints = DisplayConstraints::new(Size::new(1280.0, 1000.0));
        let geometry = RenderGeometry::for_export(
            Size::new(160.0, 90.0),
            &FrameConfig::default(),
            &constraints,
            QualityTier::P720,
        )
        .unwrap();
        let frame = VideoFrame::solid(160, 90, [30, 30, 30, 255]);
        let surface = render_still(&frame, &geometry, &GradientSpec::default()).unwrap();
        assert_eq!(surface.size(), geometry.canvas_size());

        let path = std::env::temp_dir().join(format!("vidframe-still-{}.png", std::process::id()));
        surface.save_png(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        let _ = std::fs::remove_file(&path);
    }
}
