//! Output dimensions under a quality tier ceiling.

use serde::{Deserialize, Serialize};

use vidframe_frame_model::QualityTier;

use crate::types::Size;

/// Tolerance when comparing against a tier ceiling.
const CEILING_EPSILON: f64 = 1e-6;

/// Export-resolution sizes after clamping to a quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportDimensions {
    /// Video rectangle size in whole pixels.
    pub video: Size,
    /// Padding on each side in whole pixels.
    pub padding: f64,
    /// Display-to-output factor after clamping.
    pub scale_factor: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Uniform downscale that was applied (`1.0` when none).
    pub clamp_ratio: f64,
}

/// Fit `video + 2 × padding × scale_factor` inside the tier ceiling.
///
/// Only ever downscales. Video size, padding and scale factor shrink by the
/// same ratio so proportions hold. The canvas is made even by trimming the
/// video rectangle; feeding the result back in is a no-op.
pub fn resolve_export_dimensions(
    video: Size,
    padding: f64,
    scale_factor: f64,
    quality: QualityTier,
    is_portrait: bool,
) -> Option<ExportDimensions> {
    if video.is_empty() || !scale_factor.is_finite() || scale_factor <= 0.0 {
        return None;
    }

    let padding = padding.max(0.0);
    let scaled_padding = padding * scale_factor;
    let total_width = video.width + 2.0 * scaled_padding;
    let total_height = video.height + 2.0 * scaled_padding;

    let (max_width, max_height) = quality.max_dimensions(is_portrait);
    let (max_width, max_height) = (max_width as f64, max_height as f64);

    let fits = total_width <= max_width + CEILING_EPSILON
        && total_height <= max_height + CEILING_EPSILON;
    let ratio = if fits {
        1.0
    } else {
        (max_width / total_width).min(max_height / total_height).min(1.0)
    };

    let scale_factor = scale_factor * ratio;
    let padding_px = (padding * scale_factor + CEILING_EPSILON).floor();
    let mut video_width = ((video.width * ratio) + CEILING_EPSILON).floor().max(2.0);
    let mut video_height = ((video.height * ratio) + CEILING_EPSILON).floor().max(2.0);

    let mut canvas_width = video_width as u32 + 2 * padding_px as u32;
    let mut canvas_height = video_height as u32 + 2 * padding_px as u32;
    if canvas_width % 2 == 1 {
        video_width -= 1.0;
        canvas_width -= 1;
    }
    if canvas_height % 2 == 1 {
        video_height -= 1.0;
        canvas_height -= 1;
    }

    if ratio < 1.0 {
        tracing::debug!(
            ratio,
            canvas_width,
            canvas_height,
            tier = %quality,
            "Export canvas clamped to quality tier"
        );
    }

    Some(ExportDimensions {
        video: Size::new(video_width, video_height),
        padding: padding_px,
        scale_factor,
        canvas_width,
        canvas_height,
        clamp_ratio: ratio,
    })
}

/// Frame size for the delivery encode: orientation-aware tier clamp with
/// even dimensions, as required by 4:2:0 codecs.
pub fn transcode_dimensions(width: u32, height: u32, quality: QualityTier) -> (u32, u32) {
    let is_portrait = height > width;
    let (max_width, max_height) = quality.max_dimensions(is_portrait);
    let (w, h) = (width.max(2) as f64, height.max(2) as f64);
    let ratio = (max_width as f64 / w).min(max_height as f64 / h).min(1.0);

    let even = |v: f64| -> u32 {
        let v = (v + CEILING_EPSILON).floor() as u32;
        (v - v % 2).max(2)
    };
    (even(w * ratio), even(h * ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_clamp_when_within_ceiling() {
        let dims =
            resolve_export_dimensions(Size::new(1280.0, 720.0), 0.0, 1.0, QualityTier::P1080, false)
                .unwrap();
        assert_eq!(dims.clamp_ratio, 1.0);
        assert_eq!((dims.canvas_width, dims.canvas_height), (1280, 720));
    }

    #[test]
    fn test_large_landscape_clamps_to_720p() {
        let dims =
            resolve_export_dimensions(Size::new(4000.0, 3000.0), 0.0, 1.0, QualityTier::P720, false)
                .unwrap();
        assert!(dims.canvas_width <= 1280 && dims.canvas_height <= 720);
        assert_eq!((dims.canvas_width, dims.canvas_height), (960, 720));
    }

    #[test]
    fn test_padding_shrinks_with_video() {
        let dims = resolve_export_dimensions(
            Size::new(1920.0, 1080.0),
            60.0,
            1920.0 / 896.0,
            QualityTier::P1080,
            false,
        )
        .unwrap();
        assert!(dims.clamp_ratio < 1.0);
        assert!(dims.canvas_width <= 1920 && dims.canvas_height <= 1080);
        assert_eq!(dims.canvas_width % 2, 0);
        assert_eq!(dims.canvas_height % 2, 0);
        assert_eq!(
            dims.canvas_width as f64,
            dims.video.width + 2.0 * dims.padding
        );
    }

    #[test]
    fn test_portrait_uses_portrait_ceiling() {
        let dims =
            resolve_export_dimensions(Size::new(1080.0, 1920.0), 0.0, 1.0, QualityTier::P720, true)
                .unwrap();
        assert_eq!((dims.canvas_width, dims.canvas_height), (720, 1280));
    }

    #[test]
    fn test_transcode_dimensions_are_even_and_bounded() {
        assert_eq!(transcode_dimensions(4000, 3000, QualityTier::P720), (960, 720));
        assert_eq!(transcode_dimensions(1081, 1921, QualityTier::P1440), (1080, 1920));
        assert_eq!(transcode_dimensions(3000, 4000, QualityTier::P720), (720, 960));
        let (w, h) = transcode_dimensions(1757, 1079, QualityTier::P1080);
        assert_eq!((w % 2, h % 2), (0, 0));
    }

    #[test]
    fn test_empty_video_yields_none() {
        assert!(
            resolve_export_dimensions(Size::new(0.0, 720.0), 10.0, 1.0, QualityTier::P720, false)
                .is_none()
        );
    }
}
