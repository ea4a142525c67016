//! On-screen preview size.

use serde::{Deserialize, Serialize};

use crate::types::Size;

/// Layout limits for the preview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayConstraints {
    /// Space available to the preview.
    pub viewport: Size,
    /// Fraction of each viewport axis the preview may occupy.
    pub max_height_fraction: f64,
    /// Minimum width for portrait sources.
    pub min_width: f64,
}

impl DisplayConstraints {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            max_height_fraction: 0.7,
            min_width: 400.0,
        }
    }
}

/// Compute the preview size of a video.
///
/// The height ceiling is applied first, then the width ceiling. Portrait
/// sources narrower than `min_width` are re-derived from that width and
/// re-checked against the height ceiling. `scale` multiplies both axes and
/// results are floored to whole pixels.
pub fn resolve_display_size(
    natural: Size,
    constraints: &DisplayConstraints,
    scale: f64,
) -> Option<Size> {
    if natural.is_empty() || constraints.viewport.is_empty() {
        return None;
    }

    let aspect = natural.aspect();
    let max_height = constraints.viewport.height * constraints.max_height_fraction;
    let max_width = constraints.viewport.width * constraints.max_height_fraction;

    let mut height = natural.height.min(max_height);
    let mut width = height * aspect;

    if width > max_width {
        width = max_width;
        height = width / aspect;
    }

    if natural.is_portrait() && width < constraints.min_width {
        width = constraints.min_width;
        height = width / aspect;
        if height > max_height {
            height = max_height;
            width = height * aspect;
        }
    }

    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let size = Size::new((width * scale).floor(), (height * scale).floor());
    if size.is_empty() {
        None
    } else {
        Some(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_viewport(side: f64) -> DisplayConstraints {
        DisplayConstraints::new(Size::new(side, side))
    }

    #[test]
    fn test_landscape_fits_width_ceiling() {
        let size =
            resolve_display_size(Size::new(1920.0, 1080.0), &square_viewport(1000.0), 1.0).unwrap();
        assert_eq!(size, Size::new(700.0, 393.0));
        let aspect_error = (size.width / (1920.0 / 1080.0) - size.height).abs();
        assert!(aspect_error <= 1.0);
    }

    #[test]
    fn test_small_video_is_not_enlarged() {
        let size =
            resolve_display_size(Size::new(320.0, 240.0), &square_viewport(1000.0), 1.0).unwrap();
        assert_eq!(size, Size::new(320.0, 240.0));
    }

    #[test]
    fn test_portrait_is_height_constrained() {
        let size =
            resolve_display_size(Size::new(1080.0, 1920.0), &square_viewport(1000.0), 1.0).unwrap();
        assert_eq!(size.height, 700.0);
        assert_eq!(size.width, 393.0);
    }

    #[test]
    fn test_small_portrait_uses_min_width() {
        let size =
            resolve_display_size(Size::new(150.0, 200.0), &square_viewport(1000.0), 1.0).unwrap();
        assert_eq!(size, Size::new(400.0, 533.0));
    }

    #[test]
    fn test_scale_multiplies_both_axes() {
        let size =
            resolve_display_size(Size::new(320.0, 240.0), &square_viewport(1000.0), 1.5).unwrap();
        assert_eq!(size, Size::new(480.0, 360.0));
    }

    #[test]
    fn test_zero_size_yields_none() {
        assert!(resolve_display_size(Size::new(0.0, 0.0), &square_viewport(1000.0), 1.0).is_none());
        assert!(resolve_display_size(Size::new(640.0, 480.0), &square_viewport(0.0), 1.0).is_none());
    }
}
