//! Crop-adjusted source and destination rectangles.

use vidframe_frame_model::CropRegion;

use crate::types::{Rect, Size};

/// Where to sample from the video and how large to draw it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropGeometry {
    /// Rectangle in natural-resolution pixels to sample from.
    pub source: Rect,
    /// Drawn size, with its origin at zero. The caller positions it.
    pub destination: Rect,
}

/// Resolve the sampled and drawn rectangles for a crop selection.
///
/// Without crop the whole natural frame is drawn at the display size. With
/// crop both rectangles shrink by the region's width/height fractions and
/// the source origin moves to the region's offset.
pub fn resolve_crop_geometry(
    natural: Size,
    display: Size,
    region: &CropRegion,
    apply_crop: bool,
) -> Option<CropGeometry> {
    if natural.is_empty() || display.is_empty() {
        return None;
    }

    if !apply_crop {
        return Some(CropGeometry {
            source: Rect::from_size(natural),
            destination: Rect::from_size(display),
        });
    }

    let region = region.constrain();
    let fx = region.width / 100.0;
    let fy = region.height / 100.0;

    Some(CropGeometry {
        source: Rect::new(
            region.x / 100.0 * natural.width,
            region.y / 100.0 * natural.height,
            natural.width * fx,
            natural.height * fy,
        ),
        destination: Rect::new(0.0, 0.0, display.width * fx, display.height * fy),
    })
}
