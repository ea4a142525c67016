//! Shadow space and strength.

use serde::{Deserialize, Serialize};

use vidframe_frame_model::MAX_SHADOW_INTENSITY;

/// Share of the padding the blur may use.
pub const SHADOW_BLUR_RESERVE: f64 = 0.9;

/// Vertical shadow offset relative to the blur.
pub const SHADOW_OFFSET_RATIO: f64 = 0.3;

/// Opacity at full intensity.
pub const MAX_SHADOW_OPACITY: f64 = 0.7;

/// Resolved drop shadow parameters in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShadowGeometry {
    /// Padding around the video; the canvas grows by twice this value.
    pub padding: f64,
    pub blur: f64,
    pub offset_y: f64,
    pub opacity: f64,
}

impl ShadowGeometry {
    pub fn is_visible(&self) -> bool {
        self.blur > 0.0 && self.opacity > 0.0
    }
}

/// Derive the shadow from padding and intensity.
///
/// Space is reserved by padding alone, so changing the intensity never
/// changes the canvas size. A requested blur larger than the padding can
/// hold is clamped through the reserve factor rather than rejected.
pub fn resolve_shadow_geometry(
    padding: f64,
    shadow_intensity: f64,
    scale_factor: f64,
) -> ShadowGeometry {
    let scaled_padding = (padding * scale_factor).max(0.0);
    let strength = (shadow_intensity / MAX_SHADOW_INTENSITY).clamp(0.0, 1.0);
    let max_blur = scaled_padding * SHADOW_BLUR_RESERVE;
    let blur = strength * max_blur;

    ShadowGeometry {
        padding: scaled_padding,
        blur,
        offset_y: blur * SHADOW_OFFSET_RATIO,
        opacity: (strength * MAX_SHADOW_OPACITY).min(MAX_SHADOW_OPACITY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_intensity() {
        let shadow = resolve_shadow_geometry(60.0, 20.0, 1.0);
        assert_eq!(shadow.padding, 60.0);
        assert!((shadow.blur - 54.0).abs() < 1e-9);
        assert!((shadow.offset_y - 16.2).abs() < 1e-9);
        assert!((shadow.opacity - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_zero_intensity_keeps_padding() {
        let off = resolve_shadow_geometry(60.0, 0.0, 2.0);
        let on = resolve_shadow_geometry(60.0, 20.0, 2.0);
        assert_eq!(off.blur, 0.0);
        assert_eq!(off.opacity, 0.0);
        assert!(!off.is_visible());
        assert_eq!(off.padding, on.padding);
    }

    #[test]
    fn test_blur_is_clamped_by_padding() {
        let shadow = resolve_shadow_geometry(4.0, 20.0, 1.0);
        assert!(shadow.blur <= shadow.padding);
    }
}
