//! Crop region types.
//!
//! All values are percentages of the natural frame in `[0.0, 100.0]`.

use serde::{Deserialize, Serialize};

/// Smallest crop edge, in percent of the natural frame.
pub const MIN_CROP_SIZE: f64 = 5.0;

/// A rectangular crop selection within the natural video frame.
///
/// `(0, 0)` is the top-left corner, `(100, 100)` the bottom-right. After
/// [`CropRegion::constrain`], `x + width <= 100`, `y + height <= 100` and
/// both edges are at least [`MIN_CROP_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    /// Left edge (percent).
    pub x: f64,
    /// Top edge (percent).
    pub y: f64,
    /// Width (percent).
    pub width: f64,
    /// Height (percent).
    pub height: f64,
}

impl CropRegion {
    /// The whole frame.
    pub const FULL: CropRegion = CropRegion {
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
    };

    /// Create a crop region, constraining values to the valid range.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
        .constrain()
    }

    /// Clamp the region so it satisfies the crop invariants.
    ///
    /// Size is clamped first so the origin can then be kept inside the
    /// frame. Non-finite components fall back to the full-frame value.
    pub fn constrain(self) -> Self {
        let width = finite_or(self.width, 100.0).clamp(MIN_CROP_SIZE, 100.0);
        let height = finite_or(self.height, 100.0).clamp(MIN_CROP_SIZE, 100.0);
        let x = finite_or(self.x, 0.0).clamp(0.0, 100.0 - width);
        let y = finite_or(self.y, 0.0).clamp(0.0, 100.0 - height);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region already satisfies every invariant.
    pub fn is_valid(&self) -> bool {
        self.width >= MIN_CROP_SIZE
            && self.height >= MIN_CROP_SIZE
            && self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= 100.0
            && self.y + self.height <= 100.0
    }

    /// Right edge (percent).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (percent).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the region covers the whole frame.
    pub fn is_full(&self) -> bool {
        self.x <= 0.0 && self.y <= 0.0 && self.width >= 100.0 && self.height >= 100.0
    }
}

impl Default for CropRegion {
    fn default() -> Self {
        Self::FULL
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Crop state as edited in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CropSettings {
    /// Whether the crop is applied to the output.
    pub enabled: bool,
    /// Whether the crop handles are being edited. While editing the full
    /// frame is shown, but `region` is kept for later re-application.
    pub editing: bool,
    /// The selected region.
    pub region: CropRegion,
}

impl CropSettings {
    /// Whether rendering should apply the crop region.
    pub fn applies(&self) -> bool {
        self.enabled && !self.editing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_region() {
        let region = CropRegion::FULL;
        assert!(region.is_valid());
        assert!(region.is_full());
        assert_eq!(region.right(), 100.0);
    }

    #[test]
    fn test_constrain_moves_origin_inside_frame() {
        let region = CropRegion::new(80.0, 90.0, 40.0, 30.0);
        assert_eq!(region.width, 40.0);
        assert_eq!(region.x, 60.0);
        assert_eq!(region.y, 70.0);
        assert!(region.is_valid());
    }

    #[test]
    fn test_constrain_enforces_minimum_size() {
        let region = CropRegion::new(99.0, 99.0, 1.0, 0.0);
        assert_eq!(region.width, MIN_CROP_SIZE);
        assert_eq!(region.height, MIN_CROP_SIZE);
        assert_eq!(region.x, 95.0);
        assert_eq!(region.y, 95.0);
    }

    #[test]
    fn test_constrain_replaces_non_finite_values() {
        let region = CropRegion::new(f64::NAN, 10.0, f64::INFINITY, 50.0);
        assert_eq!(region.x, 0.0);
        assert_eq!(region.width, 100.0);
        assert!(region.is_valid());
    }

    #[test]
    fn test_editing_suppresses_crop() {
        let crop = CropSettings {
            enabled: true,
            editing: true,
            region: CropRegion::new(10.0, 10.0, 50.0, 50.0),
        };
        assert!(!crop.applies());
        assert_eq!(crop.region.width, 50.0);

        let crop = CropSettings {
            editing: false,
            ..crop
        };
        assert!(crop.applies());
    }
}
