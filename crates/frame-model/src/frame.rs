//! Per-frame styling snapshot.

use serde::{Deserialize, Serialize};

use crate::crop::{CropRegion, CropSettings};

/// Upper bound of the shadow intensity slider.
pub const MAX_SHADOW_INTENSITY: f64 = 20.0;

/// Smallest accepted display scale multiplier.
pub const MIN_SCALE: f64 = 0.1;

/// Styling applied around the video on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameConfig {
    /// Corner radius in display pixels.
    pub border_radius: f64,

    /// Space around the video in display pixels. Also reserves room for the
    /// shadow.
    pub padding: f64,

    /// Shadow strength in `[0, 20]`.
    pub shadow_intensity: f64,

    /// Display-only size multiplier.
    pub scale: f64,

    pub crop: CropSettings,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            border_radius: 24.0,
            padding: 60.0,
            shadow_intensity: 20.0,
            scale: 1.0,
            crop: CropSettings::default(),
        }
    }
}

impl FrameConfig {
    /// Return a copy with every field forced into its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            border_radius: non_negative(self.border_radius),
            padding: non_negative(self.padding),
            shadow_intensity: non_negative(self.shadow_intensity).min(MAX_SHADOW_INTENSITY),
            scale: if self.scale.is_finite() {
                self.scale.max(MIN_SCALE)
            } else {
                1.0
            },
            crop: CropSettings {
                region: self.crop.region.constrain(),
                ..self.crop
            },
        }
    }

    /// Shadow strength as a fraction in `[0, 1]`.
    pub fn shadow_fraction(&self) -> f64 {
        non_negative(self.shadow_intensity).min(MAX_SHADOW_INTENSITY) / MAX_SHADOW_INTENSITY
    }

    /// Apply a field-level update. The result is sanitized.
    pub fn apply(&mut self, patch: &FrameConfigPatch) {
        if let Some(v) = patch.border_radius {
            self.border_radius = v;
        }
        if let Some(v) = patch.padding {
            self.padding = v;
        }
        if let Some(v) = patch.shadow_intensity {
            self.shadow_intensity = v;
        }
        if let Some(v) = patch.scale {
            self.scale = v;
        }
        if let Some(v) = patch.crop_enabled {
            self.crop.enabled = v;
        }
        if let Some(v) = patch.crop_editing {
            self.crop.editing = v;
        }
        if let Some(region) = patch.crop_region {
            self.crop.region = region;
        }
        *self = self.sanitized();
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Field-level update for a [`FrameConfig`], as produced by the settings
/// panel and the crop overlay (the latter only on drag release).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameConfigPatch {
    pub border_radius: Option<f64>,
    pub padding: Option<f64>,
    pub shadow_intensity: Option<f64>,
    pub scale: Option<f64>,
    pub crop_enabled: Option<bool>,
    pub crop_editing: Option<bool>,
    pub crop_region: Option<CropRegion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FrameConfig::default();
        assert_eq!(config.border_radius, 24.0);
        assert_eq!(config.padding, 60.0);
        assert_eq!(config.shadow_intensity, 20.0);
        assert!(!config.crop.enabled);
        assert!((config.shadow_fraction() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut config = FrameConfig::default();
        config.apply(&FrameConfigPatch {
            padding: Some(10.0),
            crop_enabled: Some(true),
            ..Default::default()
        });
        assert_eq!(config.padding, 10.0);
        assert_eq!(config.border_radius, 24.0);
        assert!(config.crop.enabled);
    }

    #[test]
    fn test_patch_sanitizes_out_of_range_values() {
        let mut config = FrameConfig::default();
        config.apply(&FrameConfigPatch {
            shadow_intensity: Some(45.0),
            border_radius: Some(-3.0),
            scale: Some(0.0),
            crop_region: Some(CropRegion {
                x: 98.0,
                y: 0.0,
                width: 2.0,
                height: 100.0,
            }),
            ..Default::default()
        });
        assert_eq!(config.shadow_intensity, MAX_SHADOW_INTENSITY);
        assert_eq!(config.border_radius, 0.0);
        assert_eq!(config.scale, MIN_SCALE);
        assert!(config.crop.region.is_valid());
        assert_eq!(config.crop.region.x, 95.0);
    }

    #[test]
    fn test_camel_case_json() {
        let config: FrameConfig =
            serde_json::from_str(r#"{ "borderRadius": 12, "shadowIntensity": 5 }"#).unwrap();
        assert_eq!(config.border_radius, 12.0);
        assert_eq!(config.shadow_intensity, 5.0);
        assert_eq!(config.padding, 60.0);
    }
}
