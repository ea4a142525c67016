//! Per-frame render geometry for preview and export, plus the
//! last-known-good cache used by the preview.

use serde::{Deserialize, Serialize};

use vidframe_frame_model::{FrameConfig, QualityTier};

use crate::crop::resolve_crop_geometry;
use crate::display::{resolve_display_size, DisplayConstraints};
use crate::export::resolve_export_dimensions;
use crate::shadow::{resolve_shadow_geometry, ShadowGeometry};
use crate::types::{Rect, Size};

/// Everything the compositor needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderGeometry {
    /// Surface size: video plus padding on each side.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Natural-resolution pixels sampled from the video.
    pub source: Rect,
    /// Where the video lands on the surface.
    pub destination: Rect,
    /// Corner radius in surface pixels, at most half the short edge of
    /// `destination`.
    pub corner_radius: f64,
    pub shadow: ShadowGeometry,
    /// Display-to-surface factor.
    pub scale_factor: f64,
}

impl RenderGeometry {
    /// Geometry of the on-screen preview. Padding, radius and shadow follow
    /// the display scale multiplier.
    pub fn for_preview(
        natural: Size,
        config: &FrameConfig,
        constraints: &DisplayConstraints,
    ) -> Option<Self> {
        let config = config.sanitized();
        let display = resolve_display_size(natural, constraints, config.scale)?;
        let crop =
            resolve_crop_geometry(natural, display, &config.crop.region, config.crop.applies())?;
        let shadow = resolve_shadow_geometry(config.padding, config.shadow_intensity, config.scale);

        let padding = shadow.padding.round();
        let destination = Rect::new(
            padding,
            padding,
            crop.destination.width,
            crop.destination.height,
        );

        Some(Self {
            canvas_width: (destination.width + 2.0 * padding).round() as u32,
            canvas_height: (destination.height + 2.0 * padding).round() as u32,
            source: crop.source,
            destination,
            corner_radius: (config.border_radius * config.scale)
                .min(destination.max_corner_radius()),
            shadow: ShadowGeometry { padding, ..shadow },
            scale_factor: config.scale,
        })
    }

    /// Geometry of the exported video.
    ///
    /// Works in natural-resolution pixels: display-space styling is scaled
    /// by `natural.width / display.width` (ignoring the display-only scale
    /// multiplier) and the whole canvas is then clamped to the quality tier.
    pub fn for_export(
        natural: Size,
        config: &FrameConfig,
        constraints: &DisplayConstraints,
        quality: QualityTier,
    ) -> Option<Self> {
        let config = config.sanitized();
        let display = resolve_display_size(natural, constraints, 1.0)?;
        let crop =
            resolve_crop_geometry(natural, display, &config.crop.region, config.crop.applies())?;

        let scale_factor = natural.width / display.width;
        let video = crop.source.size();
        let dims = resolve_export_dimensions(
            video,
            config.padding,
            scale_factor,
            quality,
            video.is_portrait(),
        )?;

        let shadow =
            resolve_shadow_geometry(config.padding, config.shadow_intensity, dims.scale_factor);
        let destination = Rect::new(dims.padding, dims.padding, dims.video.width, dims.video.height);

        Some(Self {
            canvas_width: dims.canvas_width,
            canvas_height: dims.canvas_height,
            source: crop.source,
            destination,
            corner_radius: (config.border_radius * dims.scale_factor)
                .min(destination.max_corner_radius()),
            shadow: ShadowGeometry {
                padding: dims.padding,
                ..shadow
            },
            scale_factor: dims.scale_factor,
        })
    }

    /// Whether the geometry describes something drawable.
    pub fn is_renderable(&self) -> bool {
        self.canvas_width > 0
            && self.canvas_height > 0
            && !self.source.is_empty()
            && !self.destination.is_empty()
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }
}

/// Holds the most recent renderable geometry.
///
/// When a fresh measurement is unavailable (metadata not loaded yet, layout
/// in flux) the cached value is reused so nothing renders with zero sizes.
/// Failed measurements never clear the cache; only [`GeometryCache::invalidate`]
/// does, on unmount.
#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    last: Option<RenderGeometry>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fresh` if renderable and return the geometry to draw with.
    pub fn resolve(&mut self, fresh: Option<RenderGeometry>) -> Option<RenderGeometry> {
        match fresh {
            Some(geometry) if geometry.is_renderable() => {
                self.last = Some(geometry);
                Some(geometry)
            }
            _ => self.last,
        }
    }

    pub fn last(&self) -> Option<RenderGeometry> {
        self.last
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidframe_frame_model::{CropRegion, CropSettings};

    fn constraints() -> DisplayConstraints {
        DisplayConstraints::new(Size::new(1000.0, 1000.0))
    }

    #[test]
    fn test_preview_geometry_reserves_padding() {
        let config = FrameConfig::default();
        let geometry =
            RenderGeometry::for_preview(Size::new(1920.0, 1080.0), &config, &constraints())
                .unwrap();
        assert_eq!(geometry.destination, Rect::new(60.0, 60.0, 700.0, 393.0));
        assert_eq!(geometry.canvas_size(), (820, 513));
        assert_eq!(geometry.corner_radius, 24.0);
        assert_eq!(geometry.source, Rect::new(0.0, 0.0, 1920.0, 1080.0));
    }

    #[test]
    fn test_shadow_intensity_does_not_change_canvas() {
        let mut config = FrameConfig::default();
        let natural = Size::new(1920.0, 1080.0);
        let strong = RenderGeometry::for_export(natural, &config, &constraints(), QualityTier::P1080)
            .unwrap();
        config.shadow_intensity = 0.0;
        let none = RenderGeometry::for_export(natural, &config, &constraints(), QualityTier::P1080)
            .unwrap();
        assert_eq!(strong.canvas_size(), none.canvas_size());
        assert_eq!(none.shadow.blur, 0.0);
        assert_eq!(none.shadow.opacity, 0.0);
    }

    #[test]
    fn test_export_geometry_samples_natural_pixels() {
        let config = FrameConfig {
            padding: 0.0,
            ..FrameConfig::default()
        };
        let geometry = RenderGeometry::for_export(
            Size::new(1280.0, 720.0),
            &config,
            &constraints(),
            QualityTier::P1080,
        )
        .unwrap();
        assert_eq!(geometry.canvas_size(), (1280, 720));
        assert_eq!(geometry.destination.size(), Size::new(1280.0, 720.0));
        assert!(geometry.scale_factor > 1.0);
    }

    #[test]
    fn test_editing_crop_renders_full_frame() {
        let region = CropRegion::new(10.0, 10.0, 50.0, 50.0);
        let config = FrameConfig {
            crop: CropSettings {
                enabled: true,
                editing: true,
                region,
            },
            ..FrameConfig::default()
        };
        let geometry =
            RenderGeometry::for_preview(Size::new(1920.0, 1080.0), &config, &constraints())
                .unwrap();
        assert_eq!(geometry.source.size(), Size::new(1920.0, 1080.0));
        assert_eq!(config.crop.region, region);
    }

    #[test]
    fn test_corner_radius_is_limited_by_video() {
        let config = FrameConfig {
            border_radius: 10_000.0,
            ..FrameConfig::default()
        };
        let geometry =
            RenderGeometry::for_preview(Size::new(1920.0, 1080.0), &config, &constraints())
                .unwrap();
        assert_eq!(geometry.corner_radius, geometry.destination.max_corner_radius());
    }

    #[test]
    fn test_cache_keeps_last_good_geometry() {
        let mut cache = GeometryCache::new();
        assert!(cache.resolve(None).is_none());

        let good = RenderGeometry::for_preview(
            Size::new(640.0, 480.0),
            &FrameConfig::default(),
            &constraints(),
        );
        assert_eq!(cache.resolve(good), good);
        assert_eq!(cache.resolve(None), good);

        cache.invalidate();
        assert!(cache.resolve(None).is_none());
    }
}
