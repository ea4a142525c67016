use proptest::prelude::*;
use vidframe_frame_model::{FrameConfig, QualityTier};
use vidframe_geometry::{
    resolve_display_size, resolve_export_dimensions, resolve_shadow_geometry,
    transcode_dimensions, DisplayConstraints, RenderGeometry, Size,
};

fn tier() -> impl Strategy<Value = QualityTier> {
    prop_oneof![
        Just(QualityTier::P720),
        Just(QualityTier::P1080),
        Just(QualityTier::P1440),
    ]
}

proptest! {
    #[test]
    fn export_clamp_is_idempotent(
        width in 64.0f64..8000.0,
        height in 64.0f64..8000.0,
        padding in 0.0f64..200.0,
        scale_factor in 0.5f64..6.0,
        quality in tier(),
    ) {
        let video = Size::new(width.floor(), height.floor());
        let portrait = video.is_portrait();
        let first = resolve_export_dimensions(video, padding, scale_factor, quality, portrait)
            .unwrap();
        let second = resolve_export_dimensions(
            first.video,
            padding,
            first.scale_factor,
            quality,
            portrait,
        )
        .unwrap();

        prop_assert_eq!(second.video, first.video);
        prop_assert_eq!(second.padding, first.padding);
        prop_assert_eq!(second.canvas_width, first.canvas_width);
        prop_assert_eq!(second.canvas_height, first.canvas_height);
    }

    #[test]
    fn export_canvas_respects_ceiling(
        width in 16.0f64..8000.0,
        height in 16.0f64..8000.0,
        padding in 0.0f64..200.0,
        quality in tier(),
    ) {
        let video = Size::new(width, height);
        let portrait = video.is_portrait();
        let dims = resolve_export_dimensions(video, padding, 1.0, quality, portrait).unwrap();
        let (max_w, max_h) = quality.max_dimensions(portrait);

        prop_assert!(dims.canvas_width <= max_w);
        prop_assert!(dims.canvas_height <= max_h);
        prop_assert_eq!(dims.canvas_width % 2, 0);
        prop_assert_eq!(dims.canvas_height % 2, 0);
        prop_assert!(dims.clamp_ratio <= 1.0);
    }

    #[test]
    fn transcode_preserves_aspect(
        width in 2u32..8000,
        height in 2u32..8000,
        quality in tier(),
    ) {
        let (w, h) = transcode_dimensions(width, height, quality);
        let (max_w, max_h) = quality.max_dimensions(height > width);
        prop_assert!(w <= max_w && h <= max_h);
        prop_assert!(w <= width.max(2) && h <= height.max(2));
        prop_assert_eq!((w % 2, h % 2), (0, 0));
    }

    #[test]
    fn shadow_intensity_never_changes_padding(
        padding in 0.0f64..300.0,
        intensity in 0.0f64..=20.0,
        scale in 0.1f64..4.0,
    ) {
        let shadow = resolve_shadow_geometry(padding, intensity, scale);
        let reference = resolve_shadow_geometry(padding, 20.0, scale);
        prop_assert_eq!(shadow.padding, reference.padding);
        prop_assert!(shadow.blur <= shadow.padding * 0.9 + 1e-9);
        prop_assert!(shadow.opacity <= 0.7);
    }
}

#[test]
fn display_size_for_full_hd_in_1000px_viewport() {
    let constraints = DisplayConstraints::new(Size::new(1000.0, 1000.0));
    let size = resolve_display_size(Size::new(1920.0, 1080.0), &constraints, 1.0).unwrap();
    assert_eq!(size, Size::new(700.0, 393.0));
}

#[test]
fn quality_clamp_for_oversized_landscape_source() {
    let (w, h) = transcode_dimensions(4000, 3000, QualityTier::P720);
    assert!(w <= 1280 && h <= 720);
    assert!((w as f64 / h as f64 - 4.0 / 3.0).abs() < 1.0 / h as f64 * 2.0);
    assert_eq!((w % 2, h % 2), (0, 0));
}

#[test]
fn default_export_geometry_for_full_hd_source() {
    let constraints = DisplayConstraints::new(Size::new(1280.0, 1000.0));
    let geometry = RenderGeometry::for_export(
        Size::new(1920.0, 1080.0),
        &FrameConfig::default(),
        &constraints,
        QualityTier::P1080,
    )
    .unwrap();

    assert!(geometry.canvas_width <= 1920 && geometry.canvas_height <= 1080);
    assert_eq!(
        geometry.canvas_width as f64,
        geometry.destination.width + 2.0 * geometry.shadow.padding
    );
    assert!(geometry.shadow.blur > 0.0);
    assert!(geometry.corner_radius > 24.0);
}
