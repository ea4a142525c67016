//! Background gradient painting.

use tiny_skia::{
    Color, GradientStop, LinearGradient, Paint, Pixmap, Point, RadialGradient, Rect, Shader,
    SpreadMode, Transform,
};

use vidframe_common::error::{VidframeError, VidframeResult};
use vidframe_frame_model::{GradientKind, GradientSpec, Rgba};

fn color(c: Rgba) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn stops(spec: &GradientSpec) -> Vec<GradientStop> {
    spec.colors
        .iter()
        .zip(spec.stop_positions())
        .map(|(c, pos)| GradientStop::new(pos, color(*c)))
        .collect()
}

/// Fill the whole pixmap with `spec`.
///
/// Single-color specs are a flat fill. Linear gradients run through the
/// center along `angle`, projected onto the half extents of the surface.
/// Radial gradients are centered. Mesh gradients are approximated by one
/// soft radial blob per extra stop over the first color.
pub fn paint_background(pixmap: &mut Pixmap, spec: &GradientSpec) -> VidframeResult<()> {
    let first = spec
        .colors
        .first()
        .copied()
        .ok_or_else(|| VidframeError::invalid_input("Gradient has no color stops"))?;

    if spec.is_flat() {
        pixmap.fill(color(first));
        return Ok(());
    }

    let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
    let (cx, cy) = (w / 2.0, h / 2.0);

    let shader = match spec.kind {
        GradientKind::Linear => {
            let theta = spec.normalized_angle().to_radians();
            let dx = theta.cos() as f32 * cx;
            let dy = theta.sin() as f32 * cy;
            LinearGradient::new(
                Point::from_xy(cx - dx, cy - dy),
                Point::from_xy(cx + dx, cy + dy),
                stops(spec),
                SpreadMode::Pad,
                Transform::identity(),
            )
        }
        GradientKind::Radial => RadialGradient::new(
            Point::from_xy(cx, cy),
            Point::from_xy(cx, cy),
            (w * w + h * h).sqrt() / 2.0,
            stops(spec),
            SpreadMode::Pad,
            Transform::identity(),
        ),
        GradientKind::Mesh => {
            paint_mesh(pixmap, spec, first);
            return Ok(());
        }
    };

    match shader {
        Some(shader) => fill_all(pixmap, shader),
        None => {
            tracing::debug!(kind = ?spec.kind, "Degenerate gradient, using flat fill");
            pixmap.fill(color(first));
        }
    }
    Ok(())
}

fn fill_all(pixmap: &mut Pixmap, shader: Shader<'_>) {
    let Some(rect) = Rect::from_xywh(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32)
    else {
        return;
    };
    let paint = Paint {
        shader,
        anti_alias: false,
        ..Paint::default()
    };
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

/// Blobs sit on an ellipse around the center, starting at `angle`.
fn paint_mesh(pixmap: &mut Pixmap, spec: &GradientSpec, base: Rgba) {
    pixmap.fill(color(base));

    let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let radius = w.max(h) * 0.6;
    let extra = &spec.colors[1..];
    let start = spec.normalized_angle().to_radians();

    for (i, c) in extra.iter().enumerate() {
        let theta = start + std::f64::consts::TAU * i as f64 / extra.len() as f64;
        let center = Point::from_xy(
            cx + theta.cos() as f32 * cx * 0.7,
            cy + theta.sin() as f32 * cy * 0.7,
        );
        let transparent = Rgba { a: 0, ..*c };
        let shader = RadialGradient::new(
            center,
            center,
            radius,
            vec![
                GradientStop::new(0.0, color(*c)),
                GradientStop::new(1.0, color(transparent)),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        );
        if let Some(shader) = shader {
            fill_all(pixmap, shader);
        }
    }
}
