//! Frame compositor: draws one framed video frame onto a surface.

use tiny_skia::{
    Color, FillRule, FilterQuality, IntSize, Paint, Pattern, Pixmap, PixmapPaint, SpreadMode,
    Transform,
};

use vidframe_common::error::{VidframeError, VidframeResult};
use vidframe_frame_model::GradientSpec;
use vidframe_geometry::{Rect, RenderGeometry, ShadowGeometry};
use vidframe_media_source::VideoFrame;

use crate::blur::gaussian_blur_premul;
use crate::gradient::paint_background;
use crate::path::rounded_rect;
use crate::surface::Surface;

/// Shadow sigma above which the shadow layer is blurred at reduced size.
const SHADOW_DOWNSCALE_SIGMA: f64 = 4.0;

/// What a draw is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Transparent background; the host paints the gradient underneath.
    Preview,
    /// Gradient painted onto the surface itself.
    Export,
}

/// Draws frames and keeps per-geometry work (shadow layer, converted
/// frame) between calls.
#[derive(Default)]
pub struct Compositor {
    texture: Option<FrameTexture>,
    shadow: Option<ShadowLayer>,
}

/// Premultiplied copy of the last frame, valid while `frame` holds the
/// same decoded buffer.
struct FrameTexture {
    frame: VideoFrame,
    pixmap: Pixmap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ShadowKey {
    canvas: (u32, u32),
    destination: Rect,
    corner_radius: f64,
    shadow: ShadowGeometry,
}

struct ShadowLayer {
    key: ShadowKey,
    pixmap: Pixmap,
    scale: f32,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `frame` with `geometry` onto `surface`.
    ///
    /// The surface is resized to the canvas before anything is drawn. Order:
    /// gradient (export only), shadow, opaque backing, then the video
    /// sampled from the frame at native resolution inside the rounded clip.
    pub fn draw(
        &mut self,
        surface: &mut Surface,
        frame: &VideoFrame,
        geometry: &RenderGeometry,
        gradient: &GradientSpec,
        mode: RenderMode,
    ) -> VidframeResult<()> {
        if !geometry.is_renderable() {
            return Err(VidframeError::source_not_ready("Render geometry is empty"));
        }

        surface.resize(geometry.canvas_width, geometry.canvas_height)?;
        surface.clear();

        if mode == RenderMode::Export {
            paint_background(surface.pixmap_mut(), gradient)?;
        }

        let clip = rounded_rect(&geometry.destination, geometry.corner_radius)
            .ok_or_else(|| VidframeError::render("Cannot build the video clip path"))?;

        if geometry.shadow.is_visible() {
            let layer = self.shadow_layer(geometry)?;
            surface.pixmap_mut().draw_pixmap(
                0,
                0,
                layer.pixmap.as_ref(),
                &PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..PixmapPaint::default()
                },
                Transform::from_scale(layer.scale, layer.scale),
                None,
            );

            let mut backing = Paint::default();
            backing.set_color(Color::BLACK);
            backing.anti_alias = true;
            surface.pixmap_mut().fill_path(
                &clip,
                &backing,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }

        let texture = self.texture(frame)?;
        let paint = Paint {
            shader: Pattern::new(
                texture.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Bicubic,
                1.0,
                source_to_destination(&geometry.source, &geometry.destination),
            ),
            anti_alias: true,
            ..Paint::default()
        };
        surface
            .pixmap_mut()
            .fill_path(&clip, &paint, FillRule::Winding, Transform::identity(), None);

        Ok(())
    }

    /// Drop cached layers, e.g. after the source changed.
    pub fn reset(&mut self) {
        self.texture = None;
        self.shadow = None;
    }

    fn texture(&mut self, frame: &VideoFrame) -> VidframeResult<&Pixmap> {
        let stale = self
            .texture
            .as_ref()
            .map_or(true, |t| !t.frame.shares_pixels(frame));
        if stale {
            let size = IntSize::from_wh(frame.width, frame.height)
                .ok_or_else(|| VidframeError::source_not_ready("Video frame has zero size"))?;
            let pixmap = Pixmap::from_vec(premultiply(frame.data()), size)
                .ok_or_else(|| VidframeError::render("Video frame buffer has the wrong size"))?;
            self.texture = Some(FrameTexture {
                frame: frame.clone(),
                pixmap,
            });
        }
        self.texture
            .as_ref()
            .map(|t| &t.pixmap)
            .ok_or_else(|| VidframeError::render("Video texture missing"))
    }

    fn shadow_layer(&mut self, geometry: &RenderGeometry) -> VidframeResult<&ShadowLayer> {
        let key = ShadowKey {
            canvas: geometry.canvas_size(),
            destination: geometry.destination,
            corner_radius: geometry.corner_radius,
            shadow: geometry.shadow,
        };
        if self.shadow.as_ref().map_or(true, |layer| layer.key != key) {
            self.shadow = Some(build_shadow_layer(key)?);
        }
        self.shadow
            .as_ref()
            .ok_or_else(|| VidframeError::render("Shadow layer missing"))
    }
}

/// Render the offset shape at reduced size when the blur is wide, blur it,
/// and let the draw scale it back up.
fn build_shadow_layer(key: ShadowKey) -> VidframeResult<ShadowLayer> {
    let sigma = key.shadow.blur / 2.0;
    let scale = (sigma / SHADOW_DOWNSCALE_SIGMA).floor().max(1.0) as f32;
    let (canvas_w, canvas_h) = key.canvas;
    let width = (canvas_w as f32 / scale).ceil().max(1.0) as u32;
    let height = (canvas_h as f32 / scale).ceil().max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| VidframeError::render("Cannot allocate shadow layer"))?;

    let shape = Rect {
        y: key.destination.y + key.shadow.offset_y,
        ..key.destination
    };
    let path = rounded_rect(&shape, key.corner_radius)
        .ok_or_else(|| VidframeError::render("Cannot build the shadow path"))?;
    let mut paint = Paint::default();
    let alpha = (key.shadow.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    paint.set_color_rgba8(0, 0, 0, alpha);
    paint.anti_alias = true;
    pixmap.fill_path(
        &path,
        &paint,
        FillRule::Winding,
        Transform::from_scale(1.0 / scale, 1.0 / scale),
        None,
    );

    let blurred = gaussian_blur_premul(pixmap.data(), width, height, sigma as f32 / scale)?;
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| VidframeError::render("Shadow layer has zero size"))?;
    let pixmap = Pixmap::from_vec(blurred, size)
        .ok_or_else(|| VidframeError::render("Shadow layer buffer has the wrong size"))?;

    tracing::debug!(
        blur = key.shadow.blur,
        opacity = key.shadow.opacity,
        scale,
        "Built shadow layer"
    );
    Ok(ShadowLayer { key, pixmap, scale })
}

/// Map natural-resolution source pixels onto the destination rectangle.
fn source_to_destination(source: &Rect, destination: &Rect) -> Transform {
    let sx = (destination.width / source.width) as f32;
    let sy = (destination.height / source.height) as f32;
    Transform::from_row(
        sx,
        0.0,
        0.0,
        sy,
        destination.x as f32 - source.x as f32 * sx,
        destination.y as f32 - source.y as f32 * sy,
    )
}

fn premultiply(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len());
    for px in rgba.chunks_exact(4) {
        let a = px[3];
        if a == 255 {
            out.extend_from_slice(px);
            continue;
        }
        let af = u16::from(a) + 1;
        let mul = |c: u8| -> u8 { ((u16::from(c) * af) >> 8) as u8 };
        out.extend_from_slice(&[mul(px[0]), mul(px[1]), mul(px[2]), a]);
    }
    out
}
