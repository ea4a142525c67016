//! Rounded rectangle paths.

use tiny_skia::{Path, PathBuilder};

use vidframe_geometry::Rect;

/// Cubic control point distance for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_75;

/// Closed path of four edges and four quarter-round corners.
///
/// The radius is used as given. Callers keep it at or below half the short
/// edge; larger values make the corner curves overlap. A radius of zero
/// yields a plain rectangle.
pub fn rounded_rect(rect: &Rect, radius: f64) -> Option<Path> {
    let (x, y) = (rect.x as f32, rect.y as f32);
    let (w, h) = (rect.width as f32, rect.height as f32);
    if !(w > 0.0 && h > 0.0) {
        return None;
    }

    let r = radius.max(0.0) as f32;
    if r == 0.0 {
        return Some(PathBuilder::from_rect(tiny_skia::Rect::from_xywh(x, y, w, h)?));
    }

    let c = r * KAPPA;
    let (right, bottom) = (x + w, y + h);
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + c, y, right, y + r - c, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + c, right - r + c, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - c, bottom, x, bottom - r + c, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - c, x + r - c, y, x + r, y);
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_match_rect() {
        let path = rounded_rect(&Rect::new(10.0, 20.0, 100.0, 50.0), 12.0).unwrap();
        let bounds = path.bounds();
        assert!((bounds.left() - 10.0).abs() < 1e-3);
        assert!((bounds.top() - 20.0).abs() < 1e-3);
        assert!((bounds.right() - 110.0).abs() < 1e-3);
        assert!((bounds.bottom() - 70.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_radius_is_rect() {
        let path = rounded_rect(&Rect::new(0.0, 0.0, 4.0, 3.0), 0.0).unwrap();
        assert_eq!(path.bounds(), tiny_skia::Rect::from_xywh(0.0, 0.0, 4.0, 3.0).unwrap());
        assert!(path.points().len() <= 5);
    }

    #[test]
    fn test_empty_rect_has_no_path() {
        assert!(rounded_rect(&Rect::new(0.0, 0.0, 0.0, 3.0), 2.0).is_none());
    }
}
