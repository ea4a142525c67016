//! The pixel surface frames are composited onto.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tiny_skia::Pixmap;

use vidframe_common::error::{VidframeError, VidframeResult};

/// Premultiplied RGBA8 drawing surface.
#[derive(Clone)]
pub struct Surface {
    pixmap: Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Surface {
    pub fn new(width: u32, height: u32) -> VidframeResult<Self> {
        Ok(Self {
            pixmap: allocate(width, height)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Resize in place. Contents are cleared when the size changes; the new
    /// size is visible to `size()` as soon as this returns.
    pub fn resize(&mut self, width: u32, height: u32) -> VidframeResult<()> {
        if self.size() != (width, height) {
            self.pixmap = allocate(width, height)?;
        }
        Ok(())
    }

    /// Fill with transparent black.
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Straight (demultiplied) RGBA8 at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Copy out as straight RGBA8, the layout encoders expect.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    pub fn save_png(&self, path: &Path) -> VidframeResult<()> {
        self.pixmap
            .save_png(path)
            .map_err(|e| VidframeError::render(format!("Failed to write {}: {e}", path.display())))
    }
}

fn allocate(width: u32, height: u32) -> VidframeResult<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| {
        VidframeError::render(format!("Cannot allocate a {width}x{height} surface"))
    })
}

/// Who is drawing on a [`SharedSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    Preview,
    Export,
}

struct SurfaceSlot {
    surface: Surface,
    owner: Option<SurfaceMode>,
}

/// A surface shared by preview and export, written by one mode at a time.
#[derive(Clone)]
pub struct SharedSurface {
    slot: Arc<Mutex<SurfaceSlot>>,
}

fn lock(slot: &Mutex<SurfaceSlot>) -> MutexGuard<'_, SurfaceSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedSurface {
    pub fn new(width: u32, height: u32) -> VidframeResult<Self> {
        Ok(Self {
            slot: Arc::new(Mutex::new(SurfaceSlot {
                surface: Surface::new(width, height)?,
                owner: None,
            })),
        })
    }

    /// Take exclusive write access for `mode`.
    ///
    /// Fails while any claim is outstanding. The claim is released when the
    /// returned guard is dropped.
    pub fn claim(&self, mode: SurfaceMode) -> VidframeResult<SurfaceClaim> {
        let mut slot = lock(&self.slot);
        if let Some(owner) = slot.owner {
            return Err(VidframeError::render(format!(
                "Surface is in use by {owner:?}; cannot claim it for {mode:?}"
            )));
        }
        slot.owner = Some(mode);
        tracing::debug!(?mode, "Surface claimed");
        Ok(SurfaceClaim {
            mode,
            slot: Arc::clone(&self.slot),
        })
    }

    pub fn owner(&self) -> Option<SurfaceMode> {
        lock(&self.slot).owner
    }

    pub fn size(&self) -> (u32, u32) {
        lock(&self.slot).surface.size()
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Surface {
        lock(&self.slot).surface.clone()
    }
}

/// Exclusive write access to a [`SharedSurface`].
pub struct SurfaceClaim {
    mode: SurfaceMode,
    slot: Arc<Mutex<SurfaceSlot>>,
}

impl SurfaceClaim {
    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    /// Run `f` with the surface locked.
    pub fn with_surface<R>(&self, f: impl FnOnce(&mut Surface) -> R) -> R {
        f(&mut lock(&self.slot).surface)
    }
}

impl Drop for SurfaceClaim {
    fn drop(&mut self) {
        lock(&self.slot).owner = None;
        tracing::debug!(mode = ?self.mode, "Surface released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_is_immediately_visible() {
        let mut surface = Surface::new(4, 4).unwrap();
        surface.resize(820, 513).unwrap();
        assert_eq!(surface.size(), (820, 513));
        assert_eq!(surface.pixel(819, 512), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(Surface::new(0, 10).is_err());
    }

    #[test]
    fn test_claims_are_exclusive() {
        let shared = SharedSurface::new(8, 8).unwrap();
        let preview = shared.claim(SurfaceMode::Preview).unwrap();
        assert!(shared.claim(SurfaceMode::Export).is_err());
        assert_eq!(shared.owner(), Some(SurfaceMode::Preview));

        drop(preview);
        let export = shared.claim(SurfaceMode::Export).unwrap();
        assert_eq!(export.mode(), SurfaceMode::Export);
        export.with_surface(|s| s.resize(16, 2)).unwrap();
        assert_eq!(shared.size(), (16, 2));
    }

    #[test]
    fn test_to_rgba_demultiplies() {
        let mut surface = Surface::new(1, 1).unwrap();
        surface
            .pixmap_mut()
            .fill(tiny_skia::Color::from_rgba8(200, 100, 50, 128));
        let rgba = surface.to_rgba();
        assert_eq!(rgba[3], 128);
        assert!((i32::from(rgba[0]) - 200).abs() <= 2);
    }
}
