//! Vidframe Render Engine
//!
//! Draws one composited frame at a time onto a pixel surface, for the
//! on-screen preview and for export capture.
//!
//! ```text
//!                 export only
//! gradient ──────────┐
//!                    ▼
//! shadow layer ──► surface ◄── rounded clip ◄── video (native samples)
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!    PreviewSink        recording pipeline
//! ```
//!
//! The surface is shared between preview and export but only one of them
//! may hold it at a time, see [`SharedSurface::claim`].

pub mod blur;
pub mod compositor;
pub mod gradient;
pub mod path;
pub mod preview;
pub mod snapshot;
pub mod surface;

pub use compositor::{Compositor, RenderMode};
pub use preview::{PreviewLoop, PreviewSettings, PreviewSink};
pub use snapshot::render_still;
pub use surface::{SharedSurface, Surface, SurfaceClaim, SurfaceMode};
