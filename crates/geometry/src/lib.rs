//! Vidframe Geometry Resolver
//!
//! Pure functions turning the natural video size and the frame styling into
//! the rectangles the compositor draws with. Nothing here touches pixels.
//!
//! ```text
//! natural size ──┬── resolve_display_size ──┐
//!                │                           ├── resolve_crop_geometry ──┐
//! crop region ───┘                           │                           ├── RenderGeometry
//! padding/shadow ─── resolve_shadow_geometry ┘                           │
//! quality tier ───── resolve_export_dimensions ──────────────────────────┘
//! ```
//!
//! Every resolver returns `None` for a zero-sized input; callers must not
//! render in that case.

pub mod crop;
pub mod display;
pub mod export;
pub mod render;
pub mod shadow;
pub mod types;

pub use crop::*;
pub use display::*;
pub use export::*;
pub use render::*;
pub use shadow::*;
pub use types::*;
