//! Vidframe Frame Model
//!
//! Defines the data contracts shared by the geometry resolver, the
//! compositor, and the export pipeline:
//! - **Frame:** Per-frame styling snapshot (radius, padding, shadow, scale, crop)
//! - **Crop:** Percentage-based crop rectangle and its invariants
//! - **Gradient:** Background gradient description
//! - **Export:** Quality tiers and delivery formats
//!
//! Crop coordinates are percentages in `[0, 100]` of the natural frame so
//! they survive changes of display size.

pub mod crop;
pub mod export;
pub mod frame;
pub mod gradient;

pub use crop::*;
pub use export::*;
pub use frame::*;
pub use gradient::*;

/// Errors raised while parsing or validating model values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid color '{value}': expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor { value: String },

    #[error("Unknown quality tier '{value}': use 720p, 1080p or 1440p")]
    UnknownQuality { value: String },

    #[error("Unknown export format '{value}': use webm or mp4")]
    UnknownFormat { value: String },

    #[error("Invalid gradient: {message}")]
    InvalidGradient { message: String },
}
