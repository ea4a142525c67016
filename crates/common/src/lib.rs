//! Vidframe Common Utilities
//!
//! Shared infrastructure for all Vidframe crates:
//! - Error taxonomy and result alias
//! - Clock and timing utilities for real-time capture
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
