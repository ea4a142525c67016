//! Error types shared across Vidframe crates.

use std::path::PathBuf;

/// Top-level error type for Vidframe operations.
///
/// The first four variants form the export taxonomy: callers abort on
/// `SourceNotReady` and `CaptureFailed`, recover locally from
/// `TranscodeFailed`, and treat `UserCancelled` as a terminal state that is
/// not a failure.
#[derive(Debug, thiserror::Error)]
pub enum VidframeError {
    #[error("Source not ready: {message}")]
    SourceNotReady { message: String },

    #[error("Capture failed: {message}")]
    CaptureFailed { message: String },

    #[error("Transcode failed: {message}")]
    TranscodeFailed { message: String },

    #[error("Export cancelled by user")]
    UserCancelled,

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using VidframeError.
pub type VidframeResult<T> = Result<T, VidframeError>;

impl VidframeError {
    pub fn source_not_ready(msg: impl Into<String>) -> Self {
        Self::SourceNotReady {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::CaptureFailed {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::TranscodeFailed {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error represents an explicit user cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Whether an export hitting this error can recover by delivering the
    /// captured container instead.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(self, Self::TranscodeFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_distinct_from_failures() {
        assert!(VidframeError::UserCancelled.is_cancelled());
        assert!(!VidframeError::capture("no data recorded").is_cancelled());
        assert!(!VidframeError::source_not_ready("zero size").is_cancelled());
    }

    #[test]
    fn test_only_transcode_errors_fall_back() {
        assert!(VidframeError::transcode("engine init").is_recoverable_by_fallback());
        assert!(!VidframeError::capture("encoder died").is_recoverable_by_fallback());
        assert!(!VidframeError::UserCancelled.is_recoverable_by_fallback());
    }

    #[test]
    fn test_error_messages() {
        let err = VidframeError::capture("no data recorded");
        assert_eq!(err.to_string(), "Capture failed: no data recorded");
    }
}
