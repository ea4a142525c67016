//! Export quality tiers and delivery formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Named output resolution ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QualityTier {
    #[serde(rename = "720p")]
    P720,
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::P720, QualityTier::P1080, QualityTier::P1440];

    /// Landscape pixel ceiling `(width, height)`.
    pub fn landscape(self) -> (u32, u32) {
        match self {
            QualityTier::P720 => (1280, 720),
            QualityTier::P1080 => (1920, 1080),
            QualityTier::P1440 => (2560, 1440),
        }
    }

    /// Orientation-aware pixel ceiling `(width, height)`.
    pub fn max_dimensions(self, is_portrait: bool) -> (u32, u32) {
        let (w, h) = self.landscape();
        if is_portrait {
            (h, w)
        } else {
            (w, h)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::P720 => "720p",
            QualityTier::P1080 => "1080p",
            QualityTier::P1440 => "1440p",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QualityTier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Ok(QualityTier::P720),
            "1080p" | "1080" => Ok(QualityTier::P1080),
            "1440p" | "1440" => Ok(QualityTier::P1440),
            _ => Err(ModelError::UnknownQuality {
                value: s.to_string(),
            }),
        }
    }
}

/// Delivery container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Webm,
    Mp4,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Webm => "webm",
            ExportFormat::Mp4 => "mp4",
        }
    }

    /// Container MIME type without codec parameters.
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Webm => "video/webm",
            ExportFormat::Mp4 => "video/mp4",
        }
    }

    /// Resolve a container from a MIME type such as `video/webm;codecs=vp9`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let base = mime.split(';').next().unwrap_or_default().trim();
        match base.to_ascii_lowercase().as_str() {
            "video/webm" => Some(ExportFormat::Webm),
            "video/mp4" => Some(ExportFormat::Mp4),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Webm => "WebM",
            ExportFormat::Mp4 => "MP4",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webm" => Ok(ExportFormat::Webm),
            "mp4" => Ok(ExportFormat::Mp4),
            _ => Err(ModelError::UnknownFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// The `(quality, format)` pair chosen in the export dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExportSettings {
    pub quality: QualityTier,
    pub format: ExportFormat,
}
