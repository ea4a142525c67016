//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where exported files are written.
    pub output_dir: PathBuf,

    /// Default export parameters.
    pub export: ExportDefaults,

    /// Preview layout parameters.
    pub preview: PreviewDefaults,

    /// External media tool locations.
    pub ffmpeg: FfmpegConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Quality tier name (`720p`, `1080p`, `1440p`).
    pub quality: String,

    /// Delivery format name (`webm`, `mp4`).
    pub format: String,

    /// Frame rate of the captured stream.
    pub capture_fps: u32,

    /// Interval at which the encoder hands out accumulated data.
    pub flush_interval_ms: u64,
}

/// On-screen preview layout parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewDefaults {
    /// Available viewport width in pixels.
    pub viewport_width: u32,

    /// Available viewport height in pixels.
    pub viewport_height: u32,

    /// Fraction of the viewport the preview may occupy.
    pub max_height_fraction: f64,

    /// Minimum preview width for portrait sources.
    pub min_width: f64,

    /// Redraw rate of the preview loop (Hz).
    pub refresh_rate_hz: u32,
}

/// Locations of the ffmpeg tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    /// `ffmpeg` binary name or path.
    pub ffmpeg: PathBuf,

    /// `ffprobe` binary name or path.
    pub ffprobe: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vidframe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            export: ExportDefaults::default(),
            preview: PreviewDefaults::default(),
            ffmpeg: FfmpegConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            quality: "1080p".to_string(),
            format: "webm".to_string(),
            capture_fps: 30,
            flush_interval_ms: 100,
        }
    }
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 1000,
            max_height_fraction: 0.7,
            min_width: 400.0,
            refresh_rate_hz: 60,
        }
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("vidframe").join("config.json")
}

/// Default export directory.
fn default_output_dir() -> PathBuf {
    let base = std::env::var("XDG_VIDEOS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join("Videos")
        });
    base.join("vidframe")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_capture_contract() {
        let config = AppConfig::default();
        assert_eq!(config.export.capture_fps, 30);
        assert_eq!(config.export.flush_interval_ms, 100);
        assert!((config.preview.max_height_fraction - 0.7).abs() < 1e-9);
        assert!((config.preview.min_width - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "export": { "quality": "720p" } }"#).unwrap();
        assert_eq!(parsed.export.quality, "720p");
        assert_eq!(parsed.export.format, "webm");
        assert_eq!(parsed.ffmpeg.ffmpeg, PathBuf::from("ffmpeg"));
    }
}
