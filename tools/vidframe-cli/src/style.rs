//! Style files and option parsing shared by the commands.

use std::path::Path;

use serde::Deserialize;

use vidframe_common::config::AppConfig;
use vidframe_frame_model::{
    ExportFormat, ExportSettings, FrameConfig, FrameConfigPatch, GradientPatch, GradientSpec,
    QualityTier,
};
use vidframe_geometry::{DisplayConstraints, Size};

/// Partial styling read from a JSON file and merged over the defaults.
///
/// ```json
/// { "frame": { "padding": 40, "borderRadius": 12 },
///   "gradient": { "type": "radial", "colors": ["#0f172a", "#334155"] } }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StyleFile {
    pub frame: FrameConfigPatch,
    pub gradient: GradientPatch,
}

#[derive(Debug, Clone)]
pub struct Style {
    pub frame: FrameConfig,
    pub gradient: GradientSpec,
}

impl StyleFile {
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_style(self) -> anyhow::Result<Style> {
        let mut frame = FrameConfig::default();
        frame.apply(&self.frame);
        let mut gradient = GradientSpec::default();
        gradient.apply(&self.gradient);
        gradient.validate()?;
        Ok(Style { frame, gradient })
    }
}

pub fn load_style(path: Option<&Path>) -> anyhow::Result<Style> {
    let file = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read style {}: {e}", path.display()))?;
            StyleFile::parse(&json)?
        }
        None => StyleFile::default(),
    };
    file.into_style()
}

/// Quality and format from the command line, falling back to the config.
pub fn export_settings(
    config: &AppConfig,
    quality: Option<&str>,
    format: Option<&str>,
) -> anyhow::Result<ExportSettings> {
    let quality: QualityTier = quality.unwrap_or(&config.export.quality).parse()?;
    let format: ExportFormat = format.unwrap_or(&config.export.format).parse()?;
    Ok(ExportSettings { quality, format })
}

pub fn display_constraints(config: &AppConfig) -> DisplayConstraints {
    let preview = &config.preview;
    DisplayConstraints {
        viewport: Size::new(
            f64::from(preview.viewport_width),
            f64::from(preview.viewport_height),
        ),
        max_height_fraction: preview.max_height_fraction,
        min_width: preview.min_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidframe_frame_model::GradientKind;

    #[test]
    fn test_style_file_merges_over_defaults() {
        let style = StyleFile::parse(
            r##"{ "frame": { "padding": 40 }, "gradient": { "type": "radial", "colors": ["#000000"] } }"##,
        )
        .unwrap()
        .into_style()
        .unwrap();

        assert_eq!(style.frame.padding, 40.0);
        assert_eq!(style.frame.border_radius, 24.0);
        assert_eq!(style.gradient.kind, GradientKind::Radial);
        assert_eq!(style.gradient.colors.len(), 1);
        assert_eq!(style.gradient.angle, 135.0);
    }

    #[test]
    fn test_missing_style_uses_defaults() {
        let style = load_style(None).unwrap();
        assert_eq!(style.frame, FrameConfig::default());
        assert_eq!(style.gradient, GradientSpec::default());
    }

    #[test]
    fn test_settings_fall_back_to_config() {
        let config = AppConfig::default();
        let settings = export_settings(&config, None, Some("mp4")).unwrap();
        assert_eq!(settings.quality, QualityTier::P1080);
        assert_eq!(settings.format, ExportFormat::Mp4);
        assert!(export_settings(&config, Some("4k"), None).is_err());
    }

    #[test]
    fn test_style_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.json");
        std::fs::write(&path, r#"{ "frame": { "shadowIntensity": 5 } }"#).unwrap();
        let style = load_style(Some(&path)).unwrap();
        assert_eq!(style.frame.shadow_intensity, 5.0);
    }
}
