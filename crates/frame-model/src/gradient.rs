//! Background gradient description.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// An 8-bit straight-alpha color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn parse_hex(value: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidColor {
            value: value.to_string(),
        };
        let hex = value.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let digit = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|d| d * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::opaque(digit(0)?, digit(1)?, digit(2)?))
            }
            6 => Ok(Self::opaque(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Rgba {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for Rgba {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_string()
    }
}

/// Gradient shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Mesh,
}

/// Background gradient painted behind the framed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientSpec {
    #[serde(rename = "type", default)]
    pub kind: GradientKind,

    /// Ordered color stops, evenly distributed. At least one.
    pub colors: Vec<Rgba>,

    /// Direction of linear gradients in degrees.
    #[serde(default)]
    pub angle: f64,
}

/// Field-level update for a [`GradientSpec`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientPatch {
    #[serde(rename = "type")]
    pub kind: Option<GradientKind>,
    pub colors: Option<Vec<Rgba>>,
    pub angle: Option<f64>,
}

impl GradientSpec {
    /// A single-color background.
    pub fn flat(color: Rgba) -> Self {
        Self {
            kind: GradientKind::Linear,
            colors: vec![color],
            angle: 0.0,
        }
    }

    /// Check that the gradient can be painted.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.colors.is_empty() {
            return Err(ModelError::InvalidGradient {
                message: "at least one color stop is required".to_string(),
            });
        }
        if !self.angle.is_finite() {
            return Err(ModelError::InvalidGradient {
                message: format!("angle must be finite, got {}", self.angle),
            });
        }
        Ok(())
    }

    /// Whether the gradient degrades to a flat fill.
    pub fn is_flat(&self) -> bool {
        self.colors.len() <= 1
    }

    /// Angle wrapped into `[0, 360)`.
    pub fn normalized_angle(&self) -> f64 {
        let angle = self.angle.rem_euclid(360.0);
        if angle >= 360.0 {
            0.0
        } else {
            angle
        }
    }

    /// Stop offsets `i / (n - 1)` for `n >= 2` stops; a single stop sits at 0.
    pub fn stop_positions(&self) -> Vec<f32> {
        let n = self.colors.len();
        if n < 2 {
            return vec![0.0; n];
        }
        (0..n).map(|i| i as f32 / (n - 1) as f32).collect()
    }

    /// Apply a field-level update. An empty color list is ignored.
    pub fn apply(&mut self, patch: &GradientPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(colors) = patch.colors.as_ref().filter(|c| !c.is_empty()) {
            self.colors = colors.clone();
        }
        if let Some(angle) = patch.angle.filter(|a| a.is_finite()) {
            self.angle = angle.rem_euclid(360.0);
        }
    }
}

impl Default for GradientSpec {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            colors: vec![Rgba::opaque(0x66, 0x7e, 0xea), Rgba::opaque(0x76, 0x4b, 0xa2)],
            angle: 135.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Rgba::parse_hex("#fff").unwrap(), Rgba::WHITE);
        assert_eq!(
            Rgba::parse_hex("1a2b3c").unwrap(),
            Rgba::opaque(0x1a, 0x2b, 0x3c)
        );
        let translucent = Rgba::parse_hex("#00000080").unwrap();
        assert_eq!(translucent.a, 0x80);
        assert!(Rgba::parse_hex("#12345").is_err());
        assert!(Rgba::parse_hex("#gggggg").is_err());
    }

    #[test]
    fn test_color_serializes_as_hex() {
        let json = serde_json::to_string(&Rgba::opaque(255, 0, 16)).unwrap();
        assert_eq!(json, "\"#ff0010\"");
        let parsed: Rgba = serde_json::from_str("\"#ff0010\"").unwrap();
        assert_eq!(parsed, Rgba::opaque(255, 0, 16));
    }

    #[test]
    fn test_stop_positions_are_evenly_spaced() {
        let spec = GradientSpec {
            kind: GradientKind::Linear,
            colors: vec![Rgba::BLACK, Rgba::WHITE, Rgba::BLACK],
            angle: 90.0,
        };
        assert_eq!(spec.stop_positions(), vec![0.0, 0.5, 1.0]);
        assert!(!spec.is_flat());
        assert!(GradientSpec::flat(Rgba::WHITE).is_flat());
    }

    #[test]
    fn test_normalized_angle() {
        let mut spec = GradientSpec::default();
        spec.angle = -90.0;
        assert_eq!(spec.normalized_angle(), 270.0);
        spec.angle = 720.0;
        assert_eq!(spec.normalized_angle(), 0.0);
    }

    #[test]
    fn test_patch_merges_fields() {
        let mut spec = GradientSpec::default();
        spec.apply(&GradientPatch {
            kind: Some(GradientKind::Radial),
            colors: Some(vec![]),
            angle: None,
        });
        assert_eq!(spec.kind, GradientKind::Radial);
        assert_eq!(spec.colors.len(), 2);
        assert_eq!(spec.angle, 135.0);
    }

    #[test]
    fn test_gradient_json_uses_type_key() {
        let spec: GradientSpec =
            serde_json::from_str(r##"{ "type": "mesh", "colors": ["#000", "#fff"] }"##).unwrap();
        assert_eq!(spec.kind, GradientKind::Mesh);
        assert_eq!(spec.angle, 0.0);
        assert!(spec.validate().is_ok());

        let empty = GradientSpec {
            colors: vec![],
            ..GradientSpec::default()
        };
        assert!(empty.validate().is_err());
    }
}
