//! RGBA colors parsed from hex strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string is not a valid hex color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}', expected #RRGGBB or #RRGGBBAA")]
pub struct InvalidColor(pub String);

/// RGBA color as used in layer paint and legend swatches.
///
/// In configuration files colors are written as hex strings (`#RRGGBB` or `#RRGGBBAA`).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_hex(&value).ok_or(InvalidColor(value))
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_hex()
    }
}

impl Color {
    /// Transparent color: `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// White color: `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Constructs an opaque color from its RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses a color from a `#RRGGBB` or `#RRGGBBAA` string.
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        let digits = hex_string.strip_prefix('#')?;
        if (digits.len() != 6 && digits.len() != 8) || !digits.is_ascii() {
            return None;
        }

        let channel = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16).ok();
        let a = if digits.len() == 8 { channel(6)? } else { 255 };

        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }

    /// Formats the color as `#RRGGBB` when opaque and `#RRGGBBAA` otherwise.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Returns a copy of the color with the given alpha channel.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Returns a copy of the color with its alpha multiplied by `opacity` (`0.0..=1.0`).
    pub fn with_opacity(&self, opacity: f32) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        self.with_alpha((self.a as f32 * opacity).round() as u8)
    }

    /// Red channel.
    pub fn r(&self) -> u8 {
        self.r
    }

    /// Green channel.
    pub fn g(&self) -> u8 {
        self.g
    }

    /// Blue channel.
    pub fn b(&self) -> u8 {
        self.b
    }

    /// Alpha channel.
    pub fn a(&self) -> u8 {
        self.a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex6_and_hex8() {
        assert_eq!(
            Color::try_from_hex("#1E88E5"),
            Some(Color::rgb(0x1e, 0x88, 0xe5))
        );
        assert_eq!(
            Color::try_from_hex("#ff000080"),
            Some(Color::rgba(255, 0, 0, 128))
        );
        assert_eq!(Color::try_from_hex("1E88E5"), None);
        assert_eq!(Color::try_from_hex("#1E88E"), None);
        assert_eq!(Color::try_from_hex("#GG0000"), None);
    }

    #[test]
    fn hex_is_stable() {
        assert_eq!(Color::rgb(0x0d, 0x47, 0xa1).to_hex(), "#0D47A1");
        assert_eq!(Color::rgba(255, 16, 0, 170).to_hex(), "#FF1000AA");
    }

    #[test]
    fn opacity_scales_alpha() {
        let color = Color::rgb(0x9c, 0x27, 0xb0).with_opacity(0.5);
        assert_eq!(color.a(), 128);
        assert_eq!(Color::WHITE.with_opacity(2.0).a(), 255);
        assert_eq!(Color::WHITE.with_opacity(0.0).a(), 0);
    }

    #[test]
    fn deserializes_from_string() {
        let color: Color = serde_json::from_str("\"#00AA00\"").unwrap();
        assert_eq!(color, Color::rgb(0, 0xaa, 0));

        let invalid = serde_json::from_str::<Color>("\"green\"");
        assert!(invalid.is_err());
    }
}
