use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ColorParseError;

/// An sRGB color with straight (unpremultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED: &[(&str, Color)] = &[
    ("black", Color::rgb(0x00, 0x00, 0x00)),
    ("white", Color::rgb(0xff, 0xff, 0xff)),
    ("red", Color::rgb(0xff, 0x00, 0x00)),
    ("green", Color::rgb(0x00, 0x80, 0x00)),
    ("lime", Color::rgb(0x00, 0xff, 0x00)),
    ("blue", Color::rgb(0x00, 0x00, 0xff)),
    ("yellow", Color::rgb(0xff, 0xff, 0x00)),
    ("orange", Color::rgb(0xff, 0xa5, 0x00)),
    ("purple", Color::rgb(0x80, 0x00, 0x80)),
    ("magenta", Color::rgb(0xff, 0x00, 0xff)),
    ("cyan", Color::rgb(0x00, 0xff, 0xff)),
    ("gray", Color::rgb(0x80, 0x80, 0x80)),
    ("grey", Color::rgb(0x80, 0x80, 0x80)),
    ("darkgray", Color::rgb(0xa9, 0xa9, 0xa9)),
    ("lightgray", Color::rgb(0xd3, 0xd3, 0xd3)),
    ("navy", Color::rgb(0x00, 0x00, 0x80)),
    ("maroon", Color::rgb(0x80, 0x00, 0x00)),
    ("teal", Color::rgb(0x00, 0x80, 0x80)),
    ("olive", Color::rgb(0x80, 0x80, 0x00)),
    ("silver", Color::rgb(0xc0, 0xc0, 0xc0)),
    ("pink", Color::rgb(0xff, 0xc0, 0xcb)),
    ("brown", Color::rgb(0xa5, 0x2a, 0x2a)),
    ("transparent", Color::rgba(0x00, 0x00, 0x00, 0x00)),
];

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const TRANSPARENT: Color = Color::rgba(0x00, 0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` or a small set of CSS color names.
    pub fn parse(spec: &str) -> Result<Self, ColorParseError> {
        let trimmed = spec.trim();
        let err = || ColorParseError {
            spec: spec.to_string(),
        };

        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args).ok_or_else(err);
        }

        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
            .ok_or_else(err)
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn alpha(&self) -> f32 {
        self.a as f32 / 255.0
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation per channel, used by the scene tweens.
    pub fn lerp(self, to: Color, t: f32) -> Self {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8;
        Self {
            r: mix(self.r, to.r),
            g: mix(self.g, to.g),
            b: mix(self.b, to.b),
            a: mix(self.a, to.a),
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 0x11);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_functional(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<u8>().ok();
    match parts.as_slice() {
        [r, g, b] => Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha: f32 = a.parse().ok()?;
            if !(0.0..=1.0).contains(&alpha) {
                return None;
            }
            Some(Color::rgba(
                channel(r)?,
                channel(g)?,
                channel(b)?,
                (alpha * 255.0).round() as u8,
            ))
        }
        _ => None,
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(Color::parse("#ff0000").unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(Color::parse("#f00").unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(
            Color::parse("#00ff0080").unwrap(),
            Color::rgba(0, 255, 0, 0x80)
        );
        assert_eq!(Color::parse("#0f08").unwrap(), Color::rgba(0, 0xff, 0, 0x88));
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(Color::parse("White").unwrap(), Color::WHITE);
        assert_eq!(Color::parse(" black ").unwrap(), Color::BLACK);
        assert_eq!(Color::parse("transparent").unwrap().a, 0);
    }

    #[test]
    fn test_functional_forms() {
        assert_eq!(
            Color::parse("rgb(10, 20, 30)").unwrap(),
            Color::rgb(10, 20, 30)
        );
        assert_eq!(
            Color::parse("rgba(10,20,30,0.5)").unwrap(),
            Color::rgba(10, 20, 30, 128)
        );
    }

    #[test]
    fn test_malformed_specs_fail() {
        for bad in ["#ff000", "#gg0000", "rgb(1,2)", "rgba(1,2,3,2.0)", "chartreuse-ish", ""] {
            let err = Color::parse(bad).unwrap_err();
            assert_eq!(err.spec, bad);
        }
    }

    #[test]
    fn test_lerp_midpoint() {
        let mid = Color::BLACK.lerp(Color::WHITE, 0.5);
        assert_eq!(mid, Color::rgb(128, 128, 128));
    }

    #[test]
    fn test_deserialize_from_string() {
        let color: Color = serde_json::from_str("\"#102030\"").unwrap();
        assert_eq!(color, Color::rgb(0x10, 0x20, 0x30));
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }
}
