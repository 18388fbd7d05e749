use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Opaque RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const fn from_hex(rgb: u32) -> Self {
        Color([(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8])
    }

    pub fn rgba(&self) -> [u8; 4] {
        [self.0[0], self.0[1], self.0[2], u8::MAX]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

const DEFAULT_COLORS: [Color; 18] = [
    Color::from_hex(0xE8D5E8), // soft lavender
    Color::from_hex(0xF0D5D8), // dusty rose
    Color::from_hex(0xE8CDB0), // warm beige
    Color::from_hex(0xF5E6A8), // muted gold
    Color::from_hex(0xD4E5D4), // sage green
    Color::from_hex(0xC8E6C8), // soft mint
    Color::from_hex(0xD1E7E7), // pale teal
    Color::from_hex(0xD6E3F0), // powder blue
    Color::from_hex(0xE0E6F0), // light periwinkle
    Color::from_hex(0xE8F0F0), // ice blue
    Color::from_hex(0xE6D9F0), // gentle violet
    Color::from_hex(0xE8E0E8), // light mauve
    Color::from_hex(0xEAE3D8), // cream
    Color::from_hex(0xDDE0E6), // cool gray
    Color::from_hex(0xE0E6D8), // mint cream
    Color::from_hex(0xF0E3E0), // blush
    Color::from_hex(0xF0E8D6), // vanilla
    Color::from_hex(0xD0D0D0), // soft gray
];

// same hues as the default palette, lifted towards white for light themes
const PALE_COLORS: [Color; 18] = [
    Color::from_hex(0xF4EAF4),
    Color::from_hex(0xF8EAEC),
    Color::from_hex(0xF4E6D8),
    Color::from_hex(0xFAF3D4),
    Color::from_hex(0xEAF2EA),
    Color::from_hex(0xE4F3E4),
    Color::from_hex(0xE8F3F3),
    Color::from_hex(0xEBF1F8),
    Color::from_hex(0xF0F3F8),
    Color::from_hex(0xF4F8F8),
    Color::from_hex(0xF3ECF8),
    Color::from_hex(0xF4F0F4),
    Color::from_hex(0xF5F1EC),
    Color::from_hex(0xEEF0F3),
    Color::from_hex(0xF0F3EC),
    Color::from_hex(0xF8F1F0),
    Color::from_hex(0xF8F4EB),
    Color::from_hex(0xE8E8E8),
];

/// Named, fixed-size background colour sets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Default,
    Pale,
}

impl Palette {
    pub fn colors(&self) -> &'static [Color] {
        match self {
            Palette::Default => &DEFAULT_COLORS,
            Palette::Pale => &PALE_COLORS,
        }
    }

    pub fn len(&self) -> usize {
        self.colors().len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors().get(index).copied()
    }

    /// Cache key fragment; the default palette adds none so keys of
    /// existing artifacts stay valid
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Palette::Default => None,
            Palette::Pale => Some("pale"),
        }
    }

    /// Unknown names fall back to the default palette
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|raw| raw.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Palette::Default),
            "pale" => Ok(Palette::Pale),
            _ => Err(format!("Invalid palette: {}", s)),
        }
    }
}
