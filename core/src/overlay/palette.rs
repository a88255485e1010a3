use crate::prelude::{OverlayError, OverlayResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque-by-default RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Parses `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(value: &str) -> OverlayResult<Self> {
        let digits = value.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(OverlayError::InvalidColor(value.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| OverlayError::InvalidColor(value.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Static class-to-color table with a fallback for unknown classes.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPalette {
    entries: BTreeMap<String, Color>,
    fallback: Color,
}

impl Default for CategoryPalette {
    fn default() -> Self {
        let entries = [
            ("bottle", Color::rgb(0xFF, 0x6B, 0x6B)),
            ("fishing_net", Color::rgb(0xFF, 0xD1, 0x66)),
            ("microplastic", Color::rgb(0x06, 0xD6, 0xA0)),
            ("general", Color::rgb(0x11, 0x8A, 0xB2)),
        ]
        .into_iter()
        .map(|(class, color)| (class.to_string(), color))
        .collect();

        Self {
            entries,
            fallback: Color::WHITE,
        }
    }
}

impl CategoryPalette {
    /// Label text is always drawn in this color, whatever the category.
    pub const LABEL_TEXT: Color = Color::BLACK;

    pub fn color_for(&self, class: &str) -> Color {
        self.entries.get(class).copied().unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> Color {
        self.fallback
    }

    pub fn is_known(&self, class: &str) -> bool {
        self.entries.contains_key(class)
    }

    /// Applies `class -> #RRGGBB` overrides; the key `"fallback"` replaces
    /// the fallback color.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> OverlayResult<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (class, hex) in overrides {
            let color = Color::from_hex(hex)?;
            if class == "fallback" {
                self.fallback = color;
            } else {
                self.entries.insert(class.clone(), color);
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_classes_use_fixed_colors() {
        let palette = CategoryPalette::default();
        assert_eq!(palette.color_for("bottle").to_string(), "#FF6B6B");
        assert_eq!(palette.color_for("fishing_net").to_string(), "#FFD166");
        assert_eq!(palette.color_for("microplastic").to_string(), "#06D6A0");
        assert_eq!(palette.color_for("general").to_string(), "#118AB2");
    }

    #[test]
    fn unknown_class_uses_fallback() {
        let palette = CategoryPalette::default();
        assert!(!palette.is_known("debris"));
        assert_eq!(palette.color_for("debris"), Color::WHITE);
    }

    #[test]
    fn hex_parsing_rejects_malformed_values() {
        assert_eq!(Color::from_hex("118ab2").unwrap(), Color::rgb(0x11, 0x8A, 0xB2));
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#GGGGGG").is_err());
    }

    #[test]
    fn overrides_replace_entries_and_fallback() {
        let overrides: BTreeMap<String, String> = [
            ("debris".to_string(), "#123456".to_string()),
            ("fallback".to_string(), "#000000".to_string()),
        ]
        .into_iter()
        .collect();
        let palette = CategoryPalette::default().with_overrides(&overrides).unwrap();
        assert_eq!(palette.color_for("debris"), Color::rgb(0x12, 0x34, 0x56));
        assert_eq!(palette.color_for("unseen"), Color::BLACK);
        assert_eq!(palette.color_for("bottle"), Color::rgb(0xFF, 0x6B, 0x6B));
    }
}
