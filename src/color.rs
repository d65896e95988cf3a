use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::table::RowId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const RED: Color = Color::rgb(0xff, 0x00, 0x00);
    pub const GREEN: Color = Color::rgb(0x00, 0xff, 0x00);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.is_ascii())
            .ok_or_else(|| format!("expected #rrggbb, got {s:?}"))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid color {s:?}"))
        };
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

// https://sashat.me/2017/01/11/list-of-20-simple-distinct-colors/
pub const DEFAULT_PALETTE: [Color; 12] = [
    Color::rgb(0xe6, 0x19, 0x4b),
    Color::rgb(0x3c, 0xb4, 0x4b),
    Color::rgb(0x43, 0x63, 0xd8),
    Color::rgb(0xf5, 0x82, 0x31),
    Color::rgb(0x91, 0x1e, 0xb4),
    Color::rgb(0xf0, 0x32, 0xe6),
    Color::rgb(0x46, 0x99, 0x90),
    Color::rgb(0x9a, 0x63, 0x24),
    Color::rgb(0x80, 0x00, 0x00),
    Color::rgb(0x80, 0x80, 0x00),
    Color::rgb(0x00, 0x00, 0x75),
    Color::rgb(0x00, 0x00, 0x00),
];

/// Lazily hands out palette entries to row ids, one per id, in palette
/// order. Wraps around once the palette is exhausted, so ids may share a
/// color after that.
pub struct ColorAllocator<K = RowId> {
    palette: Vec<Color>,
    assigned: HashMap<K, Color>,
    next: usize,
}

impl<K: Eq + Hash> ColorAllocator<K> {
    /// `palette` must not be empty; an empty one falls back to
    /// `DEFAULT_PALETTE`.
    pub fn new(palette: Vec<Color>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.to_vec()
        } else {
            palette
        };
        ColorAllocator {
            palette,
            assigned: HashMap::new(),
            next: 0,
        }
    }

    pub fn color_for(&mut self, key: K) -> Color {
        let palette = &self.palette;
        let next = &mut self.next;
        *self.assigned.entry(key).or_insert_with(|| {
            let color = palette[*next % palette.len()];
            *next += 1;
            color
        })
    }

    /// Color already allocated to `key`, without allocating.
    pub fn peek(&self, key: &K) -> Option<Color> {
        self.assigned.get(key).copied()
    }

    /// Forgets every assignment and rewinds to the first palette entry.
    /// Overlays already on the map keep the color they were drawn with.
    pub fn reset(&mut self) {
        self.assigned.clear();
        self.next = 0;
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}

impl<K: Eq + Hash> Default for ColorAllocator<K> {
    fn default() -> Self {
        ColorAllocator::new(DEFAULT_PALETTE.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_print() {
        let color: Color = "#9A6324".parse().unwrap();
        assert_eq!(color, Color::rgb(0x9a, 0x63, 0x24));
        assert_eq!(color.to_string(), "#9a6324");
        assert!("9A6324".parse::<Color>().is_err());
        assert!("#9A63".parse::<Color>().is_err());
        assert!("#zz6324".parse::<Color>().is_err());
    }

    #[test]
    fn serde_as_hex_string() {
        let colors: Vec<Color> = serde_json::from_str(r##"["#e6194B", "#000075"]"##).unwrap();
        assert_eq!(colors, vec![DEFAULT_PALETTE[0], DEFAULT_PALETTE[10]]);
        assert_eq!(
            serde_json::to_string(&colors).unwrap(),
            r##"["#e6194b","#000075"]"##
        );
    }

    #[test]
    fn any_hashable_key() {
        let mut allocator: ColorAllocator<&str> = ColorAllocator::default();
        assert_eq!(allocator.color_for("a"), DEFAULT_PALETTE[0]);
        assert_eq!(allocator.color_for("b"), DEFAULT_PALETTE[1]);
        assert_eq!(allocator.color_for("a"), DEFAULT_PALETTE[0]);
        assert_eq!(allocator.peek(&"c"), None);
        assert_eq!(allocator.assigned_count(), 2);
    }

    #[test]
    fn empty_palette_falls_back() {
        let allocator: ColorAllocator<u32> = ColorAllocator::new(Vec::new());
        assert_eq!(allocator.palette(), &DEFAULT_PALETTE[..]);
    }
}
