//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Tile values that carry their own colour; anything above uses `super_tile`.
pub const STANDARD_VALUES: [u32; 11] = [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048];

const CLASSIC_TILES: [u32; 11] = [
    0xEEE4DA, 0xEDE0C8, 0xF2B179, 0xF59563, 0xF67C5F, 0xF65E3B, 0xEDCF72, 0xEDCC61, 0xEDC850,
    0xEDC53F, 0xEDC22E,
];
const HIGH_CONTRAST_TILES: [u32; 11] = [
    0xFFFFFF, 0xFFFF00, 0xFF8800, 0xFF0000, 0xFF00FF, 0x8800FF, 0x0088FF, 0x00FFFF, 0x00FF00,
    0x88FF00, 0xFFD700,
];
// Okabe-Ito derived ramp; avoids red/green pairs next to each other.
const COLORBLIND_TILES: [u32; 11] = [
    0xE8E8E8, 0xF0E442, 0xE69F00, 0xD55E00, 0xCC79A7, 0x56B4E9, 0x0072B2, 0x009E73, 0x999933,
    0x882255, 0xDDCC77,
];

/// Packed 0xRRGGBB → Color.
const fn hex(v: u32) -> Color {
    Color::Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

/// UI colours and the tile palette loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile fill per standard value.
    pub tiles: BTreeMap<u32, Color>,
    /// Fill for values above 2048.
    pub super_tile: Color,
    /// Label colour on light tiles (2 and 4).
    pub dark_text: Color,
    /// Label colour on every other tile.
    pub light_text: Color,
    /// Board background behind the cells.
    pub bg: Color,
    /// Empty cell fill.
    pub empty: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (moves, largest tile).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Hints and secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic_default()
    }
}

impl Theme {
    /// Classic 2048 tiles on a One Dark board.
    pub fn classic_default() -> Self {
        Self {
            tiles: palette_map(&CLASSIC_TILES),
            super_tile: hex(0x3C3A32),
            dark_text: hex(0x776E65),
            light_text: hex(0xF9F6F2),
            bg: hex(0x31353F),
            empty: hex(0x3F444F),
            div_line: hex(0x5C6370),
            main_fg: hex(0xABB2BF),
            title: hex(0xE5C07B),
            inactive_fg: hex(0x5C6370),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to defaults if path is None or the file is missing.
    /// `palette` selects the tile colour variant.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::default_for_palette(palette);
        theme.apply_map(&map)?;
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::classic_default();
        t.apply_palette(palette);
        t
    }

    /// Override tile fills for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tiles = palette_map(&HIGH_CONTRAST_TILES);
                self.super_tile = hex(0x000000);
                self.dark_text = hex(0x000000);
                self.light_text = hex(0x000000);
            }
            crate::Palette::Colorblind => {
                self.tiles = palette_map(&COLORBLIND_TILES);
                self.super_tile = hex(0x332288);
            }
        }
    }

    /// Apply keys from a parsed theme file. Unknown keys are ignored; bad hex is an error.
    fn apply_map(&mut self, map: &HashMap<String, String>) -> Result<(), ThemeError> {
        let ui: [(&str, &mut Color); 6] = [
            ("meter_bg", &mut self.bg),
            ("div_line", &mut self.div_line),
            ("main_fg", &mut self.main_fg),
            ("title", &mut self.title),
            ("inactive_fg", &mut self.inactive_fg),
            ("empty_cell", &mut self.empty),
        ];
        for (key, slot) in ui {
            if let Some(v) = map.get(key) {
                *slot = parse_hex(v)?;
            }
        }
        for value in STANDARD_VALUES {
            if let Some(v) = map.get(&format!("tile_{}", value)) {
                self.tiles.insert(value, parse_hex(v)?);
            }
        }
        if let Some(v) = map.get("tile_super") {
            self.super_tile = parse_hex(v)?;
        }
        if let Some(v) = map.get("tile_text_dark") {
            self.dark_text = parse_hex(v)?;
        }
        if let Some(v) = map.get("tile_text_light") {
            self.light_text = parse_hex(v)?;
        }
        Ok(())
    }

    /// Fill colour for a tile value.
    pub fn tile_fill(&self, value: u32) -> Color {
        self.tiles.get(&value).copied().unwrap_or(self.super_tile)
    }

    /// Label colour for a tile value.
    pub fn tile_text(&self, value: u32) -> Color {
        if value <= 4 {
            self.dark_text
        } else {
            self.light_text
        }
    }
}

fn palette_map(fills: &[u32; 11]) -> BTreeMap<u32, Color> {
    STANDARD_VALUES
        .iter()
        .zip(fills.iter())
        .map(|(&v, &c)| (v, hex(c)))
        .collect()
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel =
        |range: std::ops::Range<usize>| u8::from_str_radix(&s[range], 16).map_err(|_| bad());
    if !s.is_ascii() {
        return Err(bad());
    }
    let (r, g, b) = if s.len() == 6 {
        (channel(0..2)?, channel(2..4)?, channel(4..6)?)
    } else if s.len() == 3 {
        (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17)
    } else {
        return Err(bad());
    };
    Ok(Color::Rgb(r, g, b))
}
