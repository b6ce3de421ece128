//! Block catalog: tile value → display style.

use crate::theme::Theme;
use ratatui::style::Color;
use std::collections::BTreeMap;
use thiserror::Error;

/// Values a fresh spawn can produce.
pub const SPAWN_VALUES: [u32; 2] = [2, 4];

/// How a tile of a given value is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStyle {
    pub value: u32,
    pub fill: Color,
    pub text: Color,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("no block style for value {0}")]
    UnknownValue(u32),
    #[error("block catalog is missing a style for reachable value {0}")]
    MissingStyle(u32),
}

#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    styles: BTreeMap<u32, BlockStyle>,
}

impl BlockCatalog {
    pub fn new(styles: impl IntoIterator<Item = BlockStyle>) -> Self {
        Self {
            styles: styles.into_iter().map(|s| (s.value, s)).collect(),
        }
    }

    /// Styles for every value up to `win_value`, coloured from the theme.
    pub fn from_theme(theme: &Theme, win_value: u32) -> Self {
        Self::new(required_values(win_value).into_iter().map(|value| BlockStyle {
            value,
            fill: theme.tile_fill(value),
            text: theme.tile_text(value),
            label: value.to_string(),
        }))
    }

    pub fn style(&self, value: u32) -> Result<&BlockStyle, CatalogError> {
        self.styles
            .get(&value)
            .ok_or(CatalogError::UnknownValue(value))
    }

    /// Startup check: every value reachable before the win ends the game must have a style.
    pub fn validate(&self, win_value: u32) -> Result<(), CatalogError> {
        match required_values(win_value)
            .into_iter()
            .find(|v| !self.styles.contains_key(v))
        {
            Some(missing) => Err(CatalogError::MissingStyle(missing)),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockStyle> + '_ {
        self.styles.values()
    }
}

/// Spawn values plus every power of two produced by doubling up to `win_value`.
pub fn required_values(win_value: u32) -> Vec<u32> {
    let mut values: Vec<u32> = SPAWN_VALUES.to_vec();
    let mut v = 8u32;
    while v <= win_value {
        values.push(v);
        match v.checked_mul(2) {
            Some(next) => v = next,
            None => break,
        }
    }
    values
}
