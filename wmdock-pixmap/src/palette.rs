//! Indexed-color model
//!
//! A [`Palette`] binds single-character keys to color values, a [`Bitmap`]
//! is a list of equal-length rows of those keys. Together they form a
//! [`Fragment`]: one piece of source material (background, pattern, font).

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PixmapError, Result};

/// Character codes handed out when a fresh key is needed
pub const KEY_ALPHABET: std::ops::Range<u8> = 40..126;

/// Color value of a transparent pixel
pub const TRANSPARENT: &str = "None";

/// Key → color table of one pixmap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    entries: BTreeMap<char, String>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: char) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    /// Bind `key` to `color`, returning the previous binding
    pub fn insert(&mut self, key: char, color: impl Into<String>) -> Option<String> {
        self.entries.insert(key, color.into())
    }

    pub fn remove(&mut self, key: char) -> Option<String> {
        self.entries.remove(&key)
    }

    pub fn contains_key(&self, key: char) -> bool {
        self.entries.contains_key(&key)
    }

    /// Lowest key bound to `color`, if any
    pub fn key_for(&self, color: &str) -> Option<char> {
        self.entries
            .iter()
            .find(|(_, c)| c.as_str() == color)
            .map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> {
        self.entries.iter().map(|(k, c)| (*k, c.as_str()))
    }

    /// Lowest key of the alphabet not bound in this palette
    pub fn unused_key(&self) -> Result<char> {
        unused_key(|k| self.contains_key(k))
    }
}

impl<S: Into<String>> FromIterator<(char, S)> for Palette {
    fn from_iter<I: IntoIterator<Item = (char, S)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, c)| (k, c.into())).collect(),
        }
    }
}

/// Lowest key in [`KEY_ALPHABET`] for which `taken` returns false
pub fn unused_key(taken: impl Fn(char) -> bool) -> Result<char> {
    KEY_ALPHABET
        .map(char::from)
        .find(|k| !taken(*k))
        .ok_or(PixmapError::PaletteExhausted)
}

/// Rows of palette keys; every row has the same length
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    rows: Vec<String>,
}

impl Bitmap {
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }

    /// `width` × `height` block of a single key
    pub fn filled(key: char, width: usize, height: usize) -> Self {
        let row: String = std::iter::repeat(key).take(width).collect();
        Self {
            rows: vec![row; height],
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<String> {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.chars().count())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<char> {
        self.rows.get(y)?.chars().nth(x)
    }

    /// Distinct keys used anywhere in the bitmap
    pub fn keys(&self) -> BTreeSet<char> {
        self.rows.iter().flat_map(|r| r.chars()).collect()
    }

    /// Rewrite every occurrence of `from` to `to`
    pub fn replace_key(&mut self, from: char, to: char) {
        if from == to {
            return;
        }
        for row in &mut self.rows {
            if row.contains(from) {
                *row = row.chars().map(|c| if c == from { to } else { c }).collect();
            }
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Bitmap {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A decoded (palette, bitmap) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub palette: Palette,
    pub bitmap: Bitmap,
}

impl Fragment {
    pub fn new(palette: Palette, bitmap: Bitmap) -> Self {
        Self { palette, bitmap }
    }

    pub fn color_at(&self, x: usize, y: usize) -> Option<&str> {
        self.palette.get(self.bitmap.pixel(x, y)?)
    }

    /// Rows must be rectangular and only use keys of the palette
    pub fn validate(&self) -> Result<()> {
        let width = self.bitmap.width();
        if let Some((y, _)) = self
            .bitmap
            .rows()
            .iter()
            .enumerate()
            .find(|(_, r)| r.chars().count() != width)
        {
            return Err(PixmapError::MalformedInput(format!(
                "row {y} is not {width} pixels wide"
            )));
        }
        if let Some(key) = self.bitmap.keys().into_iter().find(|k| !self.palette.contains_key(*k)) {
            return Err(PixmapError::MalformedInput(format!(
                "key {key:?} used in bitmap but missing from palette"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_key_is_lowest_free() {
        let palette: Palette = [('(', "#000000"), (')', "#ffffff"), ('+', "#ff0000")]
            .into_iter()
            .collect();
        assert_eq!(palette.unused_key().unwrap(), '*');
    }

    #[test]
    fn test_unused_key_ignores_keys_outside_alphabet() {
        let palette: Palette = [(' ', "None"), ('~', "#000000")].into_iter().collect();
        assert_eq!(palette.unused_key().unwrap(), '(');
    }

    #[test]
    fn test_unused_key_exhausted() {
        let palette: Palette = KEY_ALPHABET
            .map(|b| (char::from(b), format!("#{b:06x}")))
            .collect();
        assert_eq!(palette.len(), 86);
        assert!(matches!(
            palette.unused_key(),
            Err(PixmapError::PaletteExhausted)
        ));
    }

    #[test]
    fn test_key_for_picks_lowest_key() {
        let palette: Palette = [('z', "#ffffff"), ('b', "#ffffff"), ('a', "#000000")]
            .into_iter()
            .collect();
        assert_eq!(palette.key_for("#ffffff"), Some('b'));
        assert_eq!(palette.key_for("#123456"), None);
    }

    #[test]
    fn test_replace_key() {
        let mut bitmap: Bitmap = ["abba", "bbbb", "aaaa"].into_iter().collect();
        bitmap.replace_key('a', 'c');
        assert_eq!(bitmap.rows(), &["cbbc", "bbbb", "cccc"]);
        assert_eq!(bitmap.width(), 4);
        assert_eq!(bitmap.height(), 3);
    }

    #[test]
    fn test_validate_rejects_unknown_key() {
        let fragment = Fragment::new(
            [('a', "#000000")].into_iter().collect(),
            ["aab"].into_iter().collect(),
        );
        assert!(matches!(
            fragment.validate(),
            Err(PixmapError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_ragged_rows() {
        let fragment = Fragment::new(
            [('a', "#000000")].into_iter().collect(),
            ["aaa", "aa"].into_iter().collect(),
        );
        assert!(fragment.validate().is_err());
    }
}
