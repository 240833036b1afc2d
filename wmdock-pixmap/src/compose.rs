//! Composite pixmap assembly
//!
//! The dockapp draws from one pixmap laid out top to bottom as
//!
//! ```text
//! +-------------------+
//! | background (WxH)  |  visible window area, blits land here
//! +-------------------+
//! | patterns          |  eraser / decoration sources
//! +-------------------+
//! | font 0 charset    |
//! | font 1 charset    |
//! +-------------------+
//! ```
//!
//! Every fragment brings its own palette. They are merged into one, with
//! the bitmaps rewritten to the merged keys, and rows are right-padded with
//! the transparent key so the result stays rectangular.

use std::path::Path;
use std::str::FromStr;

use crate::backend::Rect;
use crate::color::ColorLookup;
use crate::error::{PixmapError, Result};
use crate::merge::merge;
use crate::palette::{Bitmap, Fragment, Palette, TRANSPARENT};
use crate::xpm;

/// Frame drawn around the synthesized background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    Flat,
    #[default]
    Bevel,
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "bevel" | "3d" => Ok(Self::Bevel),
            other => Err(format!("unknown style {other:?} (expected flat or bevel)")),
        }
    }
}

/// Font charset: printable ASCII from code 32, cells left to right,
/// wrapping whenever the row's pixel width runs out
#[derive(Debug, Clone)]
pub struct FontFragment {
    name: String,
    fragment: Fragment,
    size: Option<(u32, u32)>,
}

impl FontFragment {
    pub fn new(name: impl Into<String>, fragment: Fragment) -> Self {
        Self {
            name: name.into(),
            fragment,
            size: None,
        }
    }

    /// Decode a font from a path or in-memory document. The name is the
    /// declared variable name of a document, the file stem of a path.
    pub fn load(source: &str) -> Result<Self> {
        let fragment = xpm::decode(source)?;
        let name = if source.starts_with(xpm::MAGIC) {
            xpm::declared_name(source).unwrap_or_default().to_string()
        } else {
            Path::new(source)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        tracing::debug!("loaded font {name:?}");
        Ok(Self::new(name, fragment))
    }

    /// Explicit glyph cell size, overriding the one in the name
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    pub fn glyph_size(&self) -> Result<(u32, u32)> {
        match self.size.or_else(|| infer_glyph_size(&self.name)) {
            Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(PixmapError::InvalidFontDimensions(self.name.clone())),
        }
    }

    /// Rebind the font's colors. Paper is the key of the top-left pixel
    /// (inside the blank space glyph), ink is every other key.
    pub fn recolor(&mut self, ink: Option<&str>, paper: Option<&str>) {
        let Some(paper_key) = self.fragment.bitmap.pixel(0, 0) else {
            return;
        };
        let keys: Vec<char> = self.fragment.palette.keys().collect();
        for key in keys {
            let color = if key == paper_key { paper } else { ink };
            if let Some(color) = color {
                self.fragment.palette.insert(key, color);
            }
        }
    }
}

/// Last `<W>x<H>` token of a font name, e.g. `charset-6x8` → (6, 8)
pub fn infer_glyph_size(name: &str) -> Option<(u32, u32)> {
    name.match_indices('x').rev().find_map(|(i, _)| {
        let before = &name[..i];
        let after = &name[i + 1..];
        let w_start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(p, _)| p)?;
        let h_end = after
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after.len());
        Some((before[w_start..].parse().ok()?, after[..h_end].parse().ok()?))
    })
}

/// Where a font's glyph cells live inside the composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub charset_start_row: u32,
    pub charset_width: u32,
    pub charset_height: u32,
    pub glyph_width: u32,
    pub glyph_height: u32,
}

/// Keys the composer reserved in the merged palette. Bevel and background
/// always get fresh keys: every compose starts from an empty palette, so
/// there is no earlier color+role pairing to reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedKeys {
    pub transparent: char,
    pub bevel: char,
    pub background: char,
}

/// The merged pixmap plus glyph addressing metadata; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeImage {
    pixmap: Fragment,
    window_width: usize,
    window_height: usize,
    pattern_start_row: u32,
    keys: ReservedKeys,
    fonts: Vec<FontMetrics>,
}

impl CompositeImage {
    pub fn pixmap(&self) -> &Fragment {
        &self.pixmap
    }

    pub fn window_size(&self) -> (usize, usize) {
        (self.window_width, self.window_height)
    }

    pub fn keys(&self) -> ReservedKeys {
        self.keys
    }

    pub fn fonts(&self) -> &[FontMetrics] {
        &self.fonts
    }

    /// Metrics of the first font
    pub fn font(&self) -> Option<&FontMetrics> {
        self.fonts.first()
    }

    /// Window-sized area of the patterns block, the blank eraser when no
    /// patterns were given
    pub fn eraser(&self) -> Rect {
        Rect::new(
            0,
            self.pattern_start_row as i32,
            self.window_width as u32,
            self.window_height as u32,
        )
    }

    /// Source rectangle of `ch` in the first font
    pub fn glyph_rect(&self, ch: char) -> Result<Rect> {
        self.font()
            .ok_or(PixmapError::UnsupportedGlyph(ch))?
            .glyph_rect(ch)
    }

    pub fn to_document(&self, name: &str) -> String {
        xpm::to_document(name, &self.pixmap)
    }
}

/// Builds [`CompositeImage`]s for a dockapp window
#[derive(Debug, Clone)]
pub struct Composer {
    pub width: usize,
    pub height: usize,
    pub margin: usize,
    pub style: Style,
    pub background_color: String,
    pub bevel_color: String,
    /// Colors guaranteed to exist in the result; requested keys are kept when free
    pub palette: Palette,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            margin: 3,
            style: Style::Bevel,
            background_color: "black".into(),
            bevel_color: "#bebebe".into(),
            palette: [('1', "black"), ('2', "white")].into_iter().collect(),
        }
    }
}

impl Composer {
    pub fn compose(
        &self,
        background: Option<&Fragment>,
        patterns: Option<&[Fragment]>,
        fonts: &[FontFragment],
        colors: &dyn ColorLookup,
    ) -> Result<CompositeImage> {
        let glyph_sizes = fonts
            .iter()
            .map(|font| {
                let (w, h) = font.glyph_size()?;
                if w as usize > font.fragment.bitmap.width() {
                    return Err(PixmapError::InvalidFontDimensions(font.name.clone()));
                }
                Ok((w, h))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut palette = match background {
            Some(bg) => {
                bg.validate()?;
                normalized(&bg.palette, colors)
            }
            None => Palette::new(),
        };

        let transparent = match palette.key_for(TRANSPARENT) {
            Some(key) => key,
            None => {
                let key = if palette.contains_key(' ') {
                    palette.unused_key()?
                } else {
                    ' '
                };
                palette.insert(key, TRANSPARENT);
                key
            }
        };

        for (key, requested) in self.palette.iter() {
            let color = match colors.lookup(requested) {
                Ok(hex) => colors.normalize(&hex),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("ignoring palette entry {key:?}: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if palette.key_for(&color).is_some() {
                continue;
            }
            let key = if palette.contains_key(key) {
                palette.unused_key()?
            } else {
                key
            };
            palette.insert(key, color);
        }

        let bevel = palette.unused_key()?;
        palette.insert(bevel, colors.normalize(&self.bevel_color));
        let fill = palette.unused_key()?;
        palette.insert(fill, colors.normalize(&self.background_color));
        let keys = ReservedKeys {
            transparent,
            bevel,
            background: fill,
        };

        let background = match background {
            Some(bg) => bg.bitmap.clone(),
            None => self.synthesize_background(keys)?,
        };

        let mut blocks = vec![background];
        match patterns {
            Some(patterns) if !patterns.is_empty() => {
                for pattern in patterns {
                    let (merged, rows) =
                        merge(&palette, &normalized(&pattern.palette, colors), &pattern.bitmap)?;
                    palette = merged;
                    blocks.push(rows);
                }
            }
            _ => blocks.push(Bitmap::filled(fill, self.width, self.height)),
        }

        let mut charset_start_row: usize = blocks.iter().map(Bitmap::height).sum();
        let pattern_start_row = blocks[0].height() as u32;
        let mut metrics = Vec::with_capacity(fonts.len());
        for (font, (glyph_width, glyph_height)) in fonts.iter().zip(glyph_sizes) {
            let (merged, rows) = merge(
                &palette,
                &normalized(&font.fragment.palette, colors),
                &font.fragment.bitmap,
            )?;
            palette = merged;
            metrics.push(FontMetrics {
                charset_start_row: charset_start_row as u32,
                charset_width: rows.width() as u32,
                charset_height: rows.height() as u32,
                glyph_width,
                glyph_height,
            });
            charset_start_row += rows.height();
            blocks.push(rows);
        }

        let width = blocks.iter().map(Bitmap::width).max().unwrap_or(0);
        let rows: Bitmap = blocks
            .into_iter()
            .flat_map(Bitmap::into_rows)
            .map(|row| pad(row, width, transparent))
            .collect();

        tracing::debug!(
            "composed {}x{} pixmap with {} colors",
            rows.width(),
            rows.height(),
            palette.len()
        );

        Ok(CompositeImage {
            pixmap: Fragment::new(palette, rows),
            window_width: self.width,
            window_height: self.height,
            pattern_start_row,
            keys,
            fonts: metrics,
        })
    }

    /// Blank window: transparent margin, filled interior, bevel on the
    /// right and bottom inner edges (fill colored in flat style)
    fn synthesize_background(&self, keys: ReservedKeys) -> Result<Bitmap> {
        let (w, h, m) = (self.width, self.height, self.margin);
        if 2 * m + 1 > w.min(h) {
            return Err(PixmapError::MalformedInput(format!(
                "margin {m} does not fit a {w}x{h} window"
            )));
        }
        let edge = match self.style {
            Style::Bevel => keys.bevel,
            Style::Flat => keys.background,
        };
        let run = |key: char, n: usize| std::iter::repeat(key).take(n).collect::<String>();
        let blank = run(keys.transparent, w);
        let side = run(keys.transparent, m);

        let mut rows = vec![blank.clone(); m];
        for _ in m..h - m - 1 {
            rows.push(format!("{side}{}{edge}{side}", run(keys.background, w - 2 * m - 1)));
        }
        rows.push(format!("{side}{}{side}", run(edge, w - 2 * m)));
        rows.extend(std::iter::repeat(blank).take(m));
        Ok(Bitmap::new(rows))
    }
}

fn normalized(palette: &Palette, colors: &dyn ColorLookup) -> Palette {
    palette.iter().map(|(k, c)| (k, colors.normalize(c))).collect()
}

fn pad(mut row: String, width: usize, key: char) -> String {
    let missing = width.saturating_sub(row.chars().count());
    row.extend(std::iter::repeat(key).take(missing));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorResolver;

    const FONT: &str = include_str!("../../assets/fonts/charset-6x8.xpm");

    fn colors() -> ColorResolver {
        ColorResolver::from_database("0 0 0\t\tblack\n255 255 255\t\twhite\n190 190 190\t\tgray\n")
    }

    fn small() -> Composer {
        Composer {
            width: 8,
            height: 8,
            margin: 1,
            ..Composer::default()
        }
    }

    #[test]
    fn test_infer_glyph_size() {
        assert_eq!(infer_glyph_size("charset-6x8"), Some((6, 8)));
        assert_eq!(infer_glyph_size("font_8x12"), Some((8, 12)));
        assert_eq!(infer_glyph_size("big-16x24-bold"), Some((16, 24)));
        assert_eq!(infer_glyph_size("xx-5x7x"), Some((5, 7)));
        assert_eq!(infer_glyph_size("charset"), None);
        assert_eq!(infer_glyph_size("x8"), None);
    }

    #[test]
    fn test_font_load_uses_declared_name() {
        let font = FontFragment::load(FONT).unwrap();
        assert_eq!(font.name(), "charset_6x8");
        assert_eq!(font.glyph_size().unwrap(), (6, 8));
    }

    #[test]
    fn test_font_without_size_fails_to_compose() {
        let font = FontFragment::new("plain", xpm::decode(FONT).unwrap());
        let result = small().compose(None, None, &[font], &colors());
        assert!(matches!(result, Err(PixmapError::InvalidFontDimensions(name)) if name == "plain"));
    }

    #[test]
    fn test_explicit_size_overrides_name() {
        let font = FontFragment::new("plain", xpm::decode(FONT).unwrap()).with_size(6, 8);
        let image = small().compose(None, None, &[font], &colors()).unwrap();
        assert_eq!(image.font().unwrap().glyph_width, 6);
    }

    #[test]
    fn test_synthesized_layout() {
        let font = FontFragment::load(FONT).unwrap();
        let image = small().compose(None, None, &[font], &colors()).unwrap();
        let keys = image.keys();
        let pixmap = image.pixmap();

        // background 8 rows, eraser 8 rows, then the font
        let metrics = image.font().unwrap();
        assert_eq!(metrics.charset_start_row, 16);
        assert_eq!(metrics.charset_width, 96);
        assert_eq!(metrics.charset_height, 48);
        assert_eq!(pixmap.bitmap.height(), 16 + 48);
        assert!(pixmap.bitmap.rows().iter().all(|r| r.chars().count() == 96));

        let (t, b, f) = (keys.transparent, keys.bevel, keys.background);
        let row = |y: usize| pixmap.bitmap.rows()[y][..8].to_string();
        assert_eq!(row(0), t.to_string().repeat(8));
        assert_eq!(row(1), format!("{t}{}{b}{t}", f.to_string().repeat(5)));
        assert_eq!(row(6), format!("{t}{}{t}", b.to_string().repeat(6)));
        assert_eq!(row(7), t.to_string().repeat(8));
        assert_eq!(row(8), f.to_string().repeat(8));
        assert_eq!(&pixmap.bitmap.rows()[0][8..], &t.to_string().repeat(88));

        assert_eq!(pixmap.palette.get(t), Some("None"));
        assert_eq!(pixmap.palette.get(b), Some("#bebebe"));
        assert_eq!(pixmap.palette.get(f), Some("#000000"));
        assert_eq!(image.eraser(), Rect::new(0, 8, 8, 8));
    }

    #[test]
    fn test_flat_style_uses_fill_for_edge() {
        let composer = Composer {
            style: Style::Flat,
            ..small()
        };
        let image = composer.compose(None, None, &[], &colors()).unwrap();
        let f = image.keys().background;
        assert_eq!(
            &image.pixmap().bitmap.rows()[6],
            &format!(" {} ", f.to_string().repeat(6))
        );
    }

    #[test]
    fn test_bevel_and_background_get_dedicated_keys() {
        // black and white already present through the extra palette
        let image = small().compose(None, None, &[], &colors()).unwrap();
        let palette = &image.pixmap().palette;
        let keys = image.keys();
        assert_eq!(palette.get('1'), Some("#000000"));
        assert_eq!(palette.get('2'), Some("#ffffff"));
        assert_ne!(keys.background, '1');
        assert_eq!(palette.get(keys.background), Some("#000000"));
    }

    #[test]
    fn test_extra_palette_reuses_existing_colors() {
        let background = Fragment::new(
            [('1', "#ffffff"), ('a', "black")].into_iter().collect(),
            Bitmap::filled('a', 8, 8),
        );
        let image = small()
            .compose(Some(&background), None, &[], &colors())
            .unwrap();
        let palette = &image.pixmap().palette;
        // black exists as 'a', white exists as '1'; neither is duplicated
        assert_eq!(palette.get('1'), Some("#ffffff"));
        assert_eq!(palette.get('2'), None);
        assert_eq!(palette.get('a'), Some("#000000"));
    }

    #[test]
    fn test_unknown_extra_color_is_skipped() {
        let composer = Composer {
            palette: [('1', "no such color")].into_iter().collect(),
            ..small()
        };
        let image = composer.compose(None, None, &[], &colors()).unwrap();
        assert_eq!(image.pixmap().palette.get('1'), None);
    }

    #[test]
    fn test_font_colors_survive_merge() {
        let mut font = FontFragment::load(FONT).unwrap();
        font.recolor(Some("#ff0000"), None);
        let image = small().compose(None, None, &[font.clone()], &colors()).unwrap();
        let metrics = image.font().unwrap();
        let pixmap = image.pixmap();

        let source = font.fragment();
        for y in 0..source.bitmap.height() {
            for x in 0..source.bitmap.width() {
                let expected = colors().normalize(source.color_at(x, y).unwrap());
                let actual = pixmap.color_at(x, y + metrics.charset_start_row as usize);
                assert_eq!(actual, Some(expected.as_str()));
            }
        }
    }

    #[test]
    fn test_patterns_and_multiple_fonts_stack() {
        let pattern = Fragment::new(
            [('.', "#000000"), ('o', "#00ff00")].into_iter().collect(),
            ["o.o.", ".o.o"].into_iter().collect(),
        );
        let first = FontFragment::load(FONT).unwrap();
        let second = FontFragment::load(FONT).unwrap().with_size(12, 16);
        let image = small()
            .compose(None, Some(&[pattern]), &[first, second], &colors())
            .unwrap();

        let fonts = image.fonts();
        assert_eq!(fonts.len(), 2);
        assert_eq!(fonts[0].charset_start_row, 8 + 2);
        assert_eq!(fonts[1].charset_start_row, 8 + 2 + 48);
        assert_eq!(fonts[1].glyph_width, 12);
        assert_eq!(image.pixmap().color_at(0, 8), Some("#00ff00"));
        assert_eq!(image.pixmap().color_at(1, 8), Some("#000000"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let build = || {
            let font = FontFragment::load(FONT).unwrap();
            Composer::default()
                .compose(None, None, &[font], &colors())
                .unwrap()
        };
        let (a, b) = (build(), build());
        assert_eq!(a.pixmap().bitmap, b.pixmap().bitmap);
        assert_eq!(a.fonts(), b.fonts());
        assert_eq!(a.to_document("dock"), b.to_document("dock"));
    }

    #[test]
    fn test_document_decodes_back() {
        let font = FontFragment::load(FONT).unwrap();
        let image = Composer::default()
            .compose(None, None, &[font], &colors())
            .unwrap();
        let decoded = xpm::decode(&image.to_document("dock")).unwrap();
        assert_eq!(&decoded, image.pixmap());
    }

    #[test]
    fn test_margin_too_large() {
        let composer = Composer {
            margin: 4,
            ..small()
        };
        assert!(composer.compose(None, None, &[], &colors()).is_err());
    }
}
