//! Glyph cell addressing and text blitting

use crate::backend::{GraphicsBackend, Rect};
use crate::compose::FontMetrics;
use crate::error::{PixmapError, Result};

/// First character of every charset
pub const FIRST_GLYPH: char = ' ';

/// Last character a charset may hold (DEL renders as a solid block in the bundled fonts)
pub const LAST_GLYPH: char = '\u{7f}';

/// Drawn instead of characters the charset cannot address
pub const PLACEHOLDER: char = '?';

impl FontMetrics {
    /// Pixel width of one row of cells, partial trailing cells dropped;
    /// 0 for a zero glyph width
    pub fn line_length(&self) -> u32 {
        self.charset_width
            .checked_rem(self.glyph_width)
            .map_or(0, |rest| self.charset_width - rest)
    }

    /// Source rectangle of `ch` inside the composite pixmap
    pub fn glyph_rect(&self, ch: char) -> Result<Rect> {
        let unsupported = || PixmapError::UnsupportedGlyph(ch);
        if !(FIRST_GLYPH..=LAST_GLYPH).contains(&ch) || self.glyph_width == 0 || self.glyph_height == 0 {
            return Err(unsupported());
        }
        let line_length = self.line_length();
        if line_length == 0 {
            return Err(unsupported());
        }
        let pos = (ch as u32 - FIRST_GLYPH as u32)
            .checked_mul(self.glyph_width)
            .ok_or_else(unsupported)?;
        let row = pos / line_length;
        let top = row.checked_mul(self.glyph_height).ok_or_else(unsupported)?;
        let bottom = top.checked_add(self.glyph_height).ok_or_else(unsupported)?;
        if bottom > self.charset_height {
            return Err(unsupported());
        }
        let x = i32::try_from(pos % line_length).map_err(|_| unsupported())?;
        let y = top
            .checked_add(self.charset_start_row)
            .and_then(|y| i32::try_from(y).ok())
            .ok_or_else(unsupported)?;
        Ok(Rect::new(x, y, self.glyph_width, self.glyph_height))
    }
}

pub fn draw_char<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    font: &FontMetrics,
    ch: char,
    x: i32,
    y: i32,
) -> Result<()> {
    let src = font.glyph_rect(ch)?;
    backend.blit(src, x, y)
}

/// Draw `text` left to right from `(x, y)`. Characters outside the charset
/// are replaced by [`PLACEHOLDER`], or left blank when the charset has no
/// placeholder either; only backend failures abort.
pub fn draw_string<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    font: &FontMetrics,
    text: &str,
    x: i32,
    y: i32,
) -> Result<()> {
    let mut x = x;
    for ch in text.chars() {
        match draw_char(backend, font, ch, x, y) {
            Err(PixmapError::UnsupportedGlyph(_)) => {
                match draw_char(backend, font, PLACEHOLDER, x, y) {
                    Ok(()) => tracing::warn!("no glyph for {ch:?}, drew {PLACEHOLDER:?}"),
                    Err(PixmapError::UnsupportedGlyph(_)) => {
                        tracing::warn!("no glyph for {ch:?} nor {PLACEHOLDER:?}, skipped")
                    }
                    Err(e) => return Err(e),
                }
            }
            other => other?,
        }
        x += font.glyph_width as i32;
    }
    Ok(())
}

/// X offset centering `text` in an area of `area_width` with `offset`
/// margin on each side; negative when the text does not fit
pub fn center_start(font: &FontMetrics, text: &str, area_width: u32, offset: u32) -> i32 {
    let text_width = text.chars().count() as i32 * font.glyph_width as i32;
    (area_width as i32 - 2 * offset as i32 - 1 - text_width) / 2
}

/// Free pixels between `lines` rows of text stacked in a window of
/// `height`, 0 for a single line
pub fn vertical_spacing(font: &FontMetrics, lines: u32, margin: u32, height: u32, y_offset: u32) -> i32 {
    if lines <= 1 {
        return 0;
    }
    let used = (lines * font.glyph_height + 1) as i32;
    (height as i32 - used - 2 * y_offset as i32 - margin as i32) / (lines as i32 - 1)
}
