//! Fonts compiled into the binary

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::path::Path;
use wmdock_pixmap::{xpm, FontFragment};

static FONTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets/fonts");

pub const DEFAULT_FONT: &str = "charset-6x8";

/// (name, XPM text) of every bundled font, sorted by name
pub fn bundled_fonts() -> Vec<(&'static str, &'static str)> {
    let mut fonts: Vec<_> = FONTS
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "xpm"))
        .filter_map(|f| {
            let name = f.path().file_stem()?.to_str()?;
            Some((name, f.contents_utf8()?))
        })
        .collect();
    fonts.sort_by_key(|(name, _)| *name);
    fonts
}

/// Resolve a bundled font by name, anything else is read as an XPM path
pub fn load_font(font: &str) -> Result<FontFragment> {
    if let Some((name, text)) = bundled_fonts().into_iter().find(|(name, _)| *name == font) {
        let fragment = xpm::decode_str(text)
            .with_context(|| format!("bundled font {name} is corrupt"))?;
        return Ok(FontFragment::new(name, fragment));
    }
    if !Path::new(font).exists() {
        let known: Vec<_> = bundled_fonts().into_iter().map(|(name, _)| name).collect();
        anyhow::bail!("no font {font:?} (bundled: {})", known.join(", "));
    }
    FontFragment::load(font).with_context(|| format!("failed to load font {font}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_font_is_bundled() {
        let font = load_font(DEFAULT_FONT).unwrap();
        assert_eq!(font.name(), DEFAULT_FONT);
        assert_eq!(font.glyph_size().unwrap(), (6, 8));
    }

    #[test]
    fn test_font_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy-6x8.xpm");
        std::fs::write(&path, bundled_fonts()[0].1).unwrap();
        let font = load_font(path.to_str().unwrap()).unwrap();
        assert_eq!(font.name(), "copy-6x8");
    }

    #[test]
    fn test_unknown_font() {
        let err = load_font("nope-1x1").unwrap_err();
        assert!(err.to_string().contains(DEFAULT_FONT));
    }
}
