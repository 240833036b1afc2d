//! XPM text codec
//!
//! Only the parts of XPM3 the dockapps use: every quoted string literal in
//! document order, a `"W H N 1"` header, N color lines and H pixel rows.
//! Color keys are always a single character.

use std::path::Path;

use crate::error::{PixmapError, Result};
use crate::palette::{Bitmap, Fragment, Palette, TRANSPARENT};

/// Marker at the start of in-memory XPM documents
pub const MAGIC: &str = "/* XPM */";

/// Decode a path, or an in-memory document when `source` starts with [`MAGIC`]
pub fn decode(source: &str) -> Result<Fragment> {
    if source.starts_with(MAGIC) {
        decode_str(source)
    } else {
        decode_file(source)
    }
}

pub fn decode_file(path: impl AsRef<Path>) -> Result<Fragment> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        PixmapError::MalformedInput(format!("cannot open {}: {e}", path.display()))
    })?;
    decode_str(&text)
}

pub fn decode_str(text: &str) -> Result<Fragment> {
    let strings = quoted_strings(text);
    let header = strings
        .first()
        .ok_or_else(|| PixmapError::MalformedInput("no quoted strings".into()))?;

    let values: Vec<u32> = header
        .split_whitespace()
        .take(4)
        .map(|v| v.parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| PixmapError::MalformedInput(format!("bad header {header:?}")))?;
    let [width, height, colors, chars_per_color] = values[..] else {
        return Err(PixmapError::MalformedInput(format!("bad header {header:?}")));
    };
    if chars_per_color != 1 {
        return Err(PixmapError::UnsupportedFormat { chars_per_color });
    }

    let (colors, height) = (colors as usize, height as usize);
    let expected = 1 + colors + height;
    if strings.len() < expected {
        return Err(PixmapError::MalformedInput(format!(
            "expected {expected} strings, found {}",
            strings.len()
        )));
    }

    let mut palette = Palette::new();
    for line in &strings[1..=colors] {
        let mut chars = line.chars();
        let key = chars
            .next()
            .ok_or_else(|| PixmapError::MalformedInput("empty color line".into()))?;
        let color = chars
            .as_str()
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| PixmapError::MalformedInput(format!("bad color line {line:?}")))?;
        palette.insert(key, color);
    }

    let bitmap: Bitmap = strings[1 + colors..expected].iter().cloned().collect();
    if bitmap.height() > 0 && bitmap.width() != width as usize {
        return Err(PixmapError::MalformedInput(format!(
            "header says width {width}, rows are {} wide",
            bitmap.width()
        )));
    }

    let fragment = Fragment::new(palette, bitmap);
    fragment.validate()?;
    Ok(fragment)
}

/// Variable name of the `static char *<name>[]` declaration, if present
pub fn declared_name(text: &str) -> Option<&str> {
    let rest = &text[text.find("char")? + "char".len()..];
    let rest = rest.trim_start().strip_prefix('*')?.trim_start();
    let end = rest.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))?;
    (end > 0).then(|| &rest[..end])
}

/// Quoted-string list of `fragment`: header, colors (transparent first), rows
pub fn encode(fragment: &Fragment) -> Vec<String> {
    let Fragment { palette, bitmap } = fragment;
    let transparent = palette.iter().filter(|(_, c)| *c == TRANSPARENT);
    let opaque = palette.iter().filter(|(_, c)| *c != TRANSPARENT);

    std::iter::once(format!(
        "{} {} {} 1",
        bitmap.width(),
        bitmap.height(),
        palette.len()
    ))
    .chain(transparent.chain(opaque).map(|(k, c)| format!("{k}\tc {c}")))
    .chain(bitmap.rows().iter().cloned())
    .collect()
}

/// Full XPM3 document declaring `static char *<name>[]`
pub fn to_document(name: &str, fragment: &Fragment) -> String {
    let body: Vec<String> = encode(fragment)
        .iter()
        .map(|s| format!("\"{}\"", escape(s)))
        .collect();
    format!(
        "{MAGIC}\nstatic char *{name}[] = {{\n{}\n}};\n",
        body.join(",\n")
    )
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Every string literal in document order, with backslash escapes undone
fn quoted_strings(text: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut literal = String::new();
        while let Some(c) = chars.next() {
            match c {
                '"' => break,
                '\\' => literal.extend(chars.next()),
                _ => literal.push(c),
            }
        }
        strings.push(literal);
    }
    strings
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"/* XPM */
static char *sample[] = {
/* width height ncolors chars_per_pixel */
"4 2 3 1",
" 	c None",
".	c #000000 s background",
"X	c white",
"X.. ",
" ..X"
};
"#;

    #[test]
    fn test_decode_in_memory() {
        let fragment = decode(SAMPLE).unwrap();
        assert_eq!(fragment.palette.get(' '), Some("None"));
        assert_eq!(fragment.palette.get('.'), Some("#000000"));
        assert_eq!(fragment.palette.get('X'), Some("white"));
        assert_eq!(fragment.bitmap.rows(), &["X.. ", " ..X"]);
        assert_eq!(fragment.color_at(3, 1), Some("white"));
    }

    #[test]
    fn test_decode_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.xpm");
        std::fs::write(&path, SAMPLE).unwrap();
        let fragment = decode(path.to_str().unwrap()).unwrap();
        assert_eq!(fragment.bitmap.width(), 4);
        assert_eq!(fragment.bitmap.height(), 2);
    }

    #[test]
    fn test_missing_file_is_malformed_input() {
        assert!(matches!(
            decode("/nonexistent/dir/font-6x8.xpm"),
            Err(PixmapError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_two_chars_per_color_unsupported() {
        let text = "/* XPM */\n\"1 1 1 2\",\n\"aa c #000000\",\n\"aa\"";
        assert!(matches!(
            decode(text),
            Err(PixmapError::UnsupportedFormat { chars_per_color: 2 })
        ));
    }

    #[test]
    fn test_truncated_document() {
        let text = "/* XPM */\n\"2 3 1 1\",\n\"a c #000000\",\n\"aa\",\n\"aa\"";
        assert!(matches!(decode(text), Err(PixmapError::MalformedInput(_))));
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            decode("/* XPM */\n\"2 two 1 1\""),
            Err(PixmapError::MalformedInput(_))
        ));
        assert!(matches!(
            decode("/* XPM */ nothing quoted"),
            Err(PixmapError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_encode_lists_transparent_first() {
        let fragment = decode(SAMPLE).unwrap();
        let lines = encode(&fragment);
        assert_eq!(lines[0], "4 2 3 1");
        assert_eq!(lines[1], " \tc None");
        assert_eq!(lines[2], ".\tc #000000");
        assert_eq!(lines[3], "X\tc white");
        assert_eq!(&lines[4..], &["X.. ", " ..X"]);
    }

    #[test]
    fn test_document_escapes_backslash_and_quote() {
        let fragment = Fragment::new(
            [('\\', "#ff0000"), ('"', "#00ff00")].into_iter().collect(),
            ["\\\"", "\"\\"].into_iter().collect(),
        );
        let document = to_document("escaped", &fragment);
        assert!(document.starts_with("/* XPM */\nstatic char *escaped[] = {\n"));
        assert_eq!(decode(&document).unwrap(), fragment);
    }

    #[test]
    fn test_declared_name() {
        assert_eq!(declared_name(SAMPLE), Some("sample"));
        assert_eq!(declared_name("static char * font_8x12 [] = {"), Some("font_8x12"));
        assert_eq!(declared_name("\"1 1 1 1\""), None);
    }

    #[test]
    fn test_bundled_font_decodes() {
        let font = decode(include_str!("../../assets/fonts/charset-6x8.xpm")).unwrap();
        assert_eq!(font.bitmap.width(), 96);
        assert_eq!(font.bitmap.height(), 48);
        assert_eq!(font.palette.len(), 2);
    }
}
