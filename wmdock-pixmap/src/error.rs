//! Error taxonomy for pixmap loading, merging and glyph addressing

pub type Result<T> = std::result::Result<T, PixmapError>;

#[derive(Debug, thiserror::Error)]
pub enum PixmapError {
    /// The pixmap text does not have the quoted-string structure its header promises
    #[error("malformed pixmap: {0}")]
    MalformedInput(String),

    /// Only one character per color key is supported
    #[error("unsupported pixmap format: {chars_per_color} chars per color (expected 1)")]
    UnsupportedFormat { chars_per_color: u32 },

    #[error("color not found: {0}")]
    ColorNotFound(String),

    /// Every key in the 40..126 alphabet is already taken
    #[error("palette exhausted: no unused color key left")]
    PaletteExhausted,

    #[error("cannot infer glyph size for font '{0}' (name has no WxH and no explicit size given)")]
    InvalidFontDimensions(String),

    #[error("unsupported glyph {0:?}")]
    UnsupportedGlyph(char),

    #[error("graphics backend: {0}")]
    Backend(String),
}

impl PixmapError {
    /// Soft failures are logged and skipped by callers instead of aborting startup.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ColorNotFound(_) | Self::UnsupportedGlyph(_))
    }
}
