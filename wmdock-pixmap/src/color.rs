//! Color name resolution
//!
//! Names are looked up in an X11 `rgb.txt` style database: lines of
//! `R G B name words...`, `!` starting a comment. The first readable file
//! of the candidate list is loaded; when none is readable, name lookup is
//! disabled and only literal `#hex` colors resolve.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::backend::GraphicsBackend;
use crate::error::{PixmapError, Result};
use crate::palette::TRANSPARENT;

/// Default locations of the X11 color database, tried in order
pub const RGB_FILE_LIST: &[&str] = &[
    "/etc/X11/rgb.txt",
    "/usr/lib/X11/rgb.txt",
    "/usr/share/X11/rgb.txt",
    "/usr/X11R6/lib/X11/rgb.txt",
];

/// Anything able to turn a color name into a hex code
pub trait ColorLookup {
    fn lookup(&self, name: &str) -> Result<String>;

    /// Canonical form used as palette value: `None` for transparency,
    /// lowercase hex for everything resolvable, the name itself otherwise.
    fn normalize(&self, color: &str) -> String {
        if color.eq_ignore_ascii_case(TRANSPARENT) {
            return TRANSPARENT.to_string();
        }
        if color.starts_with('#') {
            return color.to_ascii_lowercase();
        }
        match self.lookup(color) {
            Ok(hex) => hex.to_ascii_lowercase(),
            Err(_) => {
                tracing::debug!("keeping unresolved color name {color:?}");
                color.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColorResolver {
    table: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl ColorResolver {
    /// Resolver over the default system database locations
    pub fn system() -> Self {
        Self::from_files(RGB_FILE_LIST)
    }

    /// Load the first readable database of `candidates`
    pub fn from_files<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for path in candidates {
            let path = path.as_ref();
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    let mut resolver = Self::from_database(&text);
                    tracing::debug!(
                        "loaded {} colors from {}",
                        resolver.table.len(),
                        path.display()
                    );
                    resolver.source = Some(path.to_path_buf());
                    return resolver;
                }
                Err(e) => tracing::trace!("skipping color database {}: {e}", path.display()),
            }
        }
        tracing::warn!("no readable color database found, color names disabled");
        Self::default()
    }

    /// Parse database text directly
    pub fn from_database(text: &str) -> Self {
        let mut table = HashMap::new();
        for line in text.lines() {
            if line.starts_with('!') {
                continue;
            }
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.len() <= 3 {
                continue;
            }
            let rgb: Option<Vec<u8>> = words[..3].iter().map(|w| w.parse().ok()).collect();
            let Some(rgb) = rgb else { continue };
            table
                .entry(collapse(&words[3..].join(" ")))
                .or_insert_with(|| format!("#{}", hex::encode(rgb)));
        }
        Self {
            table,
            source: None,
        }
    }

    /// Database file in use, if any was readable
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        !self.table.is_empty()
    }

    /// Resolve `name` to `#rrggbb`; names starting with `#` pass through unchanged
    pub fn resolve(&self, name: &str) -> Result<String> {
        if name.starts_with('#') {
            return Ok(name.to_string());
        }
        self.table
            .get(&collapse(name))
            .cloned()
            .ok_or_else(|| PixmapError::ColorNotFound(name.to_string()))
    }

    /// Chain this database with the color names known to `backend`
    pub fn with_backend<'a, B: GraphicsBackend + ?Sized>(
        &'a self,
        backend: &'a B,
    ) -> BackendColors<'a, B> {
        BackendColors {
            resolver: self,
            backend,
        }
    }
}

impl ColorLookup for ColorResolver {
    fn lookup(&self, name: &str) -> Result<String> {
        self.resolve(name)
    }
}

/// Database lookup that falls back to the graphics backend
pub struct BackendColors<'a, B: ?Sized> {
    resolver: &'a ColorResolver,
    backend: &'a B,
}

impl<B: GraphicsBackend + ?Sized> ColorLookup for BackendColors<'_, B> {
    fn lookup(&self, name: &str) -> Result<String> {
        self.resolver.resolve(name).or_else(|err| {
            self.backend.resolve_color_name(name).ok_or(err)
        })
    }
}

fn collapse(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse `#rgb`, `#rrggbb` or `#rrrrggggbbbb` into 8-bit channels
pub fn parse_rgb(color: &str) -> Option<[u8; 3]> {
    let digits = color.strip_prefix('#')?;
    match digits.len() {
        3 => {
            let doubled: String = digits.chars().flat_map(|c| [c, c]).collect();
            parse_rgb(&format!("#{doubled}"))
        }
        6 => hex::decode(digits).ok()?.try_into().ok(),
        12 => {
            let wide = hex::decode(digits).ok()?;
            Some([wide[0], wide[2], wide[4]])
        }
        _ => None,
    }
}

/// Pack channels as 0RGB
pub fn rgb_to_pixel([r, g, b]: [u8; 3]) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}
