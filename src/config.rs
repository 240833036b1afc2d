//! Dock configuration
//!
//! Read from `~/.config/wmdock/config.toml` (or `--config`), then patched
//! with command-line overrides.
//!
//! ```toml
//! style = "bevel"
//! background_color = "black"
//! text_color = "light sea green"
//! font = "charset-6x8"
//!
//! [palette]
//! 1 = "black"
//! 2 = "white"
//!
//! [[lines]]
//! text = "mail"
//! command = "xterm -e mutt"
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use wmdock_pixmap::color::RGB_FILE_LIST;
use wmdock_pixmap::{Palette, Style};

use crate::dock::DOCK_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub style: String,
    pub margin: usize,
    pub background_color: String,
    pub bevel_color: String,
    pub text_color: Option<String>,
    /// XPM file used as window background instead of the synthesized one
    pub background: Option<PathBuf>,
    /// Bundled font name or XPM path
    pub font: String,
    /// Glyph size as "WxH" when the font name does not carry it
    pub font_size: Option<String>,
    pub rgb_files: Vec<PathBuf>,
    pub update_interval_ms: u64,
    pub palette: BTreeMap<String, String>,
    pub lines: Vec<LineConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    pub text: String,
    /// Shell command spawned on left click
    #[serde(default)]
    pub command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            style: "bevel".into(),
            margin: 3,
            background_color: "black".into(),
            bevel_color: "#bebebe".into(),
            text_color: None,
            background: None,
            font: crate::assets::DEFAULT_FONT.into(),
            font_size: None,
            rgb_files: RGB_FILE_LIST.iter().map(|p| PathBuf::from(*p)).collect(),
            update_interval_ms: 300,
            palette: [("1", "black"), ("2", "white")]
                .into_iter()
                .map(|(k, c)| (k.to_string(), c.to_string()))
                .collect(),
            lines: vec![LineConfig {
                text: "wmdock".into(),
                command: None,
            }],
        }
    }
}

/// Command-line settings that win over the config file
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Overrides {
    /// Text color (name or #hex)
    #[arg(short, long, global = true)]
    pub text_color: Option<String>,

    /// Background color (name or #hex)
    #[arg(short, long, global = true)]
    pub background_color: Option<String>,

    /// Color database (rgb.txt) to use instead of the default list
    #[arg(short, long, global = true)]
    pub rgb_file: Option<PathBuf>,

    /// Font: bundled font name or XPM path
    #[arg(short, long, global = true)]
    pub font: Option<String>,
}

impl Config {
    /// `~/.config/wmdock/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wmdock").join("config.toml"))
    }

    /// Load an explicit file, or the default file when it exists, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    tracing::debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.style()?;
        self.font_size()?;
        self.palette()?;
        if self.update_interval_ms == 0 {
            bail!("update_interval_ms must be positive");
        }
        if self.margin > (DOCK_SIZE - 1) / 2 {
            bail!(
                "margin {} leaves no room in a {DOCK_SIZE}x{DOCK_SIZE} dock",
                self.margin
            );
        }
        Ok(())
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(color) = &overrides.text_color {
            self.text_color = Some(color.clone());
        }
        if let Some(color) = &overrides.background_color {
            self.background_color = color.clone();
        }
        if let Some(path) = &overrides.rgb_file {
            self.rgb_files = vec![path.clone()];
        }
        if let Some(font) = &overrides.font {
            self.font = font.clone();
        }
    }

    pub fn style(&self) -> Result<Style> {
        self.style.parse().map_err(anyhow::Error::msg)
    }

    pub fn font_size(&self) -> Result<Option<(u32, u32)>> {
        let Some(size) = &self.font_size else {
            return Ok(None);
        };
        let parsed: Option<(u32, u32)> = size
            .split_once('x')
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));
        match parsed {
            Some((w, h)) if w > 0 && h > 0 => Ok(Some((w, h))),
            _ => bail!("font_size must look like 6x8, got {size:?}"),
        }
    }

    /// Extra palette; every key must be a single character
    pub fn palette(&self) -> Result<Palette> {
        self.palette
            .iter()
            .map(|(key, color)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(k), None) => Ok((k, color.as_str())),
                    _ => bail!("palette key {key:?} must be a single character"),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r##"
            style = "flat"
            margin = 2
            background_color = "#102030"
            text_color = "green"
            font = "/usr/share/wmdock/big.xpm"
            font_size = "8x12"
            rgb_files = ["/tmp/rgb.txt"]
            update_interval_ms = 1000

            [palette]
            a = "red"

            [[lines]]
            text = "mail"
            command = "xterm -e mutt"

            [[lines]]
            text = "load"
            "##,
        )
        .unwrap();

        assert_eq!(config.style().unwrap(), Style::Flat);
        assert_eq!(config.margin, 2);
        assert_eq!(config.font_size().unwrap(), Some((8, 12)));
        assert_eq!(config.palette().unwrap().get('a'), Some("red"));
        assert_eq!(config.lines.len(), 2);
        assert_eq!(config.lines[0].command.as_deref(), Some("xterm -e mutt"));
        assert_eq!(config.lines[1].command, None);
        assert_eq!(config.bevel_color, "#bebebe");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_toml("style = \"round\"").is_err());
        assert!(Config::from_toml("font_size = \"8 by 12\"").is_err());
        assert!(Config::from_toml("font_size = \"0x12\"").is_err());
        assert!(Config::from_toml("[palette]\nab = \"red\"").is_err());
        assert!(Config::from_toml("update_interval_ms = 0").is_err());
        assert!(Config::from_toml("margin = 32").is_err());
        assert!(Config::from_toml("margin = 40").is_err());
        assert_eq!(Config::from_toml("margin = 31").unwrap().margin, 31);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply(&Overrides {
            text_color: Some("yellow".into()),
            background_color: None,
            rgb_file: Some("/opt/rgb.txt".into()),
            font: Some("other-5x7".into()),
        });
        assert_eq!(config.text_color.as_deref(), Some("yellow"));
        assert_eq!(config.background_color, "black");
        assert_eq!(config.rgb_files, vec![PathBuf::from("/opt/rgb.txt")]);
        assert_eq!(config.font, "other-5x7");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "margin = 5\n").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().margin, 5);
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), Config::default());
    }
}
