//! Graphics backend capability
//!
//! A backend owns one uploaded pixmap. Blits copy rectangles inside that
//! pixmap, the top-left window-sized area being what `present` shows, the
//! same model the WindowMaker dockapp library uses.

use crate::color::{parse_rgb, rgb_to_pixel};
use crate::error::{PixmapError, Result};
use crate::palette::{Fragment, TRANSPARENT};

/// Pixel rectangle inside the pixmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }
}

pub trait GraphicsBackend {
    /// Replace the backend's pixmap with `pixmap`
    fn upload_pixmap(&mut self, pixmap: &Fragment) -> Result<()>;

    /// Copy `src` to `(dst_x, dst_y)`; out-of-bounds parts are clipped
    fn blit(&mut self, src: Rect, dst_x: i32, dst_y: i32) -> Result<()>;

    /// Make the window area visible
    fn present(&mut self) -> Result<()> {
        Ok(())
    }

    /// Hex code of a color name known to the backend
    fn resolve_color_name(&self, _name: &str) -> Option<String> {
        None
    }
}

/// What a [`RecordingBackend`] was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Upload { width: usize, height: usize, colors: usize },
    Blit { src: Rect, dst_x: i32, dst_y: i32 },
    Present,
}

/// Backend that only records calls
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blits(&self) -> impl Iterator<Item = (Rect, i32, i32)> + '_ {
        self.calls.iter().filter_map(|call| match call {
            BackendCall::Blit { src, dst_x, dst_y } => Some((*src, *dst_x, *dst_y)),
            _ => None,
        })
    }
}

impl GraphicsBackend for RecordingBackend {
    fn upload_pixmap(&mut self, pixmap: &Fragment) -> Result<()> {
        self.calls.push(BackendCall::Upload {
            width: pixmap.bitmap.width(),
            height: pixmap.bitmap.height(),
            colors: pixmap.palette.len(),
        });
        Ok(())
    }

    fn blit(&mut self, src: Rect, dst_x: i32, dst_y: i32) -> Result<()> {
        self.calls.push(BackendCall::Blit { src, dst_x, dst_y });
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.calls.push(BackendCall::Present);
        Ok(())
    }
}

/// Software raster of the pixmap in 0RGB pixels
#[derive(Debug, Clone)]
pub struct Framebuffer {
    window_width: usize,
    window_height: usize,
    width: usize,
    height: usize,
    pixels: Vec<u32>,
    /// Pixel used for transparent and unresolvable colors
    pub fill: u32,
}

impl Framebuffer {
    pub fn new(window_width: usize, window_height: usize) -> Self {
        Self {
            window_width,
            window_height,
            width: 0,
            height: 0,
            pixels: Vec::new(),
            fill: 0,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Window-sized top-left area, row-major
    pub fn canvas(&self) -> Vec<u32> {
        let mut canvas = vec![self.fill; self.window_width * self.window_height];
        for y in 0..self.window_height.min(self.height) {
            let cols = self.window_width.min(self.width);
            let src = &self.pixels[y * self.width..y * self.width + cols];
            canvas[y * self.window_width..y * self.window_width + cols].copy_from_slice(src);
        }
        canvas
    }

    pub fn window_size(&self) -> (usize, usize) {
        (self.window_width, self.window_height)
    }
}

impl GraphicsBackend for Framebuffer {
    fn upload_pixmap(&mut self, pixmap: &Fragment) -> Result<()> {
        pixmap.validate()?;
        let mut unresolved = Vec::new();
        let mut pixels = Vec::with_capacity(pixmap.bitmap.width() * pixmap.bitmap.height());

        for row in pixmap.bitmap.rows() {
            for key in row.chars() {
                let color = pixmap.palette.get(key).unwrap_or(TRANSPARENT);
                let pixel = match parse_rgb(color) {
                    Some(rgb) => rgb_to_pixel(rgb),
                    None => {
                        if color != TRANSPARENT && !unresolved.contains(&color) {
                            unresolved.push(color);
                        }
                        self.fill
                    }
                };
                pixels.push(pixel);
            }
        }
        for color in unresolved {
            tracing::warn!("cannot display color {color:?}, using fill");
        }

        self.width = pixmap.bitmap.width();
        self.height = pixmap.bitmap.height();
        self.pixels = pixels;
        Ok(())
    }

    fn blit(&mut self, src: Rect, dst_x: i32, dst_y: i32) -> Result<()> {
        if self.pixels.is_empty() {
            return Err(PixmapError::Backend("blit before upload".into()));
        }
        let (w, h) = (self.width as i64, self.height as i64);

        // only offsets whose source and target both land inside the pixmap
        let span = |src_at: i32, dst_at: i32, len: u32, limit: i64| {
            let (src_at, dst_at) = (src_at as i64, dst_at as i64);
            let lo = 0i64.max(-src_at).max(-dst_at);
            let hi = (len as i64).min(limit - src_at).min(limit - dst_at);
            (lo, hi)
        };
        let (x_lo, x_hi) = span(src.x, dst_x, src.width, w);
        let (y_lo, y_hi) = span(src.y, dst_y, src.height, h);
        if x_lo >= x_hi || y_lo >= y_hi {
            return Ok(());
        }

        // stage the source so overlapping copies read unmodified pixels
        let index = |x: i64, y: i64| (y * w + x) as usize;
        let mut staged = Vec::with_capacity(((x_hi - x_lo) * (y_hi - y_lo)) as usize);
        for dy in y_lo..y_hi {
            for dx in x_lo..x_hi {
                staged.push(self.pixels[index(src.x as i64 + dx, src.y as i64 + dy)]);
            }
        }
        let mut staged = staged.into_iter();
        for dy in y_lo..y_hi {
            for dx in x_lo..x_hi {
                if let Some(value) = staged.next() {
                    self.pixels[index(dst_x as i64 + dx, dst_y as i64 + dy)] = value;
                }
            }
        }
        Ok(())
    }
}
