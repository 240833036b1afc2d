//! The dockapp itself: line layout, redraw, mouse dispatch

use anyhow::{Context, Result};
use std::process::{Child, Command};
use std::time::Duration;
use wmdock_pixmap::glyph::{center_start, draw_string, vertical_spacing};
use wmdock_pixmap::{
    xpm, ColorLookup, Composer, CompositeImage, FontMetrics, GraphicsBackend, Rect,
};

use crate::assets;
use crate::config::{Config, LineConfig};

pub const DOCK_SIZE: usize = 64;

/// Limit of the WindowMaker dockapp library
pub const MAX_MOUSE_REGIONS: usize = 16;

/// What the window system reports back to the dock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockEvent {
    ButtonRelease { x: i32, y: i32, button: u8 },
    Expose,
    Destroy,
}

/// Backends that also deliver window events
pub trait EventSource {
    fn poll_event(&mut self) -> Result<Option<DockEvent>>;
}

/// Indexed click areas; edges are inclusive
#[derive(Debug, Default)]
pub struct MouseRegions {
    slots: [Option<Rect>; MAX_MOUSE_REGIONS],
}

impl MouseRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set region `index` to the box from (left, top) to (right, bottom);
    /// indices past the limit are ignored
    pub fn add(&mut self, index: usize, left: i32, top: i32, right: i32, bottom: i32) {
        let Some(slot) = self.slots.get_mut(index) else {
            tracing::warn!("mouse region {index} out of range, ignored");
            return;
        };
        *slot = Some(Rect::new(
            left,
            top,
            (right - left + 1).max(0) as u32,
            (bottom - top + 1).max(0) as u32,
        ));
    }

    /// Lowest index whose region contains the point
    pub fn check(&self, x: i32, y: i32) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|r| r.contains(x, y)))
    }
}

/// Compose the dock pixmap from config: background, fonts, colors
pub fn build_image(config: &Config, colors: &dyn ColorLookup) -> Result<CompositeImage> {
    let composer = Composer {
        width: DOCK_SIZE,
        height: DOCK_SIZE,
        margin: config.margin,
        style: config.style()?,
        background_color: config.background_color.clone(),
        bevel_color: config.bevel_color.clone(),
        palette: config.palette()?,
    };

    let background = config
        .background
        .as_ref()
        .map(|path| {
            xpm::decode_file(path)
                .with_context(|| format!("failed to load background {}", path.display()))
        })
        .transpose()?;

    let mut font = assets::load_font(&config.font)?;
    if let Some((w, h)) = config.font_size()? {
        font = font.with_size(w, h);
    }
    let ink = resolved(colors, config.text_color.as_deref());
    let paper = resolved(colors, Some(&config.background_color));
    font.recolor(ink.as_deref(), paper.as_deref());

    let image = composer
        .compose(background.as_ref(), None, &[font], colors)
        .context("failed to compose dock pixmap")?;
    tracing::info!(
        "composed {}x{} pixmap, {} colors",
        image.pixmap().bitmap.width(),
        image.pixmap().bitmap.height(),
        image.pixmap().palette.len()
    );
    Ok(image)
}

fn resolved(colors: &dyn ColorLookup, color: Option<&str>) -> Option<String> {
    let color = color?;
    match colors.lookup(color) {
        Ok(hex) => Some(colors.normalize(&hex)),
        Err(e) => {
            tracing::warn!("{e}, keeping font colors");
            None
        }
    }
}

/// One configured text line and where it lands
#[derive(Debug, Clone)]
struct Line {
    config: LineConfig,
    area: Rect,
}

pub struct Dock {
    image: CompositeImage,
    font: FontMetrics,
    lines: Vec<Line>,
    regions: MouseRegions,
    children: Vec<Child>,
}

impl Dock {
    pub fn new(image: CompositeImage, lines: &[LineConfig], margin: usize) -> Result<Self> {
        let font = *image.font().context("composite has no font")?;
        let (width, height) = image.window_size();
        let border = margin.checked_mul(2).and_then(|m| m.checked_add(1));
        let line_width = border
            .filter(|b| *b < height)
            .and_then(|b| width.checked_sub(b))
            .filter(|w| *w > 0)
            .with_context(|| format!("margin {margin} does not fit a {width}x{height} window"))?;
        let line_width = u32::try_from(line_width).context("window too wide")?;
        let (height, margin) = (
            i32::try_from(height).context("window too tall")?,
            margin as i32,
        );
        let y_offset = margin + 1;

        if lines.len() > MAX_MOUSE_REGIONS {
            tracing::warn!("only the first {MAX_MOUSE_REGIONS} lines are shown");
        }
        let lines = &lines[..lines.len().min(MAX_MOUSE_REGIONS)];
        let spacing = vertical_spacing(
            &font,
            lines.len() as u32,
            margin as u32,
            height as u32,
            y_offset as u32,
        )
        .max(0);

        let mut regions = MouseRegions::new();
        let mut laid_out = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let y = y_offset + index as i32 * (font.glyph_height as i32 + spacing);
            let area = Rect::new(margin, y, line_width, font.glyph_height);
            regions.add(
                index,
                area.x,
                area.y,
                area.x + area.width as i32 - 1,
                area.y + area.height as i32 - 1,
            );
            laid_out.push(Line {
                config: line.clone(),
                area,
            });
        }

        Ok(Self {
            image,
            font,
            lines: laid_out,
            regions,
            children: Vec::new(),
        })
    }

    /// Upload the pixmap and draw every line
    pub fn start<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        backend.upload_pixmap(self.image.pixmap())?;
        self.redraw(backend)
    }

    pub fn redraw<B: GraphicsBackend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        let eraser = self.image.eraser();
        for line in &self.lines {
            let area = line.area;
            backend.blit(
                Rect::new(area.x, eraser.y + area.y, area.width, area.height),
                area.x,
                area.y,
            )?;

            let fits = (area.width / self.font.glyph_width) as usize;
            let text: String = line.config.text.chars().take(fits).collect();
            let x = area.x + center_start(&self.font, &text, area.width + 1, 0).max(0);
            draw_string(backend, &self.font, &text, x, area.y)?;
        }
        backend.present()?;
        Ok(())
    }

    /// Command bound to a click, if any
    pub fn command_at(&self, x: i32, y: i32, button: u8) -> Option<&str> {
        if button != 1 {
            return None;
        }
        let index = self.regions.check(x, y)?;
        self.lines.get(index)?.config.command.as_deref()
    }

    /// React to one event; false when the dock should exit
    pub fn handle<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        event: DockEvent,
    ) -> Result<bool> {
        match event {
            DockEvent::Destroy => return Ok(false),
            DockEvent::Expose => backend.present()?,
            DockEvent::ButtonRelease { x, y, button } => {
                if let Some(command) = self.command_at(x, y, button).map(str::to_string) {
                    self.spawn(&command);
                }
            }
        }
        Ok(true)
    }

    fn spawn(&mut self, command: &str) {
        tracing::info!("running {command:?}");
        match Command::new("sh").arg("-c").arg(command).spawn() {
            Ok(child) => self.children.push(child),
            Err(e) => tracing::warn!("failed to run {command:?}: {e}"),
        }
    }

    /// Collect exited commands
    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("command exited: {status}");
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("lost track of command: {e}");
                false
            }
        });
    }

    /// Event / redraw loop until the window is destroyed
    pub fn run<B: GraphicsBackend + EventSource>(
        &mut self,
        backend: &mut B,
        interval: Duration,
    ) -> Result<()> {
        self.start(backend)?;
        loop {
            while let Some(event) = backend.poll_event()? {
                if !self.handle(backend, event)? {
                    tracing::info!("window destroyed");
                    return Ok(());
                }
            }
            self.reap();
            self.redraw(backend)?;
            std::thread::sleep(interval);
        }
    }
}
