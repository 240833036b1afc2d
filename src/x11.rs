//! X11 dock window
//!
//! WindowMaker docks a client through its icon window: the main window is
//! mapped withdrawn with `WM_HINTS.icon_window` pointing at a second window
//! of the same size, and both get the same contents on every present.

use anyhow::{Context, Result};
use wmdock_pixmap::color::{parse_rgb, rgb_to_pixel};
use wmdock_pixmap::palette::TRANSPARENT;
use wmdock_pixmap::{Fragment, GraphicsBackend, PixmapError, Rect};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::{
    AtomEnum, ConnectionExt, CreateGCAux, CreateWindowAux, EventMask, ImageFormat, PropMode,
    WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::dock::{DockEvent, EventSource};

// WM_HINTS flags (ICCCM 4.1.2.4)
const STATE_HINT: u32 = 1 << 1;
const ICON_WINDOW_HINT: u32 = 1 << 5;
const WINDOW_GROUP_HINT: u32 = 1 << 6;
const WITHDRAWN_STATE: u32 = 0;

// WM_NORMAL_HINTS flags
const US_POSITION: u32 = 1;
const P_SIZE: u32 = 1 << 3;

pub struct X11Backend {
    conn: RustConnection,
    window: u32,
    icon: u32,
    gc: u32,
    colormap: u32,
    depth: u8,
    width: u16,
    height: u16,
    pixmap: Option<u32>,
}

impl X11Backend {
    pub fn open(display: Option<&str>, width: u16, height: u16, name: &str) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display).context("failed to connect to X display")?;
        let screen = &conn.setup().roots[screen_num];
        let (root, depth, visual) = (screen.root, screen.root_depth, screen.root_visual);
        let (colormap, black) = (screen.default_colormap, screen.black_pixel);
        if depth < 24 {
            anyhow::bail!("unsupported screen depth {depth} (need 24 or 32)");
        }

        let aux = CreateWindowAux::new()
            .background_pixel(black)
            .event_mask(
                EventMask::EXPOSURE
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::STRUCTURE_NOTIFY,
            );
        let window = conn.generate_id()?;
        let icon = conn.generate_id()?;
        for id in [window, icon] {
            conn.create_window(
                depth,
                id,
                root,
                0,
                0,
                width,
                height,
                0,
                WindowClass::INPUT_OUTPUT,
                visual,
                &aux,
            )?;
        }

        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &CreateGCAux::new().graphics_exposures(0))?;

        conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_NAME, AtomEnum::STRING, name.as_bytes())?;
        let class = format!("{name}\0{name}\0");
        conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_CLASS, AtomEnum::STRING, class.as_bytes())?;

        let mut size_hints = [0u32; 18];
        size_hints[0] = US_POSITION | P_SIZE;
        size_hints[3] = width as u32;
        size_hints[4] = height as u32;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NORMAL_HINTS,
            AtomEnum::WM_SIZE_HINTS,
            &size_hints,
        )?;

        let wm_hints: [u32; 9] = [
            STATE_HINT | ICON_WINDOW_HINT | WINDOW_GROUP_HINT,
            0,               // input
            WITHDRAWN_STATE, // initial_state
            0,               // icon_pixmap
            icon,            // icon_window
            0,               // icon_x
            0,               // icon_y
            0,               // icon_mask
            window,          // window_group
        ];
        conn.change_property32(PropMode::REPLACE, window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, &wm_hints)?;

        conn.map_window(window)?;
        conn.flush()?;
        let shown = display_label(display);
        tracing::info!("dock window {window:#x} (icon {icon:#x}) on {shown}");

        Ok(Self {
            conn,
            window,
            icon,
            gc,
            colormap,
            depth,
            width,
            height,
            pixmap: None,
        })
    }

    /// Named color through the server's color database
    fn lookup_color(&self, name: &str) -> Option<String> {
        let reply = self
            .conn
            .lookup_color(self.colormap, name.as_bytes())
            .ok()?
            .reply()
            .ok()?;
        Some(format!(
            "#{:04x}{:04x}{:04x}",
            reply.exact_red, reply.exact_green, reply.exact_blue
        ))
    }

    fn pixel(&self, color: &str) -> Option<u32> {
        if color == TRANSPARENT {
            return Some(0);
        }
        let rgb = parse_rgb(color).or_else(|| parse_rgb(&self.lookup_color(color)?))?;
        Some(rgb_to_pixel(rgb))
    }

    fn upload(&mut self, pixmap: &Fragment) -> Result<()> {
        pixmap.validate()?;
        let width = u16::try_from(pixmap.bitmap.width()).context("pixmap too wide")?;
        let height = u16::try_from(pixmap.bitmap.height()).context("pixmap too tall")?;

        let mut pixels = std::collections::HashMap::new();
        for (key, color) in pixmap.palette.iter() {
            let pixel = self.pixel(color).unwrap_or_else(|| {
                tracing::warn!("cannot allocate color {color:?}, using black");
                0
            });
            pixels.insert(key, pixel);
        }

        if let Some(old) = self.pixmap.take() {
            self.conn.free_pixmap(old)?;
        }
        let id = self.conn.generate_id()?;
        self.conn.create_pixmap(self.depth, id, self.window, width, height)?;
        self.pixmap = Some(id);

        // 32 bits per pixel in the server's (little endian) Z format
        let row_bytes = width as usize * 4;
        let budget = self.conn.maximum_request_bytes().saturating_sub(64);
        let rows_per_request = (budget / row_bytes.max(1)).max(1);

        for (chunk_index, rows) in pixmap.bitmap.rows().chunks(rows_per_request).enumerate() {
            let mut data = Vec::with_capacity(rows.len() * row_bytes);
            for row in rows {
                for key in row.chars() {
                    data.extend_from_slice(&pixels.get(&key).copied().unwrap_or(0).to_le_bytes());
                }
            }
            let y = (chunk_index * rows_per_request) as i16;
            self.conn.put_image(
                ImageFormat::Z_PIXMAP,
                id,
                self.gc,
                width,
                rows.len() as u16,
                0,
                y,
                0,
                self.depth,
                &data,
            )?;
        }
        self.conn.flush()?;
        tracing::debug!("uploaded {width}x{height} pixmap {id:#x}");
        Ok(())
    }

    fn copy(&self, src: Rect, dst_x: i32, dst_y: i32) -> Result<()> {
        let pixmap = self.pixmap.context("blit before upload")?;
        let area = CopyGeometry::new(src, dst_x, dst_y)?;
        self.conn.copy_area(
            pixmap,
            pixmap,
            self.gc,
            area.src_x,
            area.src_y,
            area.dst_x,
            area.dst_y,
            area.width,
            area.height,
        )?;
        Ok(())
    }

    fn show(&self) -> Result<()> {
        let pixmap = self.pixmap.context("present before upload")?;
        for target in [self.window, self.icon] {
            self.conn
                .copy_area(pixmap, target, self.gc, 0, 0, 0, 0, self.width, self.height)?;
        }
        self.conn.flush()?;
        Ok(())
    }
}

fn display_label(display: Option<&str>) -> &str {
    display.unwrap_or("$DISPLAY")
}

/// `CopyArea` arguments in the protocol's 16-bit fields
#[derive(Debug, PartialEq, Eq)]
struct CopyGeometry {
    src_x: i16,
    src_y: i16,
    dst_x: i16,
    dst_y: i16,
    width: u16,
    height: u16,
}

impl CopyGeometry {
    fn new(src: Rect, dst_x: i32, dst_y: i32) -> Result<Self> {
        let coord = |v: i32| i16::try_from(v).with_context(|| format!("blit offset {v} out of range"));
        let extent = |v: u32| u16::try_from(v).with_context(|| format!("blit size {v} out of range"));
        Ok(Self {
            src_x: coord(src.x)?,
            src_y: coord(src.y)?,
            dst_x: coord(dst_x)?,
            dst_y: coord(dst_y)?,
            width: extent(src.width)?,
            height: extent(src.height)?,
        })
    }
}

fn backend_error(e: anyhow::Error) -> PixmapError {
    PixmapError::Backend(format!("{e:#}"))
}

impl GraphicsBackend for X11Backend {
    fn upload_pixmap(&mut self, pixmap: &Fragment) -> wmdock_pixmap::Result<()> {
        self.upload(pixmap).map_err(backend_error)
    }

    fn blit(&mut self, src: Rect, dst_x: i32, dst_y: i32) -> wmdock_pixmap::Result<()> {
        self.copy(src, dst_x, dst_y).map_err(backend_error)
    }

    fn present(&mut self) -> wmdock_pixmap::Result<()> {
        self.show().map_err(backend_error)
    }

    fn resolve_color_name(&self, name: &str) -> Option<String> {
        self.lookup_color(name)
    }
}

impl EventSource for X11Backend {
    fn poll_event(&mut self) -> Result<Option<DockEvent>> {
        while let Some(event) = self.conn.poll_for_event().context("X connection lost")? {
            let mapped = match event {
                Event::ButtonRelease(e) => Some(DockEvent::ButtonRelease {
                    x: e.event_x as i32,
                    y: e.event_y as i32,
                    button: e.detail,
                }),
                Event::Expose(e) if e.count == 0 => Some(DockEvent::Expose),
                Event::DestroyNotify(_) => Some(DockEvent::Destroy),
                _ => None,
            };
            if mapped.is_some() {
                return Ok(mapped);
            }
        }
        Ok(None)
    }
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        if let Some(pixmap) = self.pixmap.take() {
            let _ = self.conn.free_pixmap(pixmap);
        }
        let _ = self.conn.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label() {
        assert_eq!(display_label(Some(":1")), ":1");
        assert_eq!(display_label(None), "$DISPLAY");
    }

    #[test]
    fn test_copy_geometry_fits_protocol_fields() {
        assert_eq!(
            CopyGeometry::new(Rect::new(3, 68, 57, 8), 3, 4).unwrap(),
            CopyGeometry {
                src_x: 3,
                src_y: 68,
                dst_x: 3,
                dst_y: 4,
                width: 57,
                height: 8,
            }
        );
        assert!(CopyGeometry::new(Rect::new(40_000, 0, 1, 1), 0, 0).is_err());
        assert!(CopyGeometry::new(Rect::new(0, 0, 1, 1), -40_000, 0).is_err());
        assert!(CopyGeometry::new(Rect::new(0, 0, 4_294_967_279, 8), 0, 0).is_err());
    }
}
