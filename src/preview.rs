//! Dock preview in a plain window, rendered by the software framebuffer

use anyhow::{Context, Result};
use minifb::{Key, MouseButton, MouseMode, Scale, Window, WindowOptions};
use wmdock_pixmap::Framebuffer;

use crate::dock::{Dock, DockEvent, DOCK_SIZE};

pub fn scale_for(factor: u8) -> Result<Scale> {
    Ok(match factor {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        other => anyhow::bail!("unsupported scale {other} (use 1, 2, 4 or 8)"),
    })
}

pub fn run_preview(mut dock: Dock, scale: u8, interval: std::time::Duration) -> Result<()> {
    let mut fb = Framebuffer::new(DOCK_SIZE, DOCK_SIZE);
    dock.start(&mut fb)?;

    let mut window = Window::new(
        "wmdock preview",
        DOCK_SIZE,
        DOCK_SIZE,
        WindowOptions {
            scale: scale_for(scale)?,
            ..Default::default()
        },
    )
    .context("failed to create window")?;
    window.set_target_fps(60);
    eprintln!("wmdock preview - Esc to close");

    let mut was_down = false;
    let mut last_redraw = std::time::Instant::now();
    while window.is_open() && !window.is_key_down(Key::Escape) {
        let down = window.get_mouse_down(MouseButton::Left);
        if was_down && !down {
            if let Some((x, y)) = window.get_mouse_pos(MouseMode::Discard) {
                let event = DockEvent::ButtonRelease {
                    x: x as i32,
                    y: y as i32,
                    button: 1,
                };
                dock.handle(&mut fb, event)?;
            }
        }
        was_down = down;

        if last_redraw.elapsed() >= interval {
            dock.redraw(&mut fb)?;
            last_redraw = std::time::Instant::now();
        }
        window.update_with_buffer(&fb.canvas(), DOCK_SIZE, DOCK_SIZE)?;
    }

    eprintln!("preview closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_for() {
        assert!(matches!(scale_for(1).unwrap(), Scale::X1));
        assert!(matches!(scale_for(8).unwrap(), Scale::X8));
        assert!(scale_for(3).is_err());
    }
}
