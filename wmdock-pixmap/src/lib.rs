//! wmdock-pixmap - composite pixmaps for WindowMaker dockapps
//!
//! A dockapp renders everything from one uploaded pixmap: the window
//! background, blank eraser areas and the font charsets live stacked in it,
//! and text is drawn by copying glyph cells onto the visible area.
//!
//! ```text
//! xpm::decode ─┐
//!              ├─> Composer::compose ─> CompositeImage ─> GraphicsBackend::upload_pixmap
//! fonts ───────┘        (merge)               │
//!                                             └─> glyph::draw_string ─> GraphicsBackend::blit
//! ```

pub mod backend;
pub mod color;
pub mod compose;
pub mod error;
pub mod glyph;
pub mod merge;
pub mod palette;
pub mod xpm;

pub use backend::{BackendCall, Framebuffer, GraphicsBackend, RecordingBackend, Rect};
pub use color::{ColorLookup, ColorResolver};
pub use compose::{Composer, CompositeImage, FontFragment, FontMetrics, Style};
pub use error::{PixmapError, Result};
pub use glyph::{draw_char, draw_string};
pub use palette::{Bitmap, Fragment, Palette};
