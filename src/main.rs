//! wmdock - text lines in a WindowMaker dock tile
//!
//! Everything visible is drawn from one composited XPM pixmap: the
//! beveled tile, a blank eraser block and the font charset.
//!
//! ```text
//! wmdock run                  → dock tile on $DISPLAY
//! wmdock preview --scale 4    → same tile in a normal window
//! wmdock compose -o dock.xpm  → write the composite pixmap
//! ```

mod assets;
mod config;
mod dock;
mod preview;
mod x11;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use wmdock_pixmap::{ColorLookup, ColorResolver};

use config::{Config, Overrides};
use dock::{Dock, DOCK_SIZE};

#[derive(Parser)]
#[command(name = "wmdock")]
#[command(about = "WindowMaker dockapp rendering text lines from a composited pixmap")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/wmdock/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the dock window and render the configured lines
    Run {
        /// X display (default: $DISPLAY)
        #[arg(short, long)]
        display: Option<String>,
    },

    /// Write the composite pixmap as an XPM document
    Compose {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the dock in a regular window, no WindowMaker needed
    Preview {
        /// Pixel scale: 1, 2, 4 or 8
        #[arg(short, long, default_value = "4")]
        scale: u8,
    },

    /// Resolve a color name through the color database
    Color {
        /// Color name, e.g. "light sea green"
        name: String,
    },

    /// List bundled fonts
    Fonts,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wmdock=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply(&cli.overrides);
    let colors = ColorResolver::from_files(&config.rgb_files[..]);
    let interval = Duration::from_millis(config.update_interval_ms);

    match cli.command {
        Commands::Run { display } => {
            let mut window = x11::X11Backend::open(
                display.as_deref(),
                DOCK_SIZE as u16,
                DOCK_SIZE as u16,
                "wmdock",
            )?;
            let image = dock::build_image(&config, &colors.with_backend(&window))?;
            let mut dock = Dock::new(image, &config.lines, config.margin)?;
            dock.run(&mut window, interval)
        }
        Commands::Compose { output } => {
            let image = dock::build_image(&config, &colors)?;
            let document = image.to_document("wmdock");
            match output {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("wrote {}", path.display());
                }
                None => print!("{document}"),
            }
            Ok(())
        }
        Commands::Preview { scale } => {
            let image = dock::build_image(&config, &colors)?;
            let dock = Dock::new(image, &config.lines, config.margin)?;
            preview::run_preview(dock, scale, interval)
        }
        Commands::Color { name } => {
            if let Some(source) = colors.source() {
                eprintln!("color database: {}", source.display());
            }
            let hex = colors.lookup(&name)?;
            println!("{}", colors.normalize(&hex));
            Ok(())
        }
        Commands::Fonts => {
            for (name, text) in assets::bundled_fonts() {
                let size = assets::load_font(name)
                    .and_then(|font| Ok(font.glyph_size()?))
                    .map(|(w, h)| format!("{w}x{h}"))
                    .unwrap_or_else(|_| "?".into());
                println!("{name}\t{size}\t{} bytes", text.len());
            }
            Ok(())
        }
    }
}
