mod anno_log;
mod app;
mod canvas;
mod cfg;
mod error;
mod navigator;
mod store;
#[cfg(test)]
mod test_helpers;

use anno_log::AnnotationLog;
use app::{FatalSlot, SegmentApp, WINDOW_TITLE};
use cfg::{Cfg, Cli};
use clap::Parser;
use eframe::egui;
use error::Result;
use navigator::{discover_images, ImageRing, Navigator};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Cfg::resolve(&cli)?;

    let image_dir = match cfg.image_dir.clone().or_else(|| {
        rfd::FileDialog::new()
            .set_title("Select image folder")
            .pick_folder()
    }) {
        Some(dir) => dir,
        None => {
            info!("no image folder selected");
            return Ok(());
        }
    };

    let Some(ring) = ImageRing::new(discover_images(&image_dir)?) else {
        info!("no images found in {image_dir:?}");
        return Ok(());
    };
    info!("found {} image(s) in {image_dir:?}", ring.len());

    let log = AnnotationLog::new(&cfg.log_file);
    let nav = Navigator::start(ring, log, cfg.on_load_failure).inspect_err(|e| error!("{e}"))?;

    let fatal = FatalSlot::default();
    let app_fatal = fatal.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(SegmentApp::new(nav, &cfg, app_fatal)))),
    )?;

    let fatal = fatal.borrow_mut().take();
    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
