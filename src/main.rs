mod app;
mod codec;
mod composite;
mod error;
mod frames;
mod geometry;
mod session;
mod settings;
mod trace;

use eframe::egui;
use std::path::PathBuf;

use app::ReviewApp;
use settings::Settings;

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: merge-review [merged-frames-dir]");
        return Ok(());
    }

    let start_dir = args.get(1).map(PathBuf::from);
    if let Some(dir) = &start_dir {
        if !dir.is_dir() {
            eprintln!("Directory not found: {}", dir.display());
            std::process::exit(1);
        }
    }

    let title = "Merge Review";
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title(title),
        ..Default::default()
    };

    let settings_path = Settings::default_path();
    log::info!("Starting {} (settings: {})", title, settings_path.display());
    eframe::run_native(
        title,
        options,
        Box::new(move |_cc| Ok(Box::new(ReviewApp::new(settings_path, start_dir)))),
    )
}
