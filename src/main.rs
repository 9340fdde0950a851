//! DirVis headless driver
//!
//! Builds the demo processing network, loads a procedural dataset through
//! the command queue and renders a fixed number of frames without a window.
//!
//! Usage: `dirvis [--config <settings.json|settings.toml>]`

use dirvis_rs::{app::Application, config::AppConfig, logging};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Grid resolution of the demo surface.
const DEMO_RESOLUTION: u32 = 128;

fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn main() -> ExitCode {
    let config = match config_path() {
        Some(path) => match AppConfig::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::load_or_default(),
    };

    let _log_guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting DirVis");
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: AppConfig) -> dirvis_rs::Result<()> {
    let app = Application::new(config);
    let (ids, surface, lines) = app.build_demo_network()?;
    app.start()?;

    let load = app.load_demo_data(surface, lines, DEMO_RESOLUTION)?;
    let summary = app.run_frames();
    tracing::info!(
        "Rendered {} frames of {} visualizations ({} network events), demo data {}",
        summary.frames,
        summary.visualizations,
        summary.network_events,
        load.status()
    );

    if !app.wait_until_settled(&[ids.render_triangles, ids.render_lines], Duration::from_secs(1)) {
        tracing::warn!("Network still busy at shutdown");
    }
    app.shutdown();
    Ok(())
}
