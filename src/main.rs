//! RideVis - Main Entry Point
//!
//! Starts the telemetry link (or the offline session store), restores the
//! last CSV recording and opens the viewer.
//!
//! Usage: `ridevis-rs [recording.csv]`

use anyhow::Context;
use ridevis_rs::{
    backend::{LiveBackend, LocalSource, TelemetrySource},
    config::{self, AppConfig, AppState},
    controller::RideController,
    frontend::RideVisApp,
    session::LocalSessionStore,
};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Console logging plus a daily rolling file in the app data directory.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ridevis_rs=debug"));

    let file = config::logs_dir().and_then(|dir| match std::fs::create_dir_all(&dir) {
        Ok(()) => Some(tracing_appender::non_blocking(
            tracing_appender::rolling::daily(dir, "ridevis.log"),
        )),
        Err(e) => {
            eprintln!("File logging disabled: {}", e);
            None
        }
    });

    match file {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();
    tracing::info!("Starting RideVis");

    let config = AppConfig::load_or_default(config::config_path());
    let app_state = AppState::load_or_default();

    // Live link when enabled, otherwise sessions come from the local store
    let (source, link_thread) = if config.link.enabled {
        let (backend, handle) = LiveBackend::new(config.link.clone());
        let thread = backend.spawn().context("Failed to start the telemetry link")?;
        (Box::new(handle) as Box<dyn TelemetrySource>, Some(thread))
    } else {
        let dir = config::sessions_dir().context("Could not determine the sessions directory")?;
        let store = LocalSessionStore::open(dir)?;
        tracing::info!("Link disabled, using local sessions in {:?}", store.dir());
        (
            Box::new(LocalSource::new(Box::new(store))) as Box<dyn TelemetrySource>,
            None,
        )
    };

    let mut controller = RideController::new(source, &config);

    let csv_path: Option<PathBuf> = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.playback.csv_path.clone())
        .or_else(|| app_state.last_csv().map(|p| p.to_path_buf()));
    if let Some(path) = csv_path {
        match controller.load_csv(&path) {
            Ok(()) => tracing::info!("Playing CSV recording {:?}", path),
            Err(e) => tracing::warn!("Failed to load CSV {:?}: {}", path, e),
        }
    }
    if !config.link.enabled {
        controller.request_sessions();
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("RideVis"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "RideVis",
        native_options,
        Box::new(|cc| Ok(Box::new(RideVisApp::new(cc, controller, app_state)))),
    );

    // The controller (and with it the link handle) is gone; the worker sees
    // its command channel close and exits
    tracing::info!("Shutting down...");
    drop(link_thread);

    result.map_err(|e| anyhow::anyhow!("Viewer failed: {}", e))
}
