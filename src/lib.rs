pub mod analytics;
pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod manager;
pub mod notification;
pub mod state;
pub mod surface;
pub mod tasks;
pub mod ui;
pub mod view;
pub use error::{AppError, AppResult};

use std::path::PathBuf;

/// Entrypoint used by the binary; the first argument, when given, names a guide file.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting taskdock");

    let config = config::load_app_config();
    let guide_path = std::env::args_os().nth(1).map(PathBuf::from);
    if let Some(path) = guide_path.as_ref() {
        tracing::info!(path = %path.display(), "loading guide");
    }

    let app = app::App::new(config, guide_path);
    app.start()?;

    tracing::info!("taskdock exited");
    Ok(())
}
