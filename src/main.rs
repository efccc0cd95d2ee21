mod account;
mod config;
mod error;
mod launch;
mod logging;
mod minecraft;
mod ui;

use anyhow::{Context, Result};
use eframe::NativeOptions;
use log::{error, info};
use tokio::runtime::Runtime;

use config::{ConfigStore, LauncherPaths};
use ui::app::LauncherApp;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn main() -> Result<()> {
    let paths = LauncherPaths::new();
    paths.ensure_data_dir()?;

    logging::init(&paths.log_file);
    info!("Launcher initialized and logging configured.");

    match config::migrate_legacy_config(&paths) {
        Ok(true) => info!("Migrated configuration from the legacy location"),
        Ok(false) => {}
        Err(e) => error!("Failed to migrate legacy configuration: {:#}", e),
    }

    let config = ConfigStore::load(paths.config_file.clone());
    info!(
        "Loaded {} accounts from {}",
        config.accounts().len(),
        config.path().display()
    );

    // Tokio runtime for background work
    let rt = Runtime::new().context("Failed to create runtime")?;
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")?;

    // GUI Options
    let options = NativeOptions {
        initial_window_size: Some(egui::vec2(800.0, 600.0)),
        ..Default::default()
    };

    eframe::run_native(
        "Minecraft Launcher",
        options,
        Box::new(move |cc| Box::new(LauncherApp::new(cc, paths, config, rt, client))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))
}
