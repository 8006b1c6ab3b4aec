mod backend_bridge;
mod controller;
mod ui;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use profile_client::load_settings;
use shared::domain::UserRecord;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::{DesktopGuiApp, StartupConfig};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    /// JSON file holding the signed-in user as the backend returned it.
    #[arg(long)]
    user_json: PathBuf,
}

fn load_startup(args: Args) -> Result<StartupConfig> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_base_url = profile_client::config::normalize_base_url(&api_url);
    }
    let raw = fs::read_to_string(&args.user_json)
        .with_context(|| format!("failed to read '{}'", args.user_json.display()))?;
    let user: UserRecord = serde_json::from_str(&raw).context("user json is not a user record")?;
    Ok(StartupConfig { settings, user })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let startup = load_startup(Args::parse())?;

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(startup, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Profile")
            .with_inner_size([480.0, 640.0])
            .with_min_inner_size([360.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Profile",
        options,
        Box::new(|_cc| Ok(Box::new(DesktopGuiApp::new(cmd_tx, ui_rx)))),
    )
    .map_err(|err| anyhow::anyhow!("gui exited with error: {err}"))
}
