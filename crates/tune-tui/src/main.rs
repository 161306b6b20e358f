mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod mpv;
mod theme;
mod widgets;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use tune_core::audio::{spawn_resource_worker, AudioOutput, PlayOutcome, SourceEnded};
use tune_core::catalog::{CatalogClient, CatalogSource};
use tune_core::config::Config;
use tune_core::playback::PlaybackController;

use crate::core::{forward, CoreEvent, CoreMessage, PlayerCore};
use crate::mpv::MpvOutput;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = tune_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tune.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; otherwise debug for us, quiet HTTP client internals.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("tune log: {}", log_path.display());
    tracing::info!("tune starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config: {}; using defaults", e);
        Config::default()
    });

    // ── Channels ─────────────────────────────────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<CoreMessage>(1024);
    let (event_tx, event_rx) = mpsc::channel::<CoreEvent>(1024);
    let (ends_tx, ends_rx) = mpsc::unbounded_channel::<SourceEnded>();
    let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel::<PlayOutcome>();

    // ── Audio resource ───────────────────────────────────────────────────────
    let mpv = Arc::new(MpvOutput::new(config.player.mpv_binary.clone(), ends_tx));
    let output: Arc<dyn AudioOutput> = mpv.clone();
    let resource_tx = spawn_resource_worker(output, outcomes_tx);
    forward(outcomes_rx, event_tx.clone(), CoreEvent::PlayResolved);
    forward(ends_rx, event_tx.clone(), CoreEvent::ResourceEnded);

    // ── Build PlayerCore ─────────────────────────────────────────────────────
    let playback = PlaybackController::new(resource_tx, config.player.auto_advance);
    let source: Arc<dyn CatalogSource> = Arc::new(CatalogClient::new(config.catalog.clone())?);
    let player_core = PlayerCore::new(playback, source, event_tx.clone(), broadcast_tx);

    let core_task = tokio::spawn(async move {
        if let Err(e) = player_core.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let result = app::App::new(event_tx).run(broadcast_rx).await;

    // The app already sent Shutdown; give the core a moment to stop playback.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), core_task).await;
    mpv.shutdown().await;
    tracing::info!("tune exiting");
    result
}
