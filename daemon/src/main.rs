mod classify;
mod config;
mod daemon;
mod error;
mod event;
mod file_sink;
mod paths;
mod player_monitor;
mod queue_sink;
mod redis_list;
mod router;
mod source;

use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playlogd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        error!("[config] {e:#} (using defaults)");
        config::Config::default()
    });
    let sinks = config.sink_config();

    // ── Sinks and status source ───────────────────────────────────────────────
    let router = daemon::build_router(&sinks).await;
    let (update_tx, status_source) = source::channel(source::UPDATE_CHANNEL_CAPACITY);
    tokio::spawn(player_monitor::run(config.player.clone(), update_tx));

    info!("playlogd v{} started", env!("CARGO_PKG_VERSION"));

    // ── Event loop ────────────────────────────────────────────────────────────
    let context = daemon::DaemonContext::new(status_source, router);
    tokio::select! {
        failure = context.run() => {
            error!("Status source failed: {failure}");
            std::process::exit(1);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
}
