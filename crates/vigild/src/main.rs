//! vigild — Vigil liveness and traffic monitoring daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use vigil_core::{MonitorEvent, VigilConfig};
use vigil_services::RoomDirectory;

mod tasks;

const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = VigilConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = VigilConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        VigilConfig::default()
    });
    let defaults = config.keepalive.to_config();
    tracing::info!(
        interval_ms = defaults.interval_ms(),
        timeout_ms = defaults.timeout_ms(),
        "vigild starting"
    );

    // ── Engine ───────────────────────────────────────────────────────────────
    let (event_tx, event_rx) = mpsc::unbounded_channel::<MonitorEvent>();
    let directory = Arc::new(RoomDirectory::new(Handle::current(), Arc::new(event_tx)));

    for room in &config.rooms.preload {
        directory
            .create_room(room, defaults)
            .with_context(|| format!("failed to preload room {room}"))?;
        directory
            .start(room)
            .with_context(|| format!("failed to start keepalive for room {room}"))?;
    }
    if !config.rooms.preload.is_empty() {
        tracing::info!(rooms = ?config.rooms.preload, "rooms preloaded");
    }

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────
    let event_task = tokio::spawn(tasks::event_logger(event_rx));

    let bitrate_task = tokio::spawn(tasks::bitrate_refresher(
        directory.clone(),
        tasks::BITRATE_REFRESH,
        shutdown_tx.subscribe(),
    ));

    let api_task = if config.api.enabled {
        let state = vigil_api::ApiState {
            directory: directory.clone(),
            keepalive: config.keepalive.clone(),
            shutdown_tx: shutdown_tx.clone(),
        };
        let port = config.api.port;
        Some(tokio::spawn(async move {
            if let Err(e) = vigil_api::serve(state, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        }))
    } else {
        tracing::info!("API disabled");
        None
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = bitrate_task       => tracing::error!("bitrate refresher exited: {:?}", r),
    }

    if let Some(task) = api_task {
        task.abort();
    }

    // Stopping a scheduler waits out its current tick.
    let dir = directory.clone();
    tokio::task::spawn_blocking(move || dir.shutdown())
        .await
        .context("room shutdown panicked")?;

    // Rooms hold the event senders; once they are gone the logger drains and ends.
    drop(directory);
    match tokio::time::timeout(EVENT_DRAIN_TIMEOUT, event_task).await {
        Ok(Err(e)) => tracing::warn!(error = %e, "event logger ended abnormally"),
        Err(_) => tracing::debug!("event logger still running at exit"),
        Ok(Ok(())) => {}
    }

    Ok(())
}
