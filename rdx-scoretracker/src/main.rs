use anyhow::{Context, Result};
use scoretracker::config::WatchConfig;
use scoretracker::prelude::*;
use scoretracker::source::HttpSource;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "scorewatch.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load the configuration: optional TOML file, then SCOREWATCH__* overrides.
    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = WatchConfig::load(&path)
        .with_context(|| format!("Invalid configuration (file: {path})"))?;

    // 3. Create the tracker and the page source.
    let tracker = ScoreTracker::new(config.tracker)?;
    let source = HttpSource::new(&config.source)?;

    // 4. Log every event the tracker announces.
    spawn_event_listener(&tracker);

    // 5. Stop cleanly on Ctrl+C.
    let handle = tracker.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received.");
            handle.stop();
        }
    });

    // 6. Run until stopped.
    tracker.run(source).await?;

    Ok(())
}

/// Spawns a task that subscribes to the tracker's event stream.
fn spawn_event_listener(tracker: &ScoreTracker) {
    let mut events = tracker.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                TrackerEvent::Game(game) => match game.winner() {
                    Some(winner) => info!("[GAME] {} => {} wins", game, winner.name()),
                    None => info!("[GAME] {}", game),
                },
                TrackerEvent::ScheduleSet { delay_ms, wake_at, reason } => info!(
                    "[SCHEDULE] {} => next parse in {} ms at {}",
                    reason,
                    delay_ms,
                    wake_at.format("%F %T %Z")
                ),
                TrackerEvent::Stopped => info!("[SYSTEM] => tracker stopped"),
            }
        }
    });
}
