//! Loopwise Player (loopwise-player) - Main entry point
//!
//! Headless practice session: queues the given files, optionally loops an
//! A-B region, and logs session events until Ctrl+C or the queue stops.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use loopwise_common::config::{load_or_default, ConfigFileResolver};
use loopwise_common::events::PracticeEvent;
use loopwise_common::time::{format_position, format_region};
use loopwise_common::{FileId, LoopMode};
use loopwise_player::config::TomlConfig;
use loopwise_player::media::ClockBackend;
use loopwise_player::playback::{PlaybackCoordinator, PlaybackEngine, PlaybackQueue};
use loopwise_player::store::{NullStore, StaticQueueSource};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for loopwise-player
#[derive(Parser, Debug)]
#[command(name = "loopwise-player")]
#[command(about = "Headless A-B loop practice player")]
#[command(version)]
struct Args {
    /// Media files to queue, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Loop mode (off, repeat-one, repeat-all, shuffle, auto-play-next)
    #[arg(short, long)]
    mode: Option<LoopMode>,

    /// Loop start in seconds
    #[arg(long, requires = "b")]
    a: Option<f64>,

    /// Loop end in seconds
    #[arg(long, requires = "a")]
    b: Option<f64>,

    /// Volume level (above 1.0 boosts)
    #[arg(long)]
    volume: Option<f32>,

    /// Resume position in seconds for the first file
    #[arg(long)]
    resume: Option<f64>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = ConfigFileResolver::new().resolve(args.config.as_deref());
    let (config, config_error): (TomlConfig, _) = load_or_default(config_path.as_deref());

    // Initialize tracing
    let default_filter = format!(
        "loopwise_player={0},loopwise_common={0}",
        config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match (&config_path, config_error) {
        (Some(path), Some(e)) => warn!("Ignoring config {}: {}", path.display(), e),
        (Some(path), None) => info!("Loaded config from {}", path.display()),
        (None, _) => info!("No config file found, using defaults"),
    }
    let config = config.validated();

    info!("Starting Loopwise player with {} file(s)", args.files.len());

    let engine = Arc::new(PlaybackEngine::new(
        Arc::new(config.source_resolver()),
        Arc::new(ClockBackend::new()),
        config.to_engine_config(),
    ));

    let files: Vec<FileId> = args
        .files
        .iter()
        .map(|path| FileId::new(path.to_string_lossy()))
        .collect();
    let first = files.first().cloned().context("No files given")?;

    let queue = PlaybackQueue::new(args.mode.unwrap_or_else(|| config.loop_mode()));
    let mut coordinator = PlaybackCoordinator::new(
        engine,
        queue,
        Arc::new(NullStore),
        Arc::new(StaticQueueSource::new(files)),
        config.to_coordinator_config(),
    )
    .context("Failed to create coordinator")?;

    tokio::spawn(log_events(coordinator.subscribe()));

    coordinator
        .open_file(first.clone(), args.resume.unwrap_or(0.0))
        .await
        .with_context(|| format!("Failed to open {}", first))?;

    if let (Some(a), Some(b)) = (args.a, args.b) {
        if !coordinator.mark_region(a, b) {
            warn!("Ignoring loop region {}: B must lie after A", format_region(a, b));
        } else if args.resume.is_none() {
            coordinator.seek(a).await;
        }
    }

    if let Some(level) = args.volume {
        let outcome = coordinator.set_volume(level).await;
        debug!("Volume {:.2}: {:?}", level, outcome);
    }

    coordinator.play().await;
    coordinator.run(shutdown_signal()).await;
    coordinator.shutdown().await;

    info!("Practice session finished");
    Ok(())
}

/// Log UI events until the bus closes
async fn log_events(mut rx: broadcast::Receiver<PracticeEvent>) {
    loop {
        match rx.recv().await {
            Ok(PracticeEvent::TimeUpdate { position, duration, .. }) => {
                debug!("{} / {}", format_position(position), format_position(duration));
            }
            Ok(PracticeEvent::Looped { from, to, .. }) => {
                info!("Loop {} -> {}", format_position(from), format_position(to));
            }
            Ok(PracticeEvent::FileChanged { file, .. }) => info!("Now playing {}", file),
            Ok(PracticeEvent::LoadFailed { file, reason, .. }) => {
                warn!("Could not open {}: {}", file, reason)
            }
            Ok(event) => debug!("Event: {}", event.event_type()),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!("Event log lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
