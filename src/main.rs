use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use agenda_throttle::config::ThrottleConfig;
use agenda_throttle::ratelimit::{spawn_cleanup, ActionClass, LimitKey, LimiterSet};
use agenda_throttle::telemetry;

#[derive(Parser, Debug)]
#[command(name = "agenda-throttle", version, about = "Fixed-window action throttle")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hold the limiters in memory and sweep expired windows until shutdown
    Serve,
    /// Run a burst of attempts against one limiter and print each decision
    Simulate {
        /// Limiter to exercise (login, api, upload)
        #[arg(short, long)]
        limiter: ActionClass,
        /// Key to throttle on
        #[arg(short, long)]
        key: String,
        /// Number of attempts to make
        #[arg(short, long, default_value_t = 1)]
        attempts: u32,
    },
    /// Print the effective configuration
    ShowConfig,
}

#[derive(Serialize)]
struct AttemptReport<'a> {
    limiter: ActionClass,
    key: &'a LimitKey,
    attempt: u32,
    allowed: bool,
    remaining: u32,
    reset_time: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ThrottleConfig::load(cli.config.as_deref())?;
    telemetry::init(&config.logging)?;
    match &cli.config {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Configuration loaded from defaults and environment"),
    }

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Simulate {
            limiter,
            key,
            attempts,
        } => simulate(&config, limiter, &key, attempts),
        Command::ShowConfig => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn serve(config: ThrottleConfig) -> anyhow::Result<()> {
    info!("Starting AgendaPRO throttle");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let limiters = Arc::new(LimiterSet::new(&config.limits)?);
    for class in ActionClass::ALL {
        let limiter = limiters.get(class);
        info!(
            limiter = %class,
            max_attempts = limiter.max_attempts(),
            window_ms = limiter.window_ms(),
            "Limiter initialized"
        );
    }

    let cleanup = spawn_cleanup(limiters.clone(), config.cleanup.interval());

    shutdown_signal().await;
    cleanup.abort();

    info!(
        tracked_keys = limiters.tracked_keys(),
        "AgendaPRO throttle stopped"
    );
    Ok(())
}

fn simulate(
    config: &ThrottleConfig,
    class: ActionClass,
    key: &str,
    attempts: u32,
) -> anyhow::Result<()> {
    let limiters = LimiterSet::new(&config.limits)?;
    let key = LimitKey::scoped(class.as_str(), key);

    for attempt in 1..=attempts {
        let allowed = limiters.check(class, key.as_str());
        let status = limiters.get_status(class, key.as_str());
        let report = AttemptReport {
            limiter: class,
            key: &key,
            attempt,
            allowed,
            remaining: status.remaining,
            reset_time: status.reset_time,
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
