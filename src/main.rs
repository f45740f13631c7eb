use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use honeylog::backup::BackupScheduler;
use honeylog::clock::{Clock, SystemClock};
use honeylog::config::HoneylogConfig;
use honeylog::http::HttpServer;
use honeylog::pipeline::LoginPipeline;

/// Credential-capture login honeypot.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// YAML configuration file (HONEYLOG__* environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Honeylog");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = HoneylogConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let pipeline = Arc::new(LoginPipeline::from_config(&config, clock.clone()).await?);
    info!("Login pipeline initialized");

    // The scheduler shares no in-memory state with the pipeline; it is
    // abandoned on shutdown.
    if config.backup.enabled {
        let scheduler = BackupScheduler::from_config(&config, clock);
        tokio::spawn(scheduler.run());
    } else {
        info!("Backups disabled");
    }

    HttpServer::new(config.server.listen_addr, pipeline)
        .with_static_dir(config.server.static_dir.clone())
        .trust_forwarded_header(config.server.trust_forwarded_header)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Honeylog stopped");
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
