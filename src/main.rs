use anyhow::{Context, Result};
use clap::Parser;
use dv_router::{start_tasks, DaemonSettings, RouterEngine};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dv_router", about = "Distance-vector routing daemon")]
struct Cli {
    /// Link file: own router id on line 1, then `neighbor,cost` lines.
    config: PathBuf,

    /// JSON daemon settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Seconds between config reloads.
    #[arg(long)]
    reload_interval: Option<f64>,

    #[arg(long)]
    base_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => DaemonSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => DaemonSettings::default(),
    };
    if let Some(path) = cli.status_file {
        settings.status_file = Some(path);
    }
    if let Some(secs) = cli.reload_interval {
        settings.reload_interval_secs = secs;
    }
    if let Some(port) = cli.base_port {
        settings.base_port = port;
    }

    let interval = settings.reload_interval()?;

    info!(
        "Starting router from {} (base port {}, reload every {:?})",
        cli.config.display(),
        settings.base_port,
        interval
    );

    let engine = Arc::new(RouterEngine::new(cli.config, settings));
    let handle = start_tasks(engine).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.stop().await;

    Ok(())
}
