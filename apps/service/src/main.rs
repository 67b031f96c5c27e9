use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use uptime_service::{Config, Engine};

/// Background engine of the uptime checker
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file, defaults to $XDG_CONFIG_HOME/uptime/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Run a single check cycle and rotation pass, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    logger::init_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO });

    let mut config = Config::from_config(cli.config.as_ref())?;
    config.apply_env_overrides();

    if cli.print_config {
        println!("{config}");
        return Ok(());
    }

    let engine = Engine::from_config(&config)?;

    if cli.once {
        let cycle = engine.run_check_cycle().await;
        let report = cycle.report;
        let processed = cycle.finish().await;
        let alerts = processed.iter().filter(|p| p.alert).count();
        info!(listed = report.listed, rejected = report.rejected, probed = processed.len(), alerts, "Check cycle done");

        let rotation = engine.rotate_logs().await;
        info!(rotated = rotation.rotated.len(), failed = rotation.failed.len(), "Log rotation done");
        return Ok(());
    }

    let handle = engine.start();
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.shutdown().await;

    Ok(())
}
