//! `mediasortctl`: load a config, assemble the pipeline and sort.

mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use mediasort_config::{ConfigLoader, ConfigSource, assemble, generate};
use mediasort_core::{Registry, StageContext};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cli::{Cli, Command, GenconfArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Sort => sort(&cli).await,
        Command::Genconf(args) => genconf(&cli, args),
        Command::Version => {
            println!("mediasortctl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn sort(cli: &Cli) -> anyhow::Result<()> {
    let (mut config, source) = ConfigLoader::new()
        .with_path(cli.config.clone())
        .load()
        .context("failed to load configuration")?;
    cli.apply_overrides(&mut config);

    logging::init(&config.log_level, config.log_format)?;
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "config loaded"),
        ConfigSource::Default => warn!("no config file found, running with defaults"),
    }
    if config.dry_run {
        warn!("DRY RUN: no changes will be made");
    }

    let registry = Registry::builtin().context("failed to register stages")?;
    let cancel = CancellationToken::new();
    let ctx = StageContext::new(config.dry_run, cancel.clone());
    let engine = assemble(&config, &registry, &ctx).context("failed to assemble pipeline")?;

    let watcher = tokio::spawn(cancel_on_shutdown(cancel.clone()));
    let result = engine.run(cancel).await;
    watcher.abort();

    result.context("pipeline failed")?;
    info!("sort complete");
    Ok(())
}

fn genconf(cli: &Cli, args: &GenconfArgs) -> anyhow::Result<()> {
    let level = cli.log_level.as_deref().unwrap_or("warn");
    logging::init(level, cli.log_format.unwrap_or_default())?;

    let registry = Registry::builtin().context("failed to register stages")?;
    let rendered = generate(&registry, &args.selection(), args.format)
        .context("failed to generate config")?;
    print!("{rendered}");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM. Stages finish their current record
/// and the queues unwind normally.
async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
    debug!("cancelling pipeline");
    token.cancel();
}
