use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::Config;
use crate::ingest::Ingest;
use crate::source::BlockSource;
use crate::store::SqlStore;


mod cli;
mod config;
mod ingest;
mod source;
mod store;


#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;


fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = Config::load(&args)?;

    init_tracing(args.debug);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(&config))
}


async fn run(config: &Config) -> anyhow::Result<()> {
    let store = SqlStore::connect(
        &config.database,
        Duration::from_secs(config.insert_timeout_secs),
    )
    .await?;

    let source = BlockSource::new(&config.source_folder, config.shard_width);

    let (stop_sender, stop) = watch::channel(false);
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                let _ = stop_sender.send(true);
            }
            Err(err) => warn!(error = ?err, "unable to install signal handlers"),
        }
    });

    let mut ingest = Ingest::new(config, source.clone(), store, stop);

    let start = ingest.determine_start().await?;
    source.update_retention_marker(start)?;

    info!(start, "starting block ingestion");
    ingest.run(start).await
}


async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
    Ok(())
}


fn init_tracing(debug: bool) {
    use std::io::IsTerminal;

    let default_level = if debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::builder().parse_lossy(
        std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV)
            .unwrap_or(default_level.to_string()),
    );

    if std::io::stdout().is_terminal() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .compact()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    }
}
