mod cli;
mod config;
mod notify;
mod storage;
mod tasks;

use crate::cli::{Command, ConfigCommand, ListArgs, TaskCommand};
use clap::Parser;
use color_eyre::Result;
use taskpad_core::storage::DurableStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    let command = cli
        .command
        .unwrap_or(Command::Task(TaskCommand::List(ListArgs::default())));
    match command {
        Command::Task(cmd) => tasks::handle(cmd, &config).await?,
        Command::Sub(cmd) => tasks::handle_sub(cmd, &config).await?,
        Command::Tags => tasks::handle_tags(&config).await?,
        Command::Notify(cmd) => notify::handle(cmd, &config).await?,
        Command::Health => run_health_check(&config).await?,
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        Command::Version => print_version(),
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("taskpad {}", env!("CARGO_PKG_VERSION"));
}

/// Runs a quick round-trip probe against the durable store.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    run_store_health(&store).await?;
    println!("Storage: ok");
    Ok(())
}

async fn run_store_health<S: DurableStore>(store: &S) -> Result<()> {
    let probe_key = "health/probe";
    let payload = "ok";
    store
        .set(probe_key, payload)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let round_trip = store
        .get(probe_key)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    store
        .remove(probe_key)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    if round_trip.as_deref() != Some(payload) {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
