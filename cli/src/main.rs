//! Vessel CLI - container server and driver agents.
//!
//! ```text
//! vessel server    -> GasContainer + ThermalDrift + RpcServer, until Ctrl-C
//! vessel producer  -> Agent(Producer) over RemoteContainer
//! vessel consumer  -> Agent(Consumer) over RemoteContainer
//! vessel status    -> one getPressure + isDestroyed round trip
//! ```

use std::fs::{self, File, OpenOptions};
use std::future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vessel_agents::{Agent, AgentExit, Role};
use vessel_config::{Settings, VesselConfig};
use vessel_core::{ContainerPhase, ContainerService, GasContainer, ThermalDrift};
use vessel_rpc::{RemoteContainer, RpcClient, RpcServer};

#[derive(Parser)]
#[command(name = "vessel")]
#[command(about = "Simulated gas container with producer and consumer agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.vessel/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service address, overriding config and VESSEL_ADDR
    #[arg(long, global = true)]
    address: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Host the container and serve it until Ctrl-C.
    Server,
    /// Add mass while pressure is below the producer threshold.
    Producer,
    /// Remove mass while pressure is above the consumer threshold.
    Consumer,
    /// Print the container's pressure and phase once.
    Status,
}

fn init_tracing(log_file: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let mut warning = None;
    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                    .with(env_filter)
                    .init();
                tracing::info!(path = %path.display(), "Logging initialized");
                return;
            }
            Err(e) => {
                warning = Some(format!("Failed to open log file {}: {e}", path.display()));
            }
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

async fn run_server(settings: &Settings) -> Result<()> {
    let container = Arc::new(GasContainer::new(settings.limits));
    let service = Arc::new(ContainerService::new(Arc::clone(&container)));
    let server = RpcServer::bind(settings.address.as_str(), service)
        .await
        .context("starting container service")?;

    let drift = ThermalDrift::spawn(Arc::clone(&container), settings.tick_period);
    tracing::info!(
        tick_ms = settings.tick_period.as_millis() as u64,
        "Gas container service running"
    );

    let served = server.serve(shutdown_signal()).await;
    drift.shutdown().await;

    let state = container.snapshot();
    tracing::info!(
        mass = state.mass,
        temperature = state.temperature,
        phase = %state.phase(),
        "Container service stopped"
    );
    served.context("serving container service")
}

async fn run_agent(role: Role, settings: &Settings) -> Result<()> {
    tracing::info!(addr = %settings.address, "Starting {} client...", role.as_str());
    let remote = RemoteContainer::new(settings.address.clone(), settings.request_timeout);
    let agent = Agent::new(remote, settings.agent(role).clone(), settings.retry.clone());

    match agent.run(shutdown_signal()).await {
        AgentExit::ContainerDestroyed | AgentExit::Shutdown => Ok(()),
        AgentExit::GaveUp {
            failures,
            last_error,
        } => bail!("giving up after {failures} consecutive failures: {last_error}"),
    }
}

async fn print_status(settings: &Settings) -> Result<()> {
    let mut client = RpcClient::connect(&settings.address, settings.request_timeout)
        .await
        .with_context(|| format!("connecting to {}", settings.address))?;
    let pressure = client.get_pressure().await?;
    let phase = if client.is_destroyed().await? {
        ContainerPhase::Destroyed
    } else {
        ContainerPhase::Stable
    };

    println!("pressure: {pressure:.2}");
    println!("phase: {phase}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());

    let config = VesselConfig::load(cli.config.as_deref())?;
    let mut settings = config.resolve()?;
    if let Some(address) = cli.address {
        settings.address = address;
    }

    match cli.command {
        Commands::Server => run_server(&settings).await,
        Commands::Producer => run_agent(Role::Producer, &settings).await,
        Commands::Consumer => run_agent(Role::Consumer, &settings).await,
        Commands::Status => print_status(&settings).await,
    }
}
