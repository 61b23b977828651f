//! hawker daemon binary.
//!
//! With no subcommand it runs the pipeline forever under supervision;
//! `run-once`, `status`, and `health` cover one-shot runs and inspection.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use hk_capabilities::CapabilityRegistry;
use hk_core::config::Config;
use hk_core::reports::ReportStore;
use hk_daemon::{DaemonSupervisor, HealthMonitor};
use hk_pipeline::{ExecutorSettings, PipelineExecutor};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// hawker -- supervised digital product listing automation.
#[derive(Parser)]
#[command(name = "hawker", version, about)]
struct Cli {
    /// Config file path. Defaults to ~/.hawker/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON, for log shippers.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single supervised cycle and exit (default runs forever).
    RunOnce,

    /// Print the persisted daemon status as JSON.
    Status,

    /// Probe resources and connectivity, print a health snapshot.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        hk_telemetry::init_logging_json("hawker", "info");
    } else {
        hk_telemetry::init_logging("hawker", "info");
    }

    let config = load_config(cli.config);

    match cli.command {
        None => run_forever(config).await,
        Some(Command::RunOnce) => run_once(config).await,
        Some(Command::Status) => show_status(&config),
        Some(Command::Health) => show_health(&config).await,
    }
}

/// Load config from the given path, or the default location, falling back
/// to defaults when loading fails.
fn load_config(path: Option<PathBuf>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        Config::default()
    })
}

fn build_executor(config: &Config) -> PipelineExecutor {
    let capabilities = CapabilityRegistry::build(config);
    let missing = capabilities.missing();
    if !missing.is_empty() {
        warn!(missing = ?missing, "some capabilities are absent, their phases will degrade");
    }
    PipelineExecutor::new(capabilities, ExecutorSettings::from_config(config))
}

async fn run_forever(config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "hawker daemon starting"
    );

    let executor = build_executor(&config);
    let mut supervisor = DaemonSupervisor::new(config, Box::new(executor));
    let stop = supervisor.stop_handle();

    // Wire ctrl-c to a graceful stop: the current cycle finishes and the
    // status file records the shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("ctrl-c received, stopping after the current cycle");
        stop.request_stop();
    });

    supervisor.run().await?;
    Ok(())
}

/// One cycle, then exit. Phase errors are recorded in the report and do not
/// affect the exit code; only failing to persist does.
async fn run_once(config: Config) -> anyhow::Result<()> {
    let executor = build_executor(&config);
    let mut supervisor = DaemonSupervisor::new(config, Box::new(executor));

    let result = supervisor.run_once().await?;
    info!(
        cycle = %result.cycle_id,
        errors = result.error_count(),
        deployments = result.deployments_succeeded(),
        price = result.list_price_usd,
        "cycle finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn show_status(config: &Config) -> anyhow::Result<()> {
    let store = ReportStore::for_config(config);
    match store.read_status()? {
        Some(status) => println!("{}", serde_json::to_string_pretty(&status)?),
        None => println!("no status file at {}; the daemon has not run yet", config.status_path().display()),
    }
    Ok(())
}

async fn show_health(config: &Config) -> anyhow::Result<()> {
    let monitor = HealthMonitor::new(&config.health);
    let snapshot = monitor.sample().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
