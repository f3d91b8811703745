//! ML control-plane shim.
//!
//! Registers projects and variants, submits training and serving jobs to the
//! managed ML platform, and promotes serving jobs once their endpoints are
//! healthy.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use orchestrator::JobError;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

use commands::{JobCommand, ProjectCommand, VariantCommand};

/// ML control-plane shim
#[derive(Parser)]
#[command(name = "mlshim")]
#[command(about = "Submit, observe and promote ML training and serving jobs")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,

    /// Register and manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Store and inspect per-variant defaults
    Variant {
        #[command(subcommand)]
        command: VariantCommand,
    },

    /// Submit and inspect training and serving jobs
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },

    /// Advance in-flight serving jobs from their endpoint status
    Reconcile {
        /// Keep sweeping until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Seconds between sweeps in watch mode (default: `RECONCILE_INTERVAL_SECONDS`)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    // Console layer; stdout is reserved for command output
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(file),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}

async fn run(command: Commands) -> Result<()> {
    let config = Config::from_env()?;
    info!(profile = %config.profile, schema = %config.database_schema, "Loaded configuration");

    let pool = database::create_pool(
        &config.database_url,
        &config.database_schema,
        config.database_max_connections,
    )
    .await
    .context("Failed to connect to the record store")?;

    match command {
        Commands::Migrate => {
            database::run_migrations(&pool).await?;
            info!("Migrations completed successfully");
        }
        Commands::Project { command } => {
            commands::project::run(&commands::orchestrator(&config, pool)?, command).await?;
        }
        Commands::Variant { command } => {
            commands::variant::run(&commands::orchestrator(&config, pool)?, command).await?;
        }
        Commands::Job { command } => {
            commands::job::run(&commands::orchestrator(&config, pool)?, command).await?;
        }
        Commands::Reconcile { watch, interval } => {
            let interval = interval.map_or(config.reconcile_interval, core::time::Duration::from_secs);
            commands::reconcile::run(&config, pool, watch, interval).await?;
        }
    }

    Ok(())
}

/// Client-class failures exit with 2, everything else with 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<JobError>() {
        Some(job_error) if job_error.kind().is_client_class() => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
