//! CLI command implementations.

use anyhow::{Context, Result};
use config::Config;
use database::{PgPool, PgStore};
use orchestrator::Orchestrator;
use platform_client::HttpPlatformClient;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod job;
pub mod project;
pub mod reconcile;
pub mod variant;

pub use job::JobCommand;
pub use project::ProjectCommand;
pub use variant::VariantCommand;

pub type Shim = Orchestrator<PgStore, HttpPlatformClient>;

/// Wires the `PostgreSQL` store and the platform client into an orchestrator.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn orchestrator(config: &Config, pool: PgPool) -> Result<Shim> {
    let platform =
        HttpPlatformClient::new(&config.platform).context("Failed to create platform client")?;
    Ok(Orchestrator::new(
        PgStore::new(pool),
        platform,
        config.deployment.clone(),
    ))
}

/// Parses an inline JSON argument.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Prints a record as pretty JSON with whole floats shown as integers.
///
/// # Errors
///
/// Returns an error if the record cannot be serialized.
pub fn print_json<T: Serialize>(record: &T) -> Result<()> {
    let value = ml_structs::json::to_json_safe(record).context("Failed to serialize output")?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
