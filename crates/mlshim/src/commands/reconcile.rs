//! Reconcile command - promotes serving jobs whose endpoints came up.

use core::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use database::{PgPool, PgStore};
use orchestrator::Reconciler;
use platform_client::HttpPlatformClient;

use super::print_json;

/// Runs one sweep, or sweeps every `interval` until Ctrl-C with `watch`.
///
/// # Errors
///
/// Returns an error if the platform client cannot be created or a single
/// sweep fails.
pub async fn run(config: &Config, pool: PgPool, watch: bool, interval: Duration) -> Result<()> {
    let platform =
        HttpPlatformClient::new(&config.platform).context("Failed to create platform client")?;
    let reconciler = Reconciler::new(PgStore::new(pool), platform);

    if watch {
        reconciler.run(interval).await;
        return Ok(());
    }

    let report = reconciler.sweep().await?;
    print_json(&report)
}
