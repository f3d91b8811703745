//! Record store for the ML control plane.
//!
//! [`RecordStore`] is the contract the orchestrator codes against. [`PgStore`]
//! backs it with `PostgreSQL`; [`InMemoryStore`] keeps everything in process.

pub use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

mod endpoint;
mod error;
pub mod in_memory;
mod job;
mod pg;
mod project;
mod project_model;
mod store;

pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryStore;
pub use pg::PgStore;
pub use store::{Promotion, RecordStore};

/// Creates a connection pool whose connections work inside `schema`.
///
/// The schema is created on first connect if it does not exist yet.
///
/// # Errors
///
/// Returns an error if the connection to the database fails.
pub async fn create_pool(
    database_url: &str,
    schema: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let quoted = format!("\"{}\"", schema.replace('"', "\"\""));
    let statement = format!("CREATE SCHEMA IF NOT EXISTS {quoted}; SET search_path TO {quoted}");

    PgPoolOptions::new()
        .max_connections(max_connections)
        .after_connect(move |conn, _meta| {
            let statement = statement.clone();
            Box::pin(async move {
                sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&statement)).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns an error if running migrations fails.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
