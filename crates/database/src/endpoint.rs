//! Repository functions for endpoint bookkeeping.

use ml_structs::Endpoint;
use sqlx::PgPool;

/// Inserts or replaces an endpoint record.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn upsert_endpoint(pool: &PgPool, endpoint: &Endpoint) -> Result<Endpoint, sqlx::Error> {
    sqlx::query_as::<_, Endpoint>(
        r"
        INSERT INTO endpoints (endpoint_name, project_name, job_name, endpoint_config_name, endpoint_arn, time_updated)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (endpoint_name) DO UPDATE
        SET
            project_name = EXCLUDED.project_name,
            job_name = EXCLUDED.job_name,
            endpoint_config_name = EXCLUDED.endpoint_config_name,
            endpoint_arn = COALESCE(EXCLUDED.endpoint_arn, endpoints.endpoint_arn),
            time_updated = NOW()
        RETURNING endpoint_name, project_name, job_name, endpoint_config_name, endpoint_arn, time_updated
        ",
    )
    .bind(&endpoint.endpoint_name)
    .bind(&endpoint.project_name)
    .bind(&endpoint.job_name)
    .bind(&endpoint.endpoint_config_name)
    .bind(&endpoint.endpoint_arn)
    .fetch_one(pool)
    .await
}

/// Finds an endpoint record by name.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_endpoint(pool: &PgPool, endpoint_name: &str) -> Result<Option<Endpoint>, sqlx::Error> {
    sqlx::query_as::<_, Endpoint>(
        r"
        SELECT endpoint_name, project_name, job_name, endpoint_config_name, endpoint_arn, time_updated
        FROM endpoints
        WHERE endpoint_name = $1
        ",
    )
    .bind(endpoint_name)
    .fetch_optional(pool)
    .await
}
