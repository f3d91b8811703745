//! Repository functions for job operations.

use ml_structs::{Job, JobStatus};
use sqlx::{PgExecutor, PgPool};

/// Finds a job by name.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_job(pool: &PgPool, job_name: &str) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        SELECT job_name, job_type, project_name, variant_name, endpoint_status, image, spec, env, data_input, model_output, model_artifacts, model_arn, endpoint_config_arn, timestamp_queued, time_updated, version
        FROM jobs
        WHERE job_name = $1
        ",
    )
    .bind(job_name)
    .fetch_optional(pool)
    .await
}

/// Inserts a job, returning `None` if the name is already taken.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_job(pool: &PgPool, job: &Job) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        INSERT INTO jobs (job_name, job_type, project_name, variant_name, endpoint_status, image, spec, env, data_input, model_output, model_artifacts, model_arn, endpoint_config_arn, timestamp_queued, time_updated, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW(), 1)
        ON CONFLICT (job_name) DO NOTHING
        RETURNING job_name, job_type, project_name, variant_name, endpoint_status, image, spec, env, data_input, model_output, model_artifacts, model_arn, endpoint_config_arn, timestamp_queued, time_updated, version
        ",
    )
    .bind(&job.job_name)
    .bind(job.job_type)
    .bind(&job.project_name)
    .bind(&job.variant_name)
    .bind(job.endpoint_status)
    .bind(&job.image)
    .bind(&job.spec)
    .bind(&job.env)
    .bind(&job.data_input)
    .bind(&job.model_output)
    .bind(&job.model_artifacts)
    .bind(&job.model_arn)
    .bind(&job.endpoint_config_arn)
    .bind(job.timestamp_queued)
    .fetch_optional(pool)
    .await
}

/// Replaces a job if its stored version still matches.
///
/// The job type, project and variant are fixed at creation and never rewritten.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn update_job<'e>(executor: impl PgExecutor<'e>, job: &Job) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        UPDATE jobs
        SET
            endpoint_status = $2,
            image = $3,
            spec = $4,
            env = $5,
            data_input = $6,
            model_output = $7,
            model_artifacts = $8,
            model_arn = $9,
            endpoint_config_arn = $10,
            time_updated = NOW(),
            version = version + 1
        WHERE job_name = $1 AND version = $11
        RETURNING job_name, job_type, project_name, variant_name, endpoint_status, image, spec, env, data_input, model_output, model_artifacts, model_arn, endpoint_config_arn, timestamp_queued, time_updated, version
        ",
    )
    .bind(&job.job_name)
    .bind(job.endpoint_status)
    .bind(&job.image)
    .bind(&job.spec)
    .bind(&job.env)
    .bind(&job.data_input)
    .bind(&job.model_output)
    .bind(&job.model_artifacts)
    .bind(&job.model_arn)
    .bind(&job.endpoint_config_arn)
    .bind(job.version)
    .fetch_optional(executor)
    .await
}

/// Lists all jobs of a project, newest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_jobs_by_project(pool: &PgPool, project_name: &str) -> Result<Vec<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        SELECT job_name, job_type, project_name, variant_name, endpoint_status, image, spec, env, data_input, model_output, model_artifacts, model_arn, endpoint_config_arn, timestamp_queued, time_updated, version
        FROM jobs
        WHERE project_name = $1
        ORDER BY timestamp_queued DESC, job_name
        ",
    )
    .bind(project_name)
    .fetch_all(pool)
    .await
}

/// Lists all jobs in the given status, oldest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_jobs_by_status(pool: &PgPool, status: JobStatus) -> Result<Vec<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        SELECT job_name, job_type, project_name, variant_name, endpoint_status, image, spec, env, data_input, model_output, model_artifacts, model_arn, endpoint_config_arn, timestamp_queued, time_updated, version
        FROM jobs
        WHERE endpoint_status = $1
        ORDER BY timestamp_queued, job_name
        ",
    )
    .bind(status)
    .fetch_all(pool)
    .await
}
