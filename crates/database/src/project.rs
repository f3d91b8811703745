//! Repository functions for project operations.

use ml_structs::Project;
use sqlx::{PgExecutor, PgPool};

/// Finds a project by name.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_project(pool: &PgPool, project_name: &str) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r"
        SELECT project_name, variants, is_auto_deploy, is_active, serving_endpoint, date_created, time_updated, version
        FROM projects
        WHERE project_name = $1
        ",
    )
    .bind(project_name)
    .fetch_optional(pool)
    .await
}

/// Inserts a project, returning `None` if the name is already taken.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_project(pool: &PgPool, project: &Project) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r"
        INSERT INTO projects (project_name, variants, is_auto_deploy, is_active, serving_endpoint, date_created, time_updated, version)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW(), 1)
        ON CONFLICT (project_name) DO NOTHING
        RETURNING project_name, variants, is_auto_deploy, is_active, serving_endpoint, date_created, time_updated, version
        ",
    )
    .bind(&project.project_name)
    .bind(&project.variants)
    .bind(project.is_auto_deploy)
    .bind(project.is_active)
    .bind(&project.serving_endpoint)
    .fetch_optional(pool)
    .await
}

/// Replaces a project if its stored version still matches.
///
/// Returns `None` when the version moved on or the row is gone.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn update_project<'e>(
    executor: impl PgExecutor<'e>,
    project: &Project,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r"
        UPDATE projects
        SET
            variants = $2,
            is_auto_deploy = $3,
            is_active = $4,
            serving_endpoint = $5,
            time_updated = NOW(),
            version = version + 1
        WHERE project_name = $1 AND version = $6
        RETURNING project_name, variants, is_auto_deploy, is_active, serving_endpoint, date_created, time_updated, version
        ",
    )
    .bind(&project.project_name)
    .bind(&project.variants)
    .bind(project.is_auto_deploy)
    .bind(project.is_active)
    .bind(&project.serving_endpoint)
    .bind(project.version)
    .fetch_optional(executor)
    .await
}

/// Lists all projects by name.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_projects(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r"
        SELECT project_name, variants, is_auto_deploy, is_active, serving_endpoint, date_created, time_updated, version
        FROM projects
        ORDER BY project_name
        ",
    )
    .fetch_all(pool)
    .await
}
