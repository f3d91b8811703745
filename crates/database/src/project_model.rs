//! Repository functions for per-variant model settings.

use ml_structs::ProjectModel;
use sqlx::{PgExecutor, PgPool};

/// Finds the settings of one variant.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_project_model(
    pool: &PgPool,
    project_name: &str,
    variant_name: &str,
) -> Result<Option<ProjectModel>, sqlx::Error> {
    sqlx::query_as::<_, ProjectModel>(
        r"
        SELECT project_name, variant_name, image_train, image_serve, spec_train, spec_serve, env_train, env_serve, hyperparameters, latest_model, time_updated, version
        FROM project_models
        WHERE project_name = $1 AND variant_name = $2
        ",
    )
    .bind(project_name)
    .bind(variant_name)
    .fetch_optional(pool)
    .await
}

/// Inserts variant settings, returning `None` if the variant already exists.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_project_model(
    pool: &PgPool,
    model: &ProjectModel,
) -> Result<Option<ProjectModel>, sqlx::Error> {
    sqlx::query_as::<_, ProjectModel>(
        r"
        INSERT INTO project_models (project_name, variant_name, image_train, image_serve, spec_train, spec_serve, env_train, env_serve, hyperparameters, latest_model, time_updated, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), 1)
        ON CONFLICT (project_name, variant_name) DO NOTHING
        RETURNING project_name, variant_name, image_train, image_serve, spec_train, spec_serve, env_train, env_serve, hyperparameters, latest_model, time_updated, version
        ",
    )
    .bind(&model.project_name)
    .bind(&model.variant_name)
    .bind(&model.image_train)
    .bind(&model.image_serve)
    .bind(&model.spec_train)
    .bind(&model.spec_serve)
    .bind(&model.env_train)
    .bind(&model.env_serve)
    .bind(&model.hyperparameters)
    .bind(&model.latest_model)
    .fetch_optional(pool)
    .await
}

/// Replaces variant settings if the stored version still matches.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn update_project_model<'e>(
    executor: impl PgExecutor<'e>,
    model: &ProjectModel,
) -> Result<Option<ProjectModel>, sqlx::Error> {
    sqlx::query_as::<_, ProjectModel>(
        r"
        UPDATE project_models
        SET
            image_train = $3,
            image_serve = $4,
            spec_train = $5,
            spec_serve = $6,
            env_train = $7,
            env_serve = $8,
            hyperparameters = $9,
            latest_model = $10,
            time_updated = NOW(),
            version = version + 1
        WHERE project_name = $1 AND variant_name = $2 AND version = $11
        RETURNING project_name, variant_name, image_train, image_serve, spec_train, spec_serve, env_train, env_serve, hyperparameters, latest_model, time_updated, version
        ",
    )
    .bind(&model.project_name)
    .bind(&model.variant_name)
    .bind(&model.image_train)
    .bind(&model.image_serve)
    .bind(&model.spec_train)
    .bind(&model.spec_serve)
    .bind(&model.env_train)
    .bind(&model.env_serve)
    .bind(&model.hyperparameters)
    .bind(&model.latest_model)
    .bind(model.version)
    .fetch_optional(executor)
    .await
}

/// Lists all variants of a project.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_project_models(
    pool: &PgPool,
    project_name: &str,
) -> Result<Vec<ProjectModel>, sqlx::Error> {
    sqlx::query_as::<_, ProjectModel>(
        r"
        SELECT project_name, variant_name, image_train, image_serve, spec_train, spec_serve, env_train, env_serve, hyperparameters, latest_model, time_updated, version
        FROM project_models
        WHERE project_name = $1
        ORDER BY variant_name
        ",
    )
    .bind(project_name)
    .fetch_all(pool)
    .await
}
