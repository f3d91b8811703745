//! `PostgreSQL` implementation of [`RecordStore`].

use ml_structs::{Endpoint, Job, JobStatus, Project, ProjectModel};
use sqlx::PgPool;
use tracing::debug;

use crate::{Promotion, RecordStore, StoreError, StoreResult, endpoint, job, project, project_model};

/// Record store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn variant_key(model: &ProjectModel) -> String {
    format!("{}/{}", model.project_name, model.variant_name)
}

impl RecordStore for PgStore {
    async fn get_project(&self, project_name: &str) -> StoreResult<Option<Project>> {
        Ok(project::find_project(&self.pool, project_name).await?)
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<Project> {
        project::insert_project(&self.pool, project)
            .await?
            .ok_or_else(|| StoreError::duplicate("project", &project.project_name))
    }

    async fn update_project(&self, project: &Project) -> StoreResult<Project> {
        project::update_project(&self.pool, project)
            .await?
            .ok_or_else(|| StoreError::conflict("project", &project.project_name))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(project::list_projects(&self.pool).await?)
    }

    async fn get_project_model(
        &self,
        project_name: &str,
        variant_name: &str,
    ) -> StoreResult<Option<ProjectModel>> {
        Ok(project_model::find_project_model(&self.pool, project_name, variant_name).await?)
    }

    async fn insert_project_model(&self, model: &ProjectModel) -> StoreResult<ProjectModel> {
        project_model::insert_project_model(&self.pool, model)
            .await?
            .ok_or_else(|| StoreError::duplicate("project model", variant_key(model)))
    }

    async fn update_project_model(&self, model: &ProjectModel) -> StoreResult<ProjectModel> {
        project_model::update_project_model(&self.pool, model)
            .await?
            .ok_or_else(|| StoreError::conflict("project model", variant_key(model)))
    }

    async fn list_project_models(&self, project_name: &str) -> StoreResult<Vec<ProjectModel>> {
        Ok(project_model::list_project_models(&self.pool, project_name).await?)
    }

    async fn get_job(&self, job_name: &str) -> StoreResult<Option<Job>> {
        Ok(job::find_job(&self.pool, job_name).await?)
    }

    async fn insert_job(&self, job: &Job) -> StoreResult<Job> {
        job::insert_job(&self.pool, job)
            .await?
            .ok_or_else(|| StoreError::duplicate("job", &job.job_name))
    }

    async fn update_job(&self, job: &Job) -> StoreResult<Job> {
        job::update_job(&self.pool, job)
            .await?
            .ok_or_else(|| StoreError::conflict("job", &job.job_name))
    }

    async fn list_jobs_by_project(&self, project_name: &str) -> StoreResult<Vec<Job>> {
        Ok(job::list_jobs_by_project(&self.pool, project_name).await?)
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        Ok(job::list_jobs_by_status(&self.pool, status).await?)
    }

    async fn put_endpoint(&self, endpoint: &Endpoint) -> StoreResult<Endpoint> {
        Ok(endpoint::upsert_endpoint(&self.pool, endpoint).await?)
    }

    async fn get_endpoint(&self, endpoint_name: &str) -> StoreResult<Option<Endpoint>> {
        Ok(endpoint::find_endpoint(&self.pool, endpoint_name).await?)
    }

    async fn promote(&self, promotion: &Promotion) -> StoreResult<()> {
        // Dropping the transaction on an early return rolls every write back.
        let mut tx = self.pool.begin().await?;

        job::update_job(&mut *tx, &promotion.job)
            .await?
            .ok_or_else(|| StoreError::conflict("job", &promotion.job.job_name))?;

        if let Some(retired) = &promotion.retired {
            job::update_job(&mut *tx, retired)
                .await?
                .ok_or_else(|| StoreError::conflict("job", &retired.job_name))?;
        }

        if let Some(model) = &promotion.project_model {
            project_model::update_project_model(&mut *tx, model)
                .await?
                .ok_or_else(|| StoreError::conflict("project model", variant_key(model)))?;
        }

        if let Some(project) = &promotion.project {
            project::update_project(&mut *tx, project)
                .await?
                .ok_or_else(|| StoreError::conflict("project", &project.project_name))?;
        }

        tx.commit().await?;
        debug!(job_name = %promotion.job.job_name, "Promotion committed");

        Ok(())
    }
}
