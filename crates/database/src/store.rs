//! Record store contract.

use core::future::Future;

use ml_structs::{Endpoint, Job, JobStatus, Project, ProjectModel};

use crate::StoreResult;

/// Pointer moves applied when a serving job reports healthy.
///
/// Each record carries the version it was read at; the store writes all of
/// them or none.
#[derive(Debug, Clone)]
pub struct Promotion {
    /// Job now in service
    pub job: Job,

    /// Previously promoted job of the same variant, now retired
    pub retired: Option<Job>,

    /// Variant whose `latest_model` now names `job`
    pub project_model: Option<ProjectModel>,

    /// Project whose `serving_endpoint` now names `job`
    pub project: Option<Project>,
}

/// CRUD access to the four record collections.
///
/// Updates are versioned: the record passed in must carry the version it
/// was read at, and the stored copy comes back with the next version.
pub trait RecordStore: Send + Sync {
    /// Finds a project by name, active or not.
    fn get_project(
        &self,
        project_name: &str,
    ) -> impl Future<Output = StoreResult<Option<Project>>> + Send;

    /// Inserts a new project, failing if the name is taken.
    fn insert_project(&self, project: &Project) -> impl Future<Output = StoreResult<Project>> + Send;

    /// Replaces a project read at `project.version`.
    fn update_project(&self, project: &Project) -> impl Future<Output = StoreResult<Project>> + Send;

    /// Lists every project.
    fn list_projects(&self) -> impl Future<Output = StoreResult<Vec<Project>>> + Send;

    /// Finds the stored defaults of one variant.
    fn get_project_model(
        &self,
        project_name: &str,
        variant_name: &str,
    ) -> impl Future<Output = StoreResult<Option<ProjectModel>>> + Send;

    /// Inserts a new variant, failing if it already exists.
    fn insert_project_model(
        &self,
        model: &ProjectModel,
    ) -> impl Future<Output = StoreResult<ProjectModel>> + Send;

    /// Replaces a variant read at `model.version`.
    fn update_project_model(
        &self,
        model: &ProjectModel,
    ) -> impl Future<Output = StoreResult<ProjectModel>> + Send;

    /// Lists the variants of a project.
    fn list_project_models(
        &self,
        project_name: &str,
    ) -> impl Future<Output = StoreResult<Vec<ProjectModel>>> + Send;

    /// Finds a job by name.
    fn get_job(&self, job_name: &str) -> impl Future<Output = StoreResult<Option<Job>>> + Send;

    /// Inserts a new job, failing if the name is taken.
    fn insert_job(&self, job: &Job) -> impl Future<Output = StoreResult<Job>> + Send;

    /// Replaces a job read at `job.version`.
    fn update_job(&self, job: &Job) -> impl Future<Output = StoreResult<Job>> + Send;

    /// Lists jobs of a project across all variants.
    fn list_jobs_by_project(
        &self,
        project_name: &str,
    ) -> impl Future<Output = StoreResult<Vec<Job>>> + Send;

    /// Lists jobs currently in `status`.
    fn list_jobs_by_status(
        &self,
        status: JobStatus,
    ) -> impl Future<Output = StoreResult<Vec<Job>>> + Send;

    /// Inserts or replaces an endpoint record.
    fn put_endpoint(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = StoreResult<Endpoint>> + Send;

    /// Finds an endpoint record by name.
    fn get_endpoint(
        &self,
        endpoint_name: &str,
    ) -> impl Future<Output = StoreResult<Option<Endpoint>>> + Send;

    /// Applies a promotion atomically.
    fn promote(&self, promotion: &Promotion) -> impl Future<Output = StoreResult<()>> + Send;
}
