//! In-process implementation of [`RecordStore`].
//!
//! Mirrors the `PostgreSQL` semantics (duplicate detection, versioned
//! updates, all-or-nothing promotion) so orchestration logic can run
//! without a database.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use ml_structs::{Endpoint, Job, JobStatus, Project, ProjectModel};
use parking_lot::Mutex;

use crate::{Promotion, RecordStore, StoreError, StoreResult};

/// Records that carry an optimistic concurrency token.
trait Versioned: Clone {
    fn version(&self) -> i64;

    /// Stores `version` and refreshes the update timestamp.
    fn stamp(&mut self, version: i64);
}

impl Versioned for Project {
    fn version(&self) -> i64 {
        self.version
    }

    fn stamp(&mut self, version: i64) {
        self.version = version;
        self.time_updated = Utc::now();
    }
}

impl Versioned for ProjectModel {
    fn version(&self) -> i64 {
        self.version
    }

    fn stamp(&mut self, version: i64) {
        self.version = version;
        self.time_updated = Utc::now();
    }
}

impl Versioned for Job {
    fn version(&self) -> i64 {
        self.version
    }

    fn stamp(&mut self, version: i64) {
        self.version = version;
        self.time_updated = Utc::now();
    }
}

type VariantKey = (String, String);

#[derive(Debug, Default)]
struct Collections {
    projects: BTreeMap<String, Project>,
    project_models: BTreeMap<VariantKey, ProjectModel>,
    jobs: BTreeMap<String, Job>,
    endpoints: BTreeMap<String, Endpoint>,
}

/// Record store held in memory; clones share the same collections.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn variant_key(model: &ProjectModel) -> VariantKey {
    (model.project_name.clone(), model.variant_name.clone())
}

fn matches_version<K: Ord, V: Versioned>(map: &BTreeMap<K, V>, key: &K, record: &V) -> bool {
    map.get(key).is_some_and(|stored| stored.version() == record.version())
}

fn insert_new<K: Ord, V: Versioned>(
    map: &mut BTreeMap<K, V>,
    key: K,
    record: &V,
    conflict: impl FnOnce() -> StoreError,
) -> StoreResult<V> {
    if map.contains_key(&key) {
        return Err(conflict());
    }
    let mut stored = record.clone();
    stored.stamp(1);
    map.insert(key, stored.clone());
    Ok(stored)
}

fn replace<K: Ord, V: Versioned>(
    map: &mut BTreeMap<K, V>,
    key: K,
    record: &V,
    conflict: impl FnOnce() -> StoreError,
) -> StoreResult<V> {
    if !matches_version(map, &key, record) {
        return Err(conflict());
    }
    let mut stored = record.clone();
    stored.stamp(record.version() + 1);
    map.insert(key, stored.clone());
    Ok(stored)
}

impl RecordStore for InMemoryStore {
    async fn get_project(&self, project_name: &str) -> StoreResult<Option<Project>> {
        Ok(self.inner.lock().projects.get(project_name).cloned())
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<Project> {
        let mut inner = self.inner.lock();
        insert_new(
            &mut inner.projects,
            project.project_name.clone(),
            project,
            || StoreError::duplicate("project", &project.project_name),
        )
    }

    async fn update_project(&self, project: &Project) -> StoreResult<Project> {
        let mut inner = self.inner.lock();
        replace(
            &mut inner.projects,
            project.project_name.clone(),
            project,
            || StoreError::conflict("project", &project.project_name),
        )
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.inner.lock().projects.values().cloned().collect())
    }

    async fn get_project_model(
        &self,
        project_name: &str,
        variant_name: &str,
    ) -> StoreResult<Option<ProjectModel>> {
        let key = (project_name.to_owned(), variant_name.to_owned());
        Ok(self.inner.lock().project_models.get(&key).cloned())
    }

    async fn insert_project_model(&self, model: &ProjectModel) -> StoreResult<ProjectModel> {
        let mut inner = self.inner.lock();
        insert_new(&mut inner.project_models, variant_key(model), model, || {
            StoreError::duplicate("project model", format!("{}/{}", model.project_name, model.variant_name))
        })
    }

    async fn update_project_model(&self, model: &ProjectModel) -> StoreResult<ProjectModel> {
        let mut inner = self.inner.lock();
        replace(&mut inner.project_models, variant_key(model), model, || {
            StoreError::conflict("project model", format!("{}/{}", model.project_name, model.variant_name))
        })
    }

    async fn list_project_models(&self, project_name: &str) -> StoreResult<Vec<ProjectModel>> {
        Ok(self
            .inner
            .lock()
            .project_models
            .values()
            .filter(|model| model.project_name == project_name)
            .cloned()
            .collect())
    }

    async fn get_job(&self, job_name: &str) -> StoreResult<Option<Job>> {
        Ok(self.inner.lock().jobs.get(job_name).cloned())
    }

    async fn insert_job(&self, job: &Job) -> StoreResult<Job> {
        let mut inner = self.inner.lock();
        insert_new(&mut inner.jobs, job.job_name.clone(), job, || {
            StoreError::duplicate("job", &job.job_name)
        })
    }

    async fn update_job(&self, job: &Job) -> StoreResult<Job> {
        let mut inner = self.inner.lock();
        replace(&mut inner.jobs, job.job_name.clone(), job, || {
            StoreError::conflict("job", &job.job_name)
        })
    }

    async fn list_jobs_by_project(&self, project_name: &str) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .inner
            .lock()
            .jobs
            .values()
            .filter(|job| job.project_name == project_name)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.timestamp_queued.cmp(&a.timestamp_queued).then_with(|| a.job_name.cmp(&b.job_name)));
        Ok(jobs)
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .inner
            .lock()
            .jobs
            .values()
            .filter(|job| job.endpoint_status == status)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.timestamp_queued.cmp(&b.timestamp_queued).then_with(|| a.job_name.cmp(&b.job_name)));
        Ok(jobs)
    }

    async fn put_endpoint(&self, endpoint: &Endpoint) -> StoreResult<Endpoint> {
        let mut inner = self.inner.lock();
        let mut stored = endpoint.clone();
        stored.time_updated = Utc::now();
        if stored.endpoint_arn.is_none()
            && let Some(previous) = inner.endpoints.get(&endpoint.endpoint_name)
        {
            stored.endpoint_arn.clone_from(&previous.endpoint_arn);
        }
        inner.endpoints.insert(stored.endpoint_name.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_endpoint(&self, endpoint_name: &str) -> StoreResult<Option<Endpoint>> {
        Ok(self.inner.lock().endpoints.get(endpoint_name).cloned())
    }

    async fn promote(&self, promotion: &Promotion) -> StoreResult<()> {
        let mut inner = self.inner.lock();

        // Check every version before writing anything.
        let jobs = core::iter::once(&promotion.job).chain(promotion.retired.as_ref());
        for job in jobs.clone() {
            if !matches_version(&inner.jobs, &job.job_name, job) {
                return Err(StoreError::conflict("job", &job.job_name));
            }
        }
        if let Some(model) = &promotion.project_model
            && !matches_version(&inner.project_models, &variant_key(model), model)
        {
            return Err(StoreError::conflict(
                "project model",
                format!("{}/{}", model.project_name, model.variant_name),
            ));
        }
        if let Some(project) = &promotion.project
            && !matches_version(&inner.projects, &project.project_name, project)
        {
            return Err(StoreError::conflict("project", &project.project_name));
        }

        for job in jobs {
            let mut stored = job.clone();
            stored.stamp(stored.version + 1);
            inner.jobs.insert(stored.job_name.clone(), stored);
        }
        if let Some(model) = &promotion.project_model {
            let mut stored = model.clone();
            stored.stamp(stored.version + 1);
            inner.project_models.insert(variant_key(model), stored);
        }
        if let Some(project) = &promotion.project {
            let mut stored = project.clone();
            stored.stamp(stored.version + 1);
            inner.projects.insert(stored.project_name.clone(), stored);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ml_structs::JobType;

    use super::*;

    fn serve_job(name: &str, queued: i64) -> Job {
        let mut job = Job::queued(name, JobType::Serve, "churn", "default", queued);
        job.endpoint_status = JobStatus::Creating;
        job
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = InMemoryStore::new();
        let project = store.insert_project(&Project::new("churn")).await.expect("first insert");
        assert_eq!(project.version, 1);

        let err = store
            .insert_project(&Project::new("churn"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Duplicate { collection: "project", .. }));
    }

    #[tokio::test]
    async fn test_update_requires_current_version() {
        let store = InMemoryStore::new();
        let stored = store.insert_project(&Project::new("churn")).await.expect("insert");

        let mut first = stored.clone();
        first.is_auto_deploy = false;
        let updated = store.update_project(&first).await.expect("current version");
        assert_eq!(updated.version, 2);

        // A second writer that read version 1 loses.
        let mut stale = stored;
        stale.is_active = false;
        let err = store.update_project(&stale).await.expect_err("stale version");
        assert!(err.is_conflict());

        let current = store.get_project("churn").await.expect("read").expect("exists");
        assert!(!current.is_auto_deploy);
        assert!(current.is_active);
    }

    #[tokio::test]
    async fn test_list_jobs_by_status() {
        let store = InMemoryStore::new();
        store.insert_job(&serve_job("churn-Serve-2", 2)).await.expect("insert");
        store.insert_job(&serve_job("churn-Serve-1", 1)).await.expect("insert");
        let mut done = serve_job("churn-Serve-3", 3);
        done.endpoint_status = JobStatus::InService;
        store.insert_job(&done).await.expect("insert");

        let creating = store.list_jobs_by_status(JobStatus::Creating).await.expect("list");
        let names: Vec<&str> = creating.iter().map(|job| job.job_name.as_str()).collect();
        assert_eq!(names, ["churn-Serve-1", "churn-Serve-2"]);

        let all = store.list_jobs_by_project("churn").await.expect("list");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].job_name, "churn-Serve-3");
    }

    #[tokio::test]
    async fn test_promotion_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let project = store.insert_project(&Project::new("churn")).await.expect("insert");
        let job = store.insert_job(&serve_job("churn-Serve-1", 1)).await.expect("insert");

        let mut stale_project = project.clone();
        stale_project.version = 7;
        stale_project.serving_endpoint = Some(job.job_name.clone());

        let promotion = Promotion {
            job: job.with_status(JobStatus::InService),
            retired: None,
            project_model: None,
            project: Some(stale_project),
        };
        let err = store.promote(&promotion).await.expect_err("stale project");
        assert!(err.is_conflict());

        // Nothing was written, including the job.
        let unchanged = store.get_job(&job.job_name).await.expect("read").expect("exists");
        assert_eq!(unchanged.endpoint_status, JobStatus::Creating);
        assert_eq!(unchanged.version, 1);

        let mut current_project = project;
        current_project.serving_endpoint = Some(job.job_name.clone());
        let promotion = Promotion {
            project: Some(current_project),
            ..promotion
        };
        store.promote(&promotion).await.expect("current versions");

        let promoted = store.get_job(&job.job_name).await.expect("read").expect("exists");
        assert_eq!(promoted.endpoint_status, JobStatus::InService);
        assert_eq!(promoted.version, 2);
        let project = store.get_project("churn").await.expect("read").expect("exists");
        assert_eq!(project.serving_endpoint.as_deref(), Some("churn-Serve-1"));
    }

    #[tokio::test]
    async fn test_put_endpoint_keeps_known_arn() {
        let store = InMemoryStore::new();
        let endpoint = Endpoint {
            endpoint_name: "churn-Serve-1".to_owned(),
            project_name: "churn".to_owned(),
            job_name: "churn-Serve-1".to_owned(),
            endpoint_config_name: "churn-Serve-1".to_owned(),
            endpoint_arn: Some("arn:endpoint/churn-Serve-1".to_owned()),
            time_updated: Utc::now(),
        };
        store.put_endpoint(&endpoint).await.expect("insert");

        let without_arn = Endpoint {
            endpoint_arn: None,
            ..endpoint
        };
        let stored = store.put_endpoint(&without_arn).await.expect("upsert");
        assert_eq!(stored.endpoint_arn.as_deref(), Some("arn:endpoint/churn-Serve-1"));
    }
}
