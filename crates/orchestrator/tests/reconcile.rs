mod common;

use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::*;
use database::{InMemoryStore, Promotion, RecordStore, StoreResult};
use ml_structs::{Endpoint, Job, JobStatus, JobType, Project, ProjectModel};
use orchestrator::{Reconciler, ServeRequest, SweepReport};
use platform_client::EndpointState;

const PREVIOUS: &str = "churn-Serve-1000";

fn serve() -> ServeRequest {
    ServeRequest {
        project_name: "churn".to_owned(),
        model_artifacts: Some("s3://models/churn/model.tar.gz".to_owned()),
        ..ServeRequest::default()
    }
}

/// A project whose default variant already serves `PREVIOUS`.
async fn seed_promoted(store: &InMemoryStore, platform: &FakePlatform) {
    seed_project(store, "churn", &[("default", 1.0)]).await;
    seed_variant(store, "churn", "default", Some(PREVIOUS)).await;
    let previous = Job::queued(PREVIOUS, JobType::Serve, "churn", "default", 1000)
        .with_status(JobStatus::InService);
    store.insert_job(&previous).await.expect("job inserted");
    platform.set_endpoint(PREVIOUS, EndpointState::InService);
}

/// Store that edits the project once, right before the first promotion lands.
#[derive(Clone)]
struct RacingStore {
    inner: InMemoryStore,
    raced: Arc<AtomicBool>,
}

impl RacingStore {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            raced: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl RecordStore for RacingStore {
    async fn get_project(&self, project_name: &str) -> StoreResult<Option<Project>> {
        self.inner.get_project(project_name).await
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<Project> {
        self.inner.insert_project(project).await
    }

    async fn update_project(&self, project: &Project) -> StoreResult<Project> {
        self.inner.update_project(project).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.inner.list_projects().await
    }

    async fn get_project_model(
        &self,
        project_name: &str,
        variant_name: &str,
    ) -> StoreResult<Option<ProjectModel>> {
        self.inner.get_project_model(project_name, variant_name).await
    }

    async fn insert_project_model(&self, model: &ProjectModel) -> StoreResult<ProjectModel> {
        self.inner.insert_project_model(model).await
    }

    async fn update_project_model(&self, model: &ProjectModel) -> StoreResult<ProjectModel> {
        self.inner.update_project_model(model).await
    }

    async fn list_project_models(&self, project_name: &str) -> StoreResult<Vec<ProjectModel>> {
        self.inner.list_project_models(project_name).await
    }

    async fn get_job(&self, job_name: &str) -> StoreResult<Option<Job>> {
        self.inner.get_job(job_name).await
    }

    async fn insert_job(&self, job: &Job) -> StoreResult<Job> {
        self.inner.insert_job(job).await
    }

    async fn update_job(&self, job: &Job) -> StoreResult<Job> {
        self.inner.update_job(job).await
    }

    async fn list_jobs_by_project(&self, project_name: &str) -> StoreResult<Vec<Job>> {
        self.inner.list_jobs_by_project(project_name).await
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        self.inner.list_jobs_by_status(status).await
    }

    async fn put_endpoint(&self, endpoint: &Endpoint) -> StoreResult<Endpoint> {
        self.inner.put_endpoint(endpoint).await
    }

    async fn get_endpoint(&self, endpoint_name: &str) -> StoreResult<Option<Endpoint>> {
        self.inner.get_endpoint(endpoint_name).await
    }

    async fn promote(&self, promotion: &Promotion) -> StoreResult<()> {
        if !self.raced.swap(true, Ordering::SeqCst)
            && let Some(project) = &promotion.project
        {
            let current = self
                .inner
                .get_project(&project.project_name)
                .await?
                .expect("project exists");
            self.inner.update_project(&current).await?;
        }
        self.inner.promote(promotion).await
    }
}

async fn status_of(store: &InMemoryStore, job_name: &str) -> JobStatus {
    store
        .get_job(job_name)
        .await
        .expect("read")
        .expect("job exists")
        .endpoint_status
}

#[tokio::test]
async fn test_promotion_retires_previous_job_once() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_promoted(&store, &platform).await;
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    let reconciler = Reconciler::new(store.clone(), platform.clone());

    let report = reconciler.sweep().await.expect("sweep");
    assert_eq!(report, SweepReport { unchanged: 1, ..SweepReport::default() });
    assert_eq!(status_of(&store, &job.job_name).await, JobStatus::Creating);

    platform.set_endpoint(&job.job_name, EndpointState::InService);
    let report = reconciler.sweep().await.expect("sweep");
    assert_eq!(report, SweepReport { promoted: 1, ..SweepReport::default() });

    assert_eq!(status_of(&store, &job.job_name).await, JobStatus::InService);
    assert_eq!(status_of(&store, PREVIOUS).await, JobStatus::Retired);
    let variant = store
        .get_project_model("churn", "default")
        .await
        .expect("read")
        .expect("variant");
    assert_eq!(variant.latest_model.as_deref(), Some(job.job_name.as_str()));
    let project = store.get_project("churn").await.expect("read").expect("project");
    assert_eq!(project.serving_endpoint.as_deref(), Some(job.job_name.as_str()));
    assert_eq!(platform.endpoint(PREVIOUS), None);

    let report = reconciler.sweep().await.expect("sweep");
    assert_eq!(report, SweepReport::default());
    assert_eq!(platform.calls_to("delete_endpoint").len(), 1);
}

#[tokio::test]
async fn test_first_promotion_retires_nothing() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_project(&store, "churn", &[("default", 1.0)]).await;
    seed_variant(&store, "churn", "default", None).await;
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    platform.set_endpoint(&job.job_name, EndpointState::InService);

    let report = Reconciler::new(store.clone(), platform.clone())
        .sweep()
        .await
        .expect("sweep");

    assert_eq!(report.promoted, 1);
    assert!(platform.calls_to("delete_endpoint").is_empty());
}

#[tokio::test]
async fn test_failed_endpoint_marks_job_failed() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_promoted(&store, &platform).await;
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    platform.set_endpoint(&job.job_name, EndpointState::Failed);

    let report = Reconciler::new(store.clone(), platform.clone())
        .sweep()
        .await
        .expect("sweep");

    assert_eq!(report, SweepReport { failed: 1, ..SweepReport::default() });
    assert_eq!(status_of(&store, &job.job_name).await, JobStatus::Failed);
    assert_eq!(status_of(&store, PREVIOUS).await, JobStatus::InService);
    assert!(platform.calls_to("delete_endpoint").is_empty());
}

#[tokio::test]
async fn test_vanished_endpoint_leaves_job_unchanged() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_promoted(&store, &platform).await;
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    platform.remove_endpoint(&job.job_name);

    let report = Reconciler::new(store.clone(), platform.clone())
        .sweep()
        .await
        .expect("sweep");

    assert_eq!(report, SweepReport { unchanged: 1, ..SweepReport::default() });
    assert_eq!(status_of(&store, &job.job_name).await, JobStatus::Creating);
}

#[tokio::test]
async fn test_one_failing_job_does_not_stop_the_sweep() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_project(&store, "churn", &[("default", 1.0)]).await;
    seed_variant(&store, "churn", "default", None).await;
    let orchestrator = orchestrator(&store, &platform);
    let broken = orchestrator.submit_serve(&serve()).await.expect("serve submitted");
    let healthy = orchestrator.submit_serve(&serve()).await.expect("serve submitted");
    platform.fail_describe(&broken.job_name);
    platform.set_endpoint(&healthy.job_name, EndpointState::InService);

    let report = Reconciler::new(store.clone(), platform.clone())
        .sweep()
        .await
        .expect("sweep");

    assert_eq!(report, SweepReport { promoted: 1, errors: 1, ..SweepReport::default() });
    assert_eq!(status_of(&store, &broken.job_name).await, JobStatus::Creating);
    assert_eq!(status_of(&store, &healthy.job_name).await, JobStatus::InService);
}

#[tokio::test]
async fn test_failed_cleanup_keeps_promotion() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_promoted(&store, &platform).await;
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    platform.set_endpoint(&job.job_name, EndpointState::InService);
    platform.fail_delete();

    let report = Reconciler::new(store.clone(), platform.clone())
        .sweep()
        .await
        .expect("sweep");

    assert_eq!(report.promoted, 1);
    assert_eq!(status_of(&store, PREVIOUS).await, JobStatus::Retired);
    assert_eq!(platform.endpoint(PREVIOUS), Some(EndpointState::InService));
}

#[tokio::test]
async fn test_updating_jobs_are_swept_too() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_project(&store, "churn", &[("default", 1.0)]).await;
    seed_variant(&store, "churn", "default", None).await;
    let updating = Job::queued("churn-Serve-2000", JobType::Serve, "churn", "default", 2000)
        .with_status(JobStatus::Updating);
    store.insert_job(&updating).await.expect("job inserted");
    platform.set_endpoint("churn-Serve-2000", EndpointState::InService);

    let report = Reconciler::new(store.clone(), platform.clone())
        .sweep()
        .await
        .expect("sweep");

    assert_eq!(report.promoted, 1);
    assert_eq!(status_of(&store, "churn-Serve-2000").await, JobStatus::InService);
}

#[tokio::test]
async fn test_superseded_endpoint_without_job_record_is_deleted() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_project(&store, "churn", &[("default", 1.0)]).await;
    seed_variant(&store, "churn", "default", Some(PREVIOUS)).await;
    platform.set_endpoint(PREVIOUS, EndpointState::InService);
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    platform.set_endpoint(&job.job_name, EndpointState::InService);

    let report = Reconciler::new(store.clone(), platform.clone())
        .sweep()
        .await
        .expect("sweep");

    assert_eq!(report, SweepReport { promoted: 1, ..SweepReport::default() });
    assert_eq!(platform.calls_to("delete_endpoint"), vec![format!("delete_endpoint:{PREVIOUS}")]);
    assert_eq!(platform.endpoint(PREVIOUS), None);
    assert!(store.get_job(PREVIOUS).await.expect("read").is_none());
    assert_eq!(status_of(&store, &job.job_name).await, JobStatus::InService);
}

#[tokio::test]
async fn test_conflicting_promotion_is_retried_next_sweep() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_promoted(&store, &platform).await;
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    platform.set_endpoint(&job.job_name, EndpointState::InService);
    let reconciler = Reconciler::new(RacingStore::new(store.clone()), platform.clone());

    let report = reconciler.sweep().await.expect("sweep");
    assert_eq!(report, SweepReport { errors: 1, ..SweepReport::default() });
    assert_eq!(status_of(&store, &job.job_name).await, JobStatus::Creating);
    assert_eq!(status_of(&store, PREVIOUS).await, JobStatus::InService);
    assert_eq!(platform.endpoint(PREVIOUS), Some(EndpointState::InService));
    assert!(platform.calls_to("delete_endpoint").is_empty());

    let report = reconciler.sweep().await.expect("sweep");
    assert_eq!(report, SweepReport { promoted: 1, ..SweepReport::default() });
    assert_eq!(status_of(&store, &job.job_name).await, JobStatus::InService);
    assert_eq!(status_of(&store, PREVIOUS).await, JobStatus::Retired);
    assert_eq!(platform.endpoint(PREVIOUS), None);
}

#[tokio::test]
async fn test_shutdown_during_sweep_stops_the_loop() {
    let store = InMemoryStore::new();
    let platform = FakePlatform::new();
    seed_project(&store, "churn", &[("default", 1.0)]).await;
    seed_variant(&store, "churn", "default", None).await;
    let job = orchestrator(&store, &platform)
        .submit_serve(&serve())
        .await
        .expect("serve submitted");
    platform.clear_calls();
    let shutdown = platform.notify_on_describe();
    let reconciler = Reconciler::new(store.clone(), platform.clone());

    tokio::time::timeout(
        Duration::from_secs(5),
        reconciler.run_until(Duration::from_secs(3600), shutdown),
    )
    .await
    .expect("loop stops once the sweep in flight finishes");

    assert_eq!(platform.calls(), vec![format!("describe_endpoint:{}", job.job_name)]);
}
