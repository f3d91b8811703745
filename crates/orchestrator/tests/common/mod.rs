//! Shared fixtures for orchestrator flow tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use config::DeploymentDefaults;
use database::{InMemoryStore, RecordStore};
use ml_structs::{Json, Project, ProjectModel, ServeSpec, TrainSpec, VariantWeights};
use orchestrator::Orchestrator;
use parking_lot::Mutex;
use platform_client::{
    EndpointDescription, EndpointState, MlPlatform, ModelArtifacts, ModelRequest, PlatformError,
    PlatformResult, ProductionVariant, ResourceHandle, TrainingJobDescription, TrainingJobRequest,
};
use platform_client::StatusCode;
use tokio::sync::oneshot;

pub const FIRST_EPOCH: i64 = 1_548_041_871;

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<String>,
    endpoints: HashMap<String, EndpointState>,
    endpoint_configs: HashMap<String, Vec<ProductionVariant>>,
    training_jobs: HashMap<String, Option<String>>,
    training_requests: Vec<TrainingJobRequest>,
    model_requests: Vec<ModelRequest>,
    fail_describe: Vec<String>,
    fail_delete: bool,
    on_describe: Option<oneshot::Sender<()>>,
}

/// Scripted platform that records every call and keeps endpoint state in memory.
///
/// New endpoints start `Creating`, updated ones `Updating`; tests move them on
/// with [`FakePlatform::set_endpoint`].
#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<FakeState>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call made so far as `operation:name`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{operation}:");
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(&prefix))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn set_endpoint(&self, name: &str, state: EndpointState) {
        self.state.lock().endpoints.insert(name.to_owned(), state);
    }

    pub fn remove_endpoint(&self, name: &str) {
        self.state.lock().endpoints.remove(name);
    }

    pub fn endpoint(&self, name: &str) -> Option<EndpointState> {
        self.state.lock().endpoints.get(name).copied()
    }

    pub fn endpoint_config(&self, name: &str) -> Option<Vec<ProductionVariant>> {
        self.state.lock().endpoint_configs.get(name).cloned()
    }

    /// Registers a training job, finished when `artifacts` is set.
    pub fn add_training_job(&self, name: &str, artifacts: Option<&str>) {
        self.state
            .lock()
            .training_jobs
            .insert(name.to_owned(), artifacts.map(str::to_owned));
    }

    pub fn training_requests(&self) -> Vec<TrainingJobRequest> {
        self.state.lock().training_requests.clone()
    }

    pub fn model_requests(&self) -> Vec<ModelRequest> {
        self.state.lock().model_requests.clone()
    }

    /// Makes `describe_endpoint` fail for `name`.
    pub fn fail_describe(&self, name: &str) {
        self.state.lock().fail_describe.push(name.to_owned());
    }

    pub fn fail_delete(&self) {
        self.state.lock().fail_delete = true;
    }

    /// Resolves the returned receiver on the next `describe_endpoint` call.
    pub fn notify_on_describe(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().on_describe = Some(tx);
        rx
    }

    fn record(&self, operation: &str, name: &str) {
        self.state.lock().calls.push(format!("{operation}:{name}"));
    }
}

fn handle(name: &str, kind: &str) -> ResourceHandle {
    ResourceHandle {
        name: name.to_owned(),
        arn: format!("arn:{kind}/{name}"),
    }
}

fn server_error(operation: &'static str) -> PlatformError {
    PlatformError::Api {
        operation,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "scripted failure".to_owned(),
    }
}

impl MlPlatform for FakePlatform {
    async fn create_training_job(
        &self,
        request: &TrainingJobRequest,
    ) -> PlatformResult<ResourceHandle> {
        self.record("create_training_job", &request.training_job_name);
        let mut state = self.state.lock();
        state
            .training_jobs
            .insert(request.training_job_name.clone(), None);
        state.training_requests.push(request.clone());
        Ok(handle(&request.training_job_name, "training-job"))
    }

    async fn describe_training_job(
        &self,
        name: &str,
    ) -> PlatformResult<Option<TrainingJobDescription>> {
        self.record("describe_training_job", name);
        let state = self.state.lock();
        Ok(state.training_jobs.get(name).map(|artifacts| TrainingJobDescription {
            training_job_name: name.to_owned(),
            training_job_status: if artifacts.is_some() {
                "Completed".to_owned()
            } else {
                "InProgress".to_owned()
            },
            model_artifacts: artifacts.clone().map(|s3_model_artifacts| ModelArtifacts {
                s3_model_artifacts,
            }),
            failure_reason: None,
        }))
    }

    async fn create_model(&self, request: &ModelRequest) -> PlatformResult<ResourceHandle> {
        self.record("create_model", &request.model_name);
        self.state.lock().model_requests.push(request.clone());
        Ok(handle(&request.model_name, "model"))
    }

    async fn create_endpoint_config(
        &self,
        name: &str,
        variants: &[ProductionVariant],
    ) -> PlatformResult<ResourceHandle> {
        self.record("create_endpoint_config", name);
        self.state
            .lock()
            .endpoint_configs
            .insert(name.to_owned(), variants.to_vec());
        Ok(handle(name, "endpoint-config"))
    }

    async fn create_endpoint(&self, name: &str, _config_name: &str) -> PlatformResult<ResourceHandle> {
        self.record("create_endpoint", name);
        self.set_endpoint(name, EndpointState::Creating);
        Ok(handle(name, "endpoint"))
    }

    async fn update_endpoint(&self, name: &str, _config_name: &str) -> PlatformResult<ResourceHandle> {
        self.record("update_endpoint", name);
        self.set_endpoint(name, EndpointState::Updating);
        Ok(handle(name, "endpoint"))
    }

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<Option<EndpointDescription>> {
        self.record("describe_endpoint", name);
        let mut state = self.state.lock();
        if let Some(tx) = state.on_describe.take() {
            let _ = tx.send(());
        }
        if state.fail_describe.iter().any(|failing| failing == name) {
            return Err(server_error("describe_endpoint"));
        }
        Ok(state.endpoints.get(name).map(|status| EndpointDescription {
            endpoint_name: name.to_owned(),
            endpoint_arn: Some(format!("arn:endpoint/{name}")),
            endpoint_config_name: Some(name.to_owned()),
            endpoint_status: *status,
            failure_reason: None,
        }))
    }

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<bool> {
        self.record("delete_endpoint", name);
        let mut state = self.state.lock();
        if state.fail_delete {
            return Err(server_error("delete_endpoint"));
        }
        Ok(state.endpoints.remove(name).is_some())
    }
}

/// Orchestrator over fresh in-memory state whose clock ticks one second per job.
pub fn orchestrator(store: &InMemoryStore, platform: &FakePlatform) -> Orchestrator<InMemoryStore, FakePlatform> {
    let clock = AtomicI64::new(FIRST_EPOCH);
    Orchestrator::new(
        store.clone(),
        platform.clone(),
        DeploymentDefaults::new("arn:role/mlshim"),
    )
    .with_clock(move || clock.fetch_add(1, Ordering::SeqCst))
}

pub fn weights(pairs: &[(&str, f64)]) -> VariantWeights {
    pairs
        .iter()
        .map(|(name, weight)| ((*name).to_owned(), *weight))
        .collect()
}

pub fn train_spec() -> TrainSpec {
    TrainSpec {
        instance_count: 1,
        instance_type: "ml.p3.2xlarge".to_owned(),
        volume_size_in_gb: 50,
    }
}

/// Stores a project with the given split, bypassing the orchestrator.
pub async fn seed_project(store: &InMemoryStore, name: &str, split: &[(&str, f64)]) -> Project {
    let mut project = Project::new(name);
    project.variants = Json(weights(split));
    store.insert_project(&project).await.expect("project inserted")
}

/// Stores a variant with serving defaults and an optional promoted model.
pub async fn seed_variant(
    store: &InMemoryStore,
    project: &str,
    variant: &str,
    latest_model: Option<&str>,
) -> ProjectModel {
    let mut model = ProjectModel::new(project, variant);
    model.image_serve = Some(format!("registry/{project}-serve:1"));
    model.image_train = Some(format!("registry/{project}-train:1"));
    model.spec_serve = Some(Json(ServeSpec::default()));
    model.spec_train = Some(Json(train_spec()));
    model.latest_model = latest_model.map(str::to_owned);
    store
        .insert_project_model(&model)
        .await
        .expect("variant inserted")
}
