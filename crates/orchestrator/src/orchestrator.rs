use std::sync::Arc;

use chrono::Utc;
use config::DeploymentDefaults;
use database::RecordStore;
use ml_structs::Project;
use platform_client::MlPlatform;
use serde::Serialize;
use serde_json::Value;
use ml_structs::Json;

use crate::{JobError, JobResult};

/// Source of epoch seconds used to name jobs.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Drives train and serve submissions against a record store and an ML platform.
pub struct Orchestrator<S, P> {
    pub(crate) store: S,
    pub(crate) platform: P,
    pub(crate) defaults: DeploymentDefaults,
    clock: Clock,
}

impl<S: RecordStore, P: MlPlatform> Orchestrator<S, P> {
    #[must_use]
    pub fn new(store: S, platform: P, defaults: DeploymentDefaults) -> Self {
        Self {
            store,
            platform,
            defaults,
            clock: Arc::new(|| Utc::now().timestamp()),
        }
    }

    /// Replaces the wall clock used for job names.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub(crate) fn now(&self) -> i64 {
        (self.clock)()
    }

    pub(crate) fn variant_or_default<'a>(&'a self, variant_name: Option<&'a str>) -> &'a str {
        variant_name.unwrap_or(&self.defaults.default_variant)
    }

    /// Loads a project that exists and has not been deactivated.
    pub(crate) async fn active_project(&self, project_name: &str) -> JobResult<Project> {
        match self.store.get_project(project_name).await? {
            Some(project) if project.is_active => Ok(project),
            Some(_) => Err(JobError::ProjectInactive(project_name.to_owned())),
            None => Err(JobError::ProjectNotFound(project_name.to_owned())),
        }
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> JobResult<Json<Value>> {
    Ok(Json(serde_json::to_value(value)?))
}
