use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::EnvVars;

/// Kind of work a job submitted to the platform.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum JobType {
    Train,
    Serve,
}

/// Lifecycle state of a job, stored as `endpoint_status`.
///
/// Serving jobs move `ModelCreatedOnly -> {Creating, Updating} -> {InService, Failed}`
/// and end as `Retired` once a newer job is promoted over them. Training jobs
/// are recorded as `Running`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum JobStatus {
    Running,
    ModelCreatedOnly,
    Creating,
    Updating,
    InService,
    Failed,
    Retired,
}

impl JobStatus {
    /// Statuses the reconciler polls, in sweep order.
    pub const IN_PROGRESS: [Self; 2] = [Self::Creating, Self::Updating];
}

/// A submitted training or serving job.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Job {
    pub job_name: String,
    pub job_type: JobType,
    pub project_name: String,
    pub variant_name: String,
    pub endpoint_status: JobStatus,

    /// Container image used for training or serving
    pub image: Option<String>,

    /// Training resource spec, or the production variants of the endpoint config
    pub spec: Option<Json<serde_json::Value>>,

    /// Container environment
    pub env: Option<Json<EnvVars>>,

    pub data_input: Option<String>,
    pub model_output: Option<String>,
    pub model_artifacts: Option<String>,
    pub model_arn: Option<String>,
    pub endpoint_config_arn: Option<String>,

    /// Epoch seconds at submission, also embedded in `job_name`
    pub timestamp_queued: i64,

    #[serde(with = "crate::json::timestamp")]
    pub time_updated: DateTime<Utc>,

    /// Optimistic concurrency token
    pub version: i64,
}

impl Job {
    /// Creates an unsaved job record with no platform attributes set.
    #[must_use]
    pub fn queued(
        job_name: impl Into<String>,
        job_type: JobType,
        project_name: impl Into<String>,
        variant_name: impl Into<String>,
        timestamp_queued: i64,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            job_type,
            project_name: project_name.into(),
            variant_name: variant_name.into(),
            endpoint_status: JobStatus::ModelCreatedOnly,
            image: None,
            spec: None,
            env: None,
            data_input: None,
            model_output: None,
            model_artifacts: None,
            model_arn: None,
            endpoint_config_arn: None,
            timestamp_queued,
            time_updated: Utc::now(),
            version: 1,
        }
    }

    /// Returns a copy carrying a new status, ready for a versioned write.
    #[must_use]
    pub fn with_status(&self, status: JobStatus) -> Self {
        Self {
            endpoint_status: status,
            ..self.clone()
        }
    }
}
