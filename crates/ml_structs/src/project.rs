use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::{DEFAULT_VARIANT, EnvVars, HyperParameters};

/// Traffic weight per variant name.
pub type VariantWeights = BTreeMap<String, f64>;

/// A registered project.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub project_name: String,

    /// Variants that take part in the auto-deployed traffic split
    pub variants: Json<VariantWeights>,

    pub is_auto_deploy: bool,

    /// Soft-delete flag; projects are never removed
    pub is_active: bool,

    /// Name of the currently promoted serving job
    pub serving_endpoint: Option<String>,

    #[serde(with = "crate::json::timestamp")]
    pub date_created: DateTime<Utc>,

    #[serde(with = "crate::json::timestamp")]
    pub time_updated: DateTime<Utc>,

    pub version: i64,
}

impl Project {
    /// Creates an unsaved project with the registration defaults: a single
    /// `default` variant taking all traffic, auto-deploy on, active.
    #[must_use]
    pub fn new(project_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project_name: project_name.into(),
            variants: Json(BTreeMap::from([(DEFAULT_VARIANT.to_owned(), 1.0)])),
            is_auto_deploy: true,
            is_active: true,
            serving_endpoint: None,
            date_created: now,
            time_updated: now,
            version: 1,
        }
    }

    /// Returns the traffic weight of a variant, if it is part of the split.
    #[must_use]
    pub fn weight(&self, variant_name: &str) -> Option<f64> {
        self.variants.get(variant_name).copied()
    }
}

/// Resource configuration for a training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrainSpec {
    #[serde(default = "one")]
    pub instance_count: u32,

    pub instance_type: String,

    #[serde(rename = "VolumeSizeInGB", default = "default_volume_size")]
    pub volume_size_in_gb: u32,
}

/// Instance configuration for one serving variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServeSpec {
    #[serde(default = "one")]
    pub initial_instance_count: u32,

    #[serde(default = "default_serving_instance")]
    pub instance_type: String,
}

impl Default for ServeSpec {
    fn default() -> Self {
        Self {
            initial_instance_count: one(),
            instance_type: default_serving_instance(),
        }
    }
}

const fn one() -> u32 {
    1
}

const fn default_volume_size() -> u32 {
    50
}

fn default_serving_instance() -> String {
    "ml.m4.xlarge".to_owned()
}

/// Stored defaults for one variant of a project.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectModel {
    pub project_name: String,
    pub variant_name: String,
    pub image_train: Option<String>,
    pub image_serve: Option<String>,
    pub spec_train: Option<Json<TrainSpec>>,
    pub spec_serve: Option<Json<ServeSpec>>,
    pub env_train: Option<Json<EnvVars>>,
    pub env_serve: Option<Json<EnvVars>>,
    pub hyperparameters: Option<Json<HyperParameters>>,

    /// Name of the most recently promoted serving job for this variant
    pub latest_model: Option<String>,

    #[serde(with = "crate::json::timestamp")]
    pub time_updated: DateTime<Utc>,

    pub version: i64,
}

impl ProjectModel {
    /// Creates an unsaved variant with no defaults.
    #[must_use]
    pub fn new(project_name: impl Into<String>, variant_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            variant_name: variant_name.into(),
            image_train: None,
            image_serve: None,
            spec_train: None,
            spec_serve: None,
            env_train: None,
            env_serve: None,
            hyperparameters: None,
            latest_model: None,
            time_updated: Utc::now(),
            version: 1,
        }
    }
}
