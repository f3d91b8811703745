//! Inputs accepted by the orchestrator.

use ml_structs::{EnvVars, HyperParameters, ServeSpec, TrainSpec, VariantWeights};
use serde::Deserialize;

/// Prefix marking `model_artifacts` as the output of a finished training job.
pub const FROM_TRAINING_PREFIX: &str = "from-training:";

/// A training submission. Omitted fields fall back to the variant's stored defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainRequest {
    pub project_name: String,
    pub variant_name: Option<String>,
    pub data_input: String,
    pub model_output: String,
    pub image: Option<String>,
    pub spec: Option<TrainSpec>,
    pub env: Option<EnvVars>,
    pub hyperparameters: Option<HyperParameters>,
}

/// A serving submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServeRequest {
    pub project_name: String,
    pub variant_name: Option<String>,

    /// Artifact location, or `from-training:<job>` to use a training job's output
    pub model_artifacts: Option<String>,

    pub image: Option<String>,
    pub env: Option<EnvVars>,
}

/// Where a serving model's artifacts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource<'a> {
    Location(&'a str),
    TrainingJob(&'a str),
}

impl<'a> ArtifactSource<'a> {
    #[must_use]
    pub fn parse(value: &'a str) -> Self {
        value
            .strip_prefix(FROM_TRAINING_PREFIX)
            .map_or(Self::Location(value), Self::TrainingJob)
    }
}

/// Changes to a project; `None` leaves a field as stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub variants: Option<VariantWeights>,
    pub is_auto_deploy: Option<bool>,
    pub is_active: Option<bool>,
}

/// Defaults stored for a variant; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantDefaults {
    pub image_train: Option<String>,
    pub image_serve: Option<String>,
    pub spec_train: Option<TrainSpec>,
    pub spec_serve: Option<ServeSpec>,
    pub env_train: Option<EnvVars>,
    pub env_serve: Option<EnvVars>,
    pub hyperparameters: Option<HyperParameters>,
}
