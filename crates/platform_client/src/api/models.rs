//! Request and response types of the ML platform gateway.
//!
//! Field names follow the platform's PascalCase wire format.

use ml_structs::{EnvVars, HyperParameters, JobStatus, ServeSpec, TrainSpec};
use serde::{Deserialize, Serialize};

/// Image and input mode of a training container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlgorithmSpecification {
    pub training_image: String,
    pub training_input_mode: String,
}

/// Where a training job writes its model artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputDataConfig {
    #[serde(rename = "S3OutputPath")]
    pub s3_output_path: String,
}

/// Hard limit on training duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoppingCondition {
    pub max_runtime_in_seconds: u32,
}

/// Object-store prefix feeding a training channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3DataSource {
    #[serde(rename = "S3DataType")]
    pub s3_data_type: String,
    #[serde(rename = "S3Uri")]
    pub s3_uri: String,
    #[serde(rename = "S3DataDistributionType")]
    pub s3_data_distribution_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSource {
    #[serde(rename = "S3DataSource")]
    pub s3_data_source: S3DataSource,
}

/// Named input of a training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Channel {
    pub channel_name: String,
    pub data_source: DataSource,
    pub compression_type: String,
    pub record_wrapper_type: String,
}

/// Body of a create-training-job call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrainingJobRequest {
    pub training_job_name: String,
    pub algorithm_specification: AlgorithmSpecification,
    pub role_arn: String,
    pub output_data_config: OutputDataConfig,
    pub resource_config: TrainSpec,
    pub stopping_condition: StoppingCondition,
    pub input_data_config: Vec<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyper_parameters: Option<HyperParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvVars>,
}

/// Inputs for [`TrainingJobRequest::new`] that vary per job.
#[derive(Debug, Clone)]
pub struct TrainingJobInput<'a> {
    pub job_name: &'a str,
    pub image: &'a str,
    pub role_arn: &'a str,
    pub data_input: &'a str,
    pub model_output: &'a str,
    pub resources: &'a TrainSpec,
    pub max_runtime_seconds: u32,
    pub input_distribution: &'a str,
}

impl TrainingJobRequest {
    /// Builds a file-mode training request with a single `train` channel.
    #[must_use]
    pub fn new(input: &TrainingJobInput<'_>) -> Self {
        Self {
            training_job_name: input.job_name.to_owned(),
            algorithm_specification: AlgorithmSpecification {
                training_image: input.image.to_owned(),
                training_input_mode: "File".to_owned(),
            },
            role_arn: input.role_arn.to_owned(),
            output_data_config: OutputDataConfig {
                s3_output_path: input.model_output.to_owned(),
            },
            resource_config: input.resources.clone(),
            stopping_condition: StoppingCondition {
                max_runtime_in_seconds: input.max_runtime_seconds,
            },
            input_data_config: vec![Channel {
                channel_name: "train".to_owned(),
                data_source: DataSource {
                    s3_data_source: S3DataSource {
                        s3_data_type: "S3Prefix".to_owned(),
                        s3_uri: input.data_input.to_owned(),
                        s3_data_distribution_type: input.input_distribution.to_owned(),
                    },
                },
                compression_type: "None".to_owned(),
                record_wrapper_type: "None".to_owned(),
            }],
            hyper_parameters: None,
            environment: None,
        }
    }
}

/// Response of a create-training-job call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTrainingJobResponse {
    pub training_job_arn: Option<String>,
}

/// Artifacts written by a finished training job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelArtifacts {
    #[serde(rename = "S3ModelArtifacts")]
    pub s3_model_artifacts: String,
}

/// Current state of a training job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrainingJobDescription {
    pub training_job_name: String,
    pub training_job_status: String,
    pub model_artifacts: Option<ModelArtifacts>,
    pub failure_reason: Option<String>,
}

/// Serving container of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDefinition {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_data_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvVars>,
}

/// Body of a create-model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelRequest {
    pub model_name: String,
    pub execution_role_arn: String,
    pub primary_container: ContainerDefinition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateModelResponse {
    pub model_arn: Option<String>,
}

/// One variant of an endpoint configuration: which model, on what, with what weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductionVariant {
    pub variant_name: String,
    pub model_name: String,
    pub initial_instance_count: u32,
    pub instance_type: String,
    pub initial_variant_weight: f64,
}

impl ProductionVariant {
    /// Attaches a model to a variant's stored serving spec.
    #[must_use]
    pub fn from_spec(variant_name: &str, model_name: &str, spec: &ServeSpec, weight: f64) -> Self {
        Self {
            variant_name: variant_name.to_owned(),
            model_name: model_name.to_owned(),
            initial_instance_count: spec.initial_instance_count,
            instance_type: spec.instance_type.clone(),
            initial_variant_weight: weight,
        }
    }
}

/// Body of a create-endpoint-config call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointConfigRequest<'a> {
    pub endpoint_config_name: &'a str,
    pub production_variants: &'a [ProductionVariant],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEndpointConfigResponse {
    pub endpoint_config_arn: Option<String>,
}

/// Body of create-endpoint and update-endpoint calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<&'a str>,
    pub endpoint_config_name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointResponse {
    pub endpoint_arn: Option<String>,
}

/// Provisioning state reported for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointState {
    Creating,
    Updating,
    InService,
    Failed,
}

impl EndpointState {
    /// Returns true while the endpoint cannot accept another create or update.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Creating | Self::Updating)
    }
}

impl From<EndpointState> for JobStatus {
    fn from(state: EndpointState) -> Self {
        match state {
            EndpointState::Creating => Self::Creating,
            EndpointState::Updating => Self::Updating,
            EndpointState::InService => Self::InService,
            EndpointState::Failed => Self::Failed,
        }
    }
}

/// Current state of an endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointDescription {
    pub endpoint_name: String,
    #[serde(default)]
    pub endpoint_arn: Option<String>,
    #[serde(default)]
    pub endpoint_config_name: Option<String>,
    pub endpoint_status: EndpointState,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_training_request_shape() {
        let resources = TrainSpec {
            instance_count: 2,
            instance_type: "ml.p3.2xlarge".to_owned(),
            volume_size_in_gb: 50,
        };
        let request = TrainingJobRequest::new(&TrainingJobInput {
            job_name: "churn-Train-1548041871",
            image: "registry/churn-train:3",
            role_arn: "arn:role/ml",
            data_input: "s3://data/churn/",
            model_output: "s3://models/churn/",
            resources: &resources,
            max_runtime_seconds: 3600,
            input_distribution: "FullyReplicated",
        });

        let value = serde_json::to_value(&request).expect("serializable");
        assert_eq!(value["TrainingJobName"], "churn-Train-1548041871");
        assert_eq!(value["AlgorithmSpecification"]["TrainingInputMode"], "File");
        assert_eq!(value["ResourceConfig"]["InstanceCount"], 2);
        assert_eq!(value["StoppingCondition"]["MaxRuntimeInSeconds"], 3600);
        assert_eq!(
            value["InputDataConfig"][0]["DataSource"]["S3DataSource"],
            json!({
                "S3DataType": "S3Prefix",
                "S3Uri": "s3://data/churn/",
                "S3DataDistributionType": "FullyReplicated",
            })
        );
        assert!(value.get("HyperParameters").is_none());
    }

    #[test]
    fn test_endpoint_description_parses_status() {
        let description: EndpointDescription = serde_json::from_value(json!({
            "EndpointName": "churn-Serve-1",
            "EndpointStatus": "InService",
        }))
        .expect("valid description");
        assert_eq!(description.endpoint_status, EndpointState::InService);
        assert_eq!(JobStatus::from(description.endpoint_status), JobStatus::InService);

        let unknown = serde_json::from_value::<EndpointDescription>(json!({
            "EndpointName": "churn-Serve-1",
            "EndpointStatus": "Deleting",
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_production_variant_from_spec() {
        let variant = ProductionVariant::from_spec("a", "churn-Serve-1", &ServeSpec::default(), 0.7);
        let value = serde_json::to_value(&variant).expect("serializable");
        assert_eq!(
            value,
            json!({
                "VariantName": "a",
                "ModelName": "churn-Serve-1",
                "InitialInstanceCount": 1,
                "InstanceType": "ml.m4.xlarge",
                "InitialVariantWeight": 0.7,
            })
        );
    }
}
