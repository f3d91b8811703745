use database::RecordStore;
use ml_structs::naming::{self, validate_name};
use ml_structs::{Job, JobStatus, JobType, Json};
use platform_client::{MlPlatform, TrainingJobInput, TrainingJobRequest};
use tracing::{error, info};

use crate::orchestrator::to_json;
use crate::{JobError, JobResult, Orchestrator, TrainRequest};

impl<S: RecordStore, P: MlPlatform> Orchestrator<S, P> {
    /// Submits a training job and records it as `Running`.
    ///
    /// Image, spec, environment and hyperparameters fall back to the
    /// variant's stored defaults when omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid, the project is missing or
    /// inactive, no image or spec can be resolved, or the platform or record
    /// store call fails. A record store failure after submission leaves the
    /// training job running on the platform without a record.
    pub async fn submit_train(&self, request: &TrainRequest) -> JobResult<Job> {
        let project_name = request.project_name.as_str();
        let variant_name = self.variant_or_default(request.variant_name.as_deref());
        validate_name("project", project_name)?;
        validate_name("variant", variant_name)?;
        if request.data_input.is_empty() || request.model_output.is_empty() {
            return Err(JobError::InvalidRequest(
                "training needs both data_input and model_output".to_owned(),
            ));
        }
        let queued_at = self.now();
        let job_name = naming::job_name(project_name, JobType::Train, queued_at)?;

        self.active_project(project_name).await?;
        let stored = self.store.get_project_model(project_name, variant_name).await?;

        let image = request
            .image
            .clone()
            .or_else(|| stored.as_ref().and_then(|model| model.image_train.clone()))
            .ok_or_else(|| {
                JobError::InvalidRequest(format!("no training image for variant {variant_name:?}"))
            })?;
        let spec = request
            .spec
            .clone()
            .or_else(|| {
                stored
                    .as_ref()
                    .and_then(|model| model.spec_train.as_ref())
                    .map(|spec| spec.0.clone())
            })
            .ok_or_else(|| {
                JobError::InvalidRequest(format!("no training spec for variant {variant_name:?}"))
            })?;
        let env = request.env.clone().or_else(|| {
            stored
                .as_ref()
                .and_then(|model| model.env_train.as_ref())
                .map(|env| env.0.clone())
        });
        let hyperparameters = request.hyperparameters.clone().or_else(|| {
            stored
                .as_ref()
                .and_then(|model| model.hyperparameters.as_ref())
                .map(|params| params.0.clone())
        });

        let mut training = TrainingJobRequest::new(&TrainingJobInput {
            job_name: &job_name,
            image: &image,
            role_arn: &self.defaults.execution_role,
            data_input: &request.data_input,
            model_output: &request.model_output,
            resources: &spec,
            max_runtime_seconds: self.defaults.max_runtime_seconds,
            input_distribution: &self.defaults.input_distribution,
        });
        training.hyper_parameters = hyperparameters;
        training.environment = env.clone();

        let handle = self.platform.create_training_job(&training).await?;
        info!(job_name = %job_name, arn = %handle.arn, "Submitted training job");

        let mut job = Job::queued(&job_name, JobType::Train, project_name, variant_name, queued_at);
        job.endpoint_status = JobStatus::Running;
        job.image = Some(image);
        job.spec = Some(to_json(&spec)?);
        job.env = env.map(Json);
        job.data_input = Some(request.data_input.clone());
        job.model_output = Some(request.model_output.clone());

        self.store.insert_job(&job).await.map_err(|err| {
            error!(job_name = %job_name, %err, "Training job is running but could not be recorded");
            JobError::from(err)
        })
    }
}
