use chrono::Utc;
use database::RecordStore;
use ml_structs::naming::{self, validate_name};
use ml_structs::{Endpoint, Job, JobStatus, JobType, Json};
use platform_client::{ContainerDefinition, EndpointState, MlPlatform, ModelRequest};
use tracing::{error, info, warn};

use crate::orchestrator::to_json;
use crate::requests::ArtifactSource;
use crate::{JobError, JobResult, Orchestrator, ServeRequest, plan_traffic};

enum EndpointAction {
    Create,
    Update,
}

impl<S: RecordStore, P: MlPlatform> Orchestrator<S, P> {
    /// Registers a model for a variant and, when the project auto-deploys
    /// that variant, rolls it out to an endpoint.
    ///
    /// The job is recorded as `ModelCreatedOnly` when no endpoint config can
    /// be planned, otherwise with the endpoint status reported after the
    /// create or update call. Pointers are not promoted here; that is left to
    /// the [`crate::Reconciler`].
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid, the variant or project is
    /// missing, no serving image can be resolved, the endpoint is busy, or a
    /// platform or record store call fails. Platform resources created before
    /// a failure are not rolled back.
    pub async fn submit_serve(&self, request: &ServeRequest) -> JobResult<Job> {
        let project_name = request.project_name.as_str();
        let variant_name = self.variant_or_default(request.variant_name.as_deref());
        validate_name("project", project_name)?;
        validate_name("variant", variant_name)?;
        let queued_at = self.now();
        let job_name = naming::job_name(project_name, JobType::Serve, queued_at)?;

        let stored = self
            .store
            .get_project_model(project_name, variant_name)
            .await?
            .ok_or_else(|| JobError::VariantNotFound {
                project: project_name.to_owned(),
                variant: variant_name.to_owned(),
            })?;
        let project = self.active_project(project_name).await?;

        let image = request
            .image
            .clone()
            .or_else(|| stored.image_serve.clone())
            .ok_or_else(|| {
                JobError::InvalidRequest(format!("no serving image for variant {variant_name:?}"))
            })?;
        let env = request
            .env
            .clone()
            .or_else(|| stored.env_serve.as_ref().map(|env| env.0.clone()));
        let model_artifacts = match request.model_artifacts.as_deref() {
            Some(value) => Some(self.resolve_artifacts(value).await?),
            None => None,
        };

        let model = self
            .platform
            .create_model(&ModelRequest {
                model_name: job_name.clone(),
                execution_role_arn: self.defaults.execution_role.clone(),
                primary_container: ContainerDefinition {
                    image: image.clone(),
                    model_data_url: model_artifacts.clone(),
                    environment: env.clone(),
                },
            })
            .await?;
        info!(job_name = %job_name, arn = %model.arn, "Registered model");

        let mut job = Job::queued(&job_name, JobType::Serve, project_name, variant_name, queued_at);
        job.image = Some(image);
        job.env = env.map(Json);
        job.model_artifacts = model_artifacts;
        job.model_arn = Some(model.arn);

        let variants = self.store.list_project_models(project_name).await?;
        let plan = plan_traffic(&project, variant_name, &job_name, &variants);
        if plan.is_empty() {
            info!(job_name = %job_name, variant = variant_name, "No endpoint config planned, model only");
        } else {
            let config = self
                .platform
                .create_endpoint_config(&job_name, &plan)
                .await
                .map_err(|source| JobError::EndpointConfigRejected {
                    name: job_name.clone(),
                    source,
                })?;
            job.endpoint_config_arn = Some(config.arn);
            job.spec = Some(to_json(&plan)?);
            job.endpoint_status = self.deploy_endpoint(&job).await?;
        }

        self.store.insert_job(&job).await.map_err(|err| {
            error!(job_name = %job_name, %err, "Serving job could not be recorded");
            JobError::from(err)
        })
    }

    /// Resolves `from-training:<job>` references to the training job's artifacts.
    async fn resolve_artifacts(&self, value: &str) -> JobResult<String> {
        match ArtifactSource::parse(value) {
            ArtifactSource::Location(location) => Ok(location.to_owned()),
            ArtifactSource::TrainingJob(training_job) => {
                validate_name("job", training_job)?;
                let description = self.platform.describe_training_job(training_job).await?;
                description
                    .and_then(|description| description.model_artifacts)
                    .map(|artifacts| artifacts.s3_model_artifacts)
                    .ok_or_else(|| JobError::ArtifactsUnavailable(training_job.to_owned()))
            }
        }
    }

    /// Creates or updates the endpoint named after `job` from its endpoint config.
    ///
    /// An endpoint still provisioning rejects the call; a failed one is
    /// deleted and created again. Returns the endpoint status reported after
    /// the call.
    pub(crate) async fn deploy_endpoint(&self, job: &Job) -> JobResult<JobStatus> {
        let endpoint_name = job.job_name.as_str();
        let config_name = job.job_name.as_str();

        let existing = self.platform.describe_endpoint(endpoint_name).await?;
        let action = match existing.map(|description| description.endpoint_status) {
            Some(state) if state.is_in_progress() => {
                return Err(JobError::EndpointBusy {
                    endpoint: endpoint_name.to_owned(),
                    status: state.into(),
                });
            }
            Some(EndpointState::Failed) => {
                warn!(endpoint = endpoint_name, "Replacing failed endpoint");
                self.platform.delete_endpoint(endpoint_name).await?;
                EndpointAction::Create
            }
            Some(_) => EndpointAction::Update,
            None => EndpointAction::Create,
        };

        let (handle, pending) = match action {
            EndpointAction::Create => (
                self.platform.create_endpoint(endpoint_name, config_name).await?,
                JobStatus::Creating,
            ),
            EndpointAction::Update => (
                self.platform.update_endpoint(endpoint_name, config_name).await?,
                JobStatus::Updating,
            ),
        };

        self.store
            .put_endpoint(&Endpoint {
                endpoint_name: endpoint_name.to_owned(),
                project_name: job.project_name.clone(),
                job_name: job.job_name.clone(),
                endpoint_config_name: config_name.to_owned(),
                endpoint_arn: Some(handle.arn),
                time_updated: Utc::now(),
            })
            .await?;

        let status = self
            .platform
            .describe_endpoint(endpoint_name)
            .await?
            .map_or(pending, |description| description.endpoint_status.into());
        info!(endpoint = endpoint_name, %status, "Endpoint deployment started");
        Ok(status)
    }
}
