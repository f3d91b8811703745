//! Project and variant bookkeeping.

use database::{RecordStore, StoreError};
use ml_structs::naming::validate_name;
use ml_structs::{Job, Json, Project, ProjectModel, VariantWeights};
use platform_client::MlPlatform;
use tracing::info;

use crate::{JobError, JobResult, Orchestrator, ProjectUpdate, VariantDefaults};

/// Checks every variant name and weight of a traffic split.
fn validate_weights(weights: &VariantWeights) -> JobResult<()> {
    for (variant_name, weight) in weights {
        validate_name("variant", variant_name)?;
        if !weight.is_finite() || *weight < 0.0 {
            return Err(JobError::InvalidRequest(format!(
                "weight of variant {variant_name:?} must be a finite number >= 0, got {weight}"
            )));
        }
    }
    Ok(())
}

fn already_exists(kind: &'static str, name: &str) -> impl FnOnce(StoreError) -> JobError {
    move |err| match err {
        StoreError::Duplicate { .. } => JobError::AlreadyExists {
            kind,
            name: name.to_owned(),
        },
        other => other.into(),
    }
}

/// Copies every default that is set in `defaults` onto `model`.
fn merge_defaults(model: &mut ProjectModel, defaults: VariantDefaults) {
    let VariantDefaults {
        image_train,
        image_serve,
        spec_train,
        spec_serve,
        env_train,
        env_serve,
        hyperparameters,
    } = defaults;

    if image_train.is_some() {
        model.image_train = image_train;
    }
    if image_serve.is_some() {
        model.image_serve = image_serve;
    }
    if let Some(spec) = spec_train {
        model.spec_train = Some(Json(spec));
    }
    if let Some(spec) = spec_serve {
        model.spec_serve = Some(Json(spec));
    }
    if let Some(env) = env_train {
        model.env_train = Some(Json(env));
    }
    if let Some(env) = env_serve {
        model.env_serve = Some(Json(env));
    }
    if let Some(hyperparameters) = hyperparameters {
        model.hyperparameters = Some(Json(hyperparameters));
    }
}

impl<S: RecordStore, P: MlPlatform> Orchestrator<S, P> {
    /// Registers a project. Omitted settings take the registration defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a name or weight is invalid or the project already exists.
    pub async fn register_project(
        &self,
        project_name: &str,
        variants: Option<VariantWeights>,
        is_auto_deploy: Option<bool>,
    ) -> JobResult<Project> {
        validate_name("project", project_name)?;
        let mut project = Project::new(project_name);
        if let Some(variants) = variants {
            validate_weights(&variants)?;
            project.variants = Json(variants);
        }
        if let Some(is_auto_deploy) = is_auto_deploy {
            project.is_auto_deploy = is_auto_deploy;
        }

        let project = self
            .store
            .insert_project(&project)
            .await
            .map_err(already_exists("project", project_name))?;
        info!(project = project_name, "Registered project");
        Ok(project)
    }

    /// Finds an active project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist or was deactivated.
    pub async fn get_project(&self, project_name: &str) -> JobResult<Project> {
        validate_name("project", project_name)?;
        match self.store.get_project(project_name).await? {
            Some(project) if project.is_active => Ok(project),
            _ => Err(JobError::ProjectNotFound(project_name.to_owned())),
        }
    }

    /// Lists projects, leaving out deactivated ones unless asked for.
    ///
    /// # Errors
    ///
    /// Returns an error if the record store fails.
    pub async fn list_projects(&self, include_inactive: bool) -> JobResult<Vec<Project>> {
        let mut projects = self.store.list_projects().await?;
        projects.retain(|project| include_inactive || project.is_active);
        Ok(projects)
    }

    /// Applies the set fields of `update` to a project, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist, a weight is invalid,
    /// or the project changed since it was read.
    pub async fn update_project(&self, project_name: &str, update: ProjectUpdate) -> JobResult<Project> {
        validate_name("project", project_name)?;
        let mut project = self
            .store
            .get_project(project_name)
            .await?
            .ok_or_else(|| JobError::ProjectNotFound(project_name.to_owned()))?;

        if let Some(variants) = update.variants {
            validate_weights(&variants)?;
            project.variants = Json(variants);
        }
        if let Some(is_auto_deploy) = update.is_auto_deploy {
            project.is_auto_deploy = is_auto_deploy;
        }
        if let Some(is_active) = update.is_active {
            project.is_active = is_active;
        }

        let project = self.store.update_project(&project).await?;
        info!(project = project_name, version = project.version, "Updated project");
        Ok(project)
    }

    /// Soft-deletes a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist or changed concurrently.
    pub async fn deactivate_project(&self, project_name: &str) -> JobResult<Project> {
        self.update_project(
            project_name,
            ProjectUpdate {
                is_active: Some(false),
                ..ProjectUpdate::default()
            },
        )
        .await
    }

    /// Creates a variant, or merges new defaults into an existing one.
    ///
    /// The variant's `latest_model` is never touched here.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid, the project is missing or
    /// inactive, or the variant changed concurrently.
    pub async fn register_variant(
        &self,
        project_name: &str,
        variant_name: &str,
        defaults: VariantDefaults,
    ) -> JobResult<ProjectModel> {
        validate_name("project", project_name)?;
        validate_name("variant", variant_name)?;
        self.active_project(project_name).await?;

        let model = match self.store.get_project_model(project_name, variant_name).await? {
            Some(mut model) => {
                merge_defaults(&mut model, defaults);
                self.store.update_project_model(&model).await?
            }
            None => {
                let mut model = ProjectModel::new(project_name, variant_name);
                merge_defaults(&mut model, defaults);
                self.store
                    .insert_project_model(&model)
                    .await
                    .map_err(already_exists("variant", variant_name))?
            }
        };
        info!(
            project = project_name,
            variant = variant_name,
            version = model.version,
            "Stored variant defaults"
        );
        Ok(model)
    }

    /// Finds the stored defaults of one variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the variant does not exist.
    pub async fn get_variant(&self, project_name: &str, variant_name: &str) -> JobResult<ProjectModel> {
        validate_name("project", project_name)?;
        validate_name("variant", variant_name)?;
        self.store
            .get_project_model(project_name, variant_name)
            .await?
            .ok_or_else(|| JobError::VariantNotFound {
                project: project_name.to_owned(),
                variant: variant_name.to_owned(),
            })
    }

    /// Lists the variants of an active project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist or the store fails.
    pub async fn list_variants(&self, project_name: &str) -> JobResult<Vec<ProjectModel>> {
        self.get_project(project_name).await?;
        Ok(self.store.list_project_models(project_name).await?)
    }

    /// Finds a job by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist.
    pub async fn get_job(&self, job_name: &str) -> JobResult<Job> {
        validate_name("job", job_name)?;
        self.store
            .get_job(job_name)
            .await?
            .ok_or_else(|| JobError::JobNotFound(job_name.to_owned()))
    }

    /// Lists every job of a project, newest first, across all variants.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the store fails.
    pub async fn list_jobs(&self, project_name: &str) -> JobResult<Vec<Job>> {
        validate_name("project", project_name)?;
        Ok(self.store.list_jobs_by_project(project_name).await?)
    }
}
