use database::RecordStore;
use ml_structs::{Job, JobType};
use platform_client::MlPlatform;
use tracing::info;

use crate::{JobError, JobResult, Orchestrator};

impl<S: RecordStore, P: MlPlatform> Orchestrator<S, P> {
    /// Re-applies a serving job's endpoint config to its endpoint.
    ///
    /// An endpoint still provisioning is left alone; the job comes back with
    /// the endpoint's current status but nothing is written. Training jobs
    /// cannot be rerun and are returned as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist, has no endpoint config,
    /// or a platform or record store call fails.
    pub async fn rerun(&self, job_name: &str) -> JobResult<Job> {
        let job = self.get_job(job_name).await?;

        match job.job_type {
            JobType::Train => {
                info!(job_name, "Training jobs cannot be rerun");
                Ok(job)
            }
            JobType::Serve => {
                if job.endpoint_config_arn.is_none() {
                    return Err(JobError::InvalidRequest(format!(
                        "job {job_name:?} has no endpoint config to deploy"
                    )));
                }
                match self.deploy_endpoint(&job).await {
                    Ok(status) => {
                        let job = self.store.update_job(&job.with_status(status)).await?;
                        info!(job_name, %status, "Reran serving job");
                        Ok(job)
                    }
                    Err(JobError::EndpointBusy { status, .. }) => {
                        info!(job_name, %status, "Endpoint is busy, nothing to rerun");
                        Ok(job.with_status(status))
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }
}
