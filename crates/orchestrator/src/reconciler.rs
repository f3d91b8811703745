//! Periodic sweep that advances in-flight serving jobs.

use core::future::Future;
use core::time::Duration;

use database::{Promotion, RecordStore};
use ml_structs::{Job, JobStatus};
use platform_client::{EndpointState, MlPlatform};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::JobResult;

/// Counts of what one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub promoted: usize,
    pub failed: usize,
    pub unchanged: usize,
    pub errors: usize,
}

enum Outcome {
    Promoted,
    Failed,
    Unchanged,
}

/// Polls endpoints of `Creating` and `Updating` jobs and records their outcome.
pub struct Reconciler<S, P> {
    store: S,
    platform: P,
}

impl<S: RecordStore, P: MlPlatform> Reconciler<S, P> {
    #[must_use]
    pub const fn new(store: S, platform: P) -> Self {
        Self { store, platform }
    }

    /// Runs one pass over every in-flight job.
    ///
    /// A failure on one job is logged and counted in the report; the sweep
    /// carries on with the next job.
    ///
    /// # Errors
    ///
    /// Returns an error only if the in-flight jobs cannot be listed.
    pub async fn sweep(&self) -> JobResult<SweepReport> {
        let mut report = SweepReport::default();

        for status in JobStatus::IN_PROGRESS {
            let jobs = self.store.list_jobs_by_status(status).await?;
            debug!(%status, count = jobs.len(), "Sweeping jobs");

            for job in jobs {
                match self.reconcile_job(&job).await {
                    Ok(Outcome::Promoted) => report.promoted += 1,
                    Ok(Outcome::Failed) => report.failed += 1,
                    Ok(Outcome::Unchanged) => report.unchanged += 1,
                    Err(err) => {
                        error!(job_name = %job.job_name, %err, "Failed to reconcile job");
                        report.errors += 1;
                    }
                }
            }
        }

        info!(
            promoted = report.promoted,
            failed = report.failed,
            unchanged = report.unchanged,
            errors = report.errors,
            "Sweep finished"
        );
        Ok(report)
    }

    async fn reconcile_job(&self, job: &Job) -> JobResult<Outcome> {
        let Some(description) = self.platform.describe_endpoint(&job.job_name).await? else {
            warn!(job_name = %job.job_name, status = %job.endpoint_status, "Endpoint has vanished");
            return Ok(Outcome::Unchanged);
        };

        match description.endpoint_status {
            EndpointState::InService => {
                self.promote(job).await?;
                Ok(Outcome::Promoted)
            }
            EndpointState::Failed => {
                self.store
                    .update_job(&job.with_status(JobStatus::Failed))
                    .await?;
                warn!(
                    job_name = %job.job_name,
                    reason = description.failure_reason.as_deref().unwrap_or("unknown"),
                    "Endpoint failed"
                );
                Ok(Outcome::Failed)
            }
            EndpointState::Creating | EndpointState::Updating => Ok(Outcome::Unchanged),
        }
    }

    /// Marks `job` in service and moves the variant and project pointers to it.
    ///
    /// The bookkeeping is committed as one promotion before the superseded
    /// endpoint is deleted. The endpoint named by the variant's `latest_model`
    /// is deleted even when no job record backs it.
    async fn promote(&self, job: &Job) -> JobResult<()> {
        let project_model = self
            .store
            .get_project_model(&job.project_name, &job.variant_name)
            .await?;

        let superseded = project_model
            .as_ref()
            .and_then(|model| model.latest_model.clone())
            .filter(|previous| *previous != job.job_name);
        let retired = match superseded.as_deref() {
            Some(previous) => self
                .store
                .get_job(previous)
                .await?
                .map(|previous| previous.with_status(JobStatus::Retired)),
            None => None,
        };

        let project_model = project_model.map(|mut model| {
            model.latest_model = Some(job.job_name.clone());
            model
        });
        let project = self
            .store
            .get_project(&job.project_name)
            .await?
            .map(|mut project| {
                project.serving_endpoint = Some(job.job_name.clone());
                project
            });

        self.store
            .promote(&Promotion {
                job: job.with_status(JobStatus::InService),
                retired,
                project_model,
                project,
            })
            .await?;
        info!(
            job_name = %job.job_name,
            project = %job.project_name,
            variant = %job.variant_name,
            superseded = superseded.as_deref(),
            "Promoted job"
        );

        if let Some(previous) = superseded {
            match self.platform.delete_endpoint(&previous).await {
                Ok(deleted) => debug!(endpoint = %previous, deleted, "Removed superseded endpoint"),
                Err(err) => warn!(
                    endpoint = %previous,
                    %err,
                    "Failed to delete superseded endpoint"
                ),
            }
        }
        Ok(())
    }

    /// Sweeps every `interval` until Ctrl-C.
    pub async fn run(&self, interval: Duration) {
        self.run_until(interval, tokio::signal::ctrl_c()).await;
    }

    /// Sweeps every `interval` until `shutdown` resolves.
    ///
    /// Sweep failures are logged and the loop keeps going. A shutdown that
    /// resolves mid-sweep lets the sweep finish, then stops the loop.
    pub async fn run_until<F: Future>(&self, interval: Duration, shutdown: F) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        info!(?interval, "Reconciler started");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Reconciler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep().await {
                        error!(%err, "Sweep failed");
                    }
                }
            }
        }
    }
}
