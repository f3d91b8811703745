//! Job commands.

use anyhow::Result;
use clap::Subcommand;
use ml_structs::{EnvVars, HyperParameters, TrainSpec};
use orchestrator::{ServeRequest, TrainRequest};

use super::{Shim, parse_json, print_json};

#[derive(Subcommand)]
pub enum JobCommand {
    /// Submit a training job
    Train {
        project: String,

        /// Variant whose defaults fill omitted fields (default: `default`)
        #[arg(long)]
        variant: Option<String>,

        /// Location of the training data
        #[arg(long)]
        data_input: String,

        /// Location the trained model is written to
        #[arg(long)]
        model_output: String,

        #[arg(long)]
        image: Option<String>,

        #[arg(long, value_parser = parse_json::<TrainSpec>)]
        spec: Option<TrainSpec>,

        #[arg(long, value_parser = parse_json::<EnvVars>)]
        env: Option<EnvVars>,

        #[arg(long, value_parser = parse_json::<HyperParameters>)]
        hyperparameters: Option<HyperParameters>,
    },

    /// Register a model and deploy it when the project auto-deploys
    Serve {
        project: String,

        #[arg(long)]
        variant: Option<String>,

        /// Artifact location, or `from-training:<job>`
        #[arg(long)]
        model_artifacts: Option<String>,

        #[arg(long)]
        image: Option<String>,

        #[arg(long, value_parser = parse_json::<EnvVars>)]
        env: Option<EnvVars>,
    },

    /// Re-apply a serving job's endpoint config
    Rerun { job_name: String },

    /// Show a job
    Get { job_name: String },

    /// List the jobs of a project, newest first
    List { project: String },
}

/// Runs a job command.
///
/// # Errors
///
/// Returns an error if the operation fails.
pub async fn run(shim: &Shim, command: JobCommand) -> Result<()> {
    match command {
        JobCommand::Train {
            project,
            variant,
            data_input,
            model_output,
            image,
            spec,
            env,
            hyperparameters,
        } => {
            let request = TrainRequest {
                project_name: project,
                variant_name: variant,
                data_input,
                model_output,
                image,
                spec,
                env,
                hyperparameters,
            };
            print_json(&shim.submit_train(&request).await?)
        }
        JobCommand::Serve {
            project,
            variant,
            model_artifacts,
            image,
            env,
        } => {
            let request = ServeRequest {
                project_name: project,
                variant_name: variant,
                model_artifacts,
                image,
                env,
            };
            print_json(&shim.submit_serve(&request).await?)
        }
        JobCommand::Rerun { job_name } => print_json(&shim.rerun(&job_name).await?),
        JobCommand::Get { job_name } => print_json(&shim.get_job(&job_name).await?),
        JobCommand::List { project } => print_json(&shim.list_jobs(&project).await?),
    }
}
