//! Variant commands.

use anyhow::Result;
use clap::Subcommand;
use ml_structs::{EnvVars, HyperParameters, ServeSpec, TrainSpec};
use orchestrator::VariantDefaults;

use super::{Shim, parse_json, print_json};

#[derive(Subcommand)]
pub enum VariantCommand {
    /// Create a variant or merge new defaults into it
    Put {
        project: String,
        variant: String,

        #[arg(long)]
        image_train: Option<String>,

        #[arg(long)]
        image_serve: Option<String>,

        /// Training resources as JSON, e.g. `{"InstanceType": "ml.p3.2xlarge"}`
        #[arg(long, value_parser = parse_json::<TrainSpec>)]
        spec_train: Option<TrainSpec>,

        /// Serving resources as JSON, e.g. `{"InstanceType": "ml.m4.xlarge"}`
        #[arg(long, value_parser = parse_json::<ServeSpec>)]
        spec_serve: Option<ServeSpec>,

        #[arg(long, value_parser = parse_json::<EnvVars>)]
        env_train: Option<EnvVars>,

        #[arg(long, value_parser = parse_json::<EnvVars>)]
        env_serve: Option<EnvVars>,

        #[arg(long, value_parser = parse_json::<HyperParameters>)]
        hyperparameters: Option<HyperParameters>,
    },

    /// Show the defaults of a variant
    Get { project: String, variant: String },

    /// List the variants of a project
    List { project: String },
}

/// Runs a variant command.
///
/// # Errors
///
/// Returns an error if the operation fails.
pub async fn run(shim: &Shim, command: VariantCommand) -> Result<()> {
    match command {
        VariantCommand::Put {
            project,
            variant,
            image_train,
            image_serve,
            spec_train,
            spec_serve,
            env_train,
            env_serve,
            hyperparameters,
        } => {
            let defaults = VariantDefaults {
                image_train,
                image_serve,
                spec_train,
                spec_serve,
                env_train,
                env_serve,
                hyperparameters,
            };
            print_json(&shim.register_variant(&project, &variant, defaults).await?)
        }
        VariantCommand::Get { project, variant } => {
            print_json(&shim.get_variant(&project, &variant).await?)
        }
        VariantCommand::List { project } => print_json(&shim.list_variants(&project).await?),
    }
}
