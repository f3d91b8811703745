//! Project commands.

use anyhow::Result;
use clap::Subcommand;
use ml_structs::VariantWeights;
use orchestrator::ProjectUpdate;

use super::{Shim, parse_json, print_json};

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Register a new project
    Create {
        name: String,

        /// Traffic weights per variant as JSON, e.g. `{"a": 0.7, "b": 0.3}`
        #[arg(long, value_parser = parse_json::<VariantWeights>)]
        variants: Option<VariantWeights>,

        /// Record serving jobs without deploying them
        #[arg(long)]
        no_auto_deploy: bool,
    },

    /// Show an active project
    Get { name: String },

    /// List projects
    List {
        /// Include deactivated projects
        #[arg(short, long)]
        all: bool,
    },

    /// Change weights or flags of a project
    Update {
        name: String,

        #[arg(long, value_parser = parse_json::<VariantWeights>)]
        variants: Option<VariantWeights>,

        #[arg(long)]
        auto_deploy: Option<bool>,

        #[arg(long)]
        active: Option<bool>,
    },

    /// Deactivate a project
    Deactivate { name: String },
}

/// Runs a project command.
///
/// # Errors
///
/// Returns an error if the operation fails.
pub async fn run(shim: &Shim, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::Create {
            name,
            variants,
            no_auto_deploy,
        } => {
            let project = shim
                .register_project(&name, variants, no_auto_deploy.then_some(false))
                .await?;
            print_json(&project)
        }
        ProjectCommand::Get { name } => print_json(&shim.get_project(&name).await?),
        ProjectCommand::List { all } => print_json(&shim.list_projects(all).await?),
        ProjectCommand::Update {
            name,
            variants,
            auto_deploy,
            active,
        } => {
            let update = ProjectUpdate {
                variants,
                is_auto_deploy: auto_deploy,
                is_active: active,
            };
            print_json(&shim.update_project(&name, update).await?)
        }
        ProjectCommand::Deactivate { name } => print_json(&shim.deactivate_project(&name).await?),
    }
}
