//! Job lifecycle orchestration for the ML control plane.
//!
//! [`Orchestrator`] turns train and serve submissions into platform calls and
//! job records. [`Reconciler`] polls in-flight serving jobs and promotes the
//! ones whose endpoints came up healthy.

mod catalog;
mod error;
mod orchestrator;
mod reconciler;
pub mod requests;
mod rerun;
mod serve;
mod train;
mod traffic;

pub use error::{ErrorKind, JobError, JobResult};
pub use orchestrator::{Clock, Orchestrator};
pub use reconciler::{Reconciler, SweepReport};
pub use requests::{ProjectUpdate, ServeRequest, TrainRequest, VariantDefaults};
pub use traffic::plan_traffic;
