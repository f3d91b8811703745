//! Common structs for control-plane records shared across crates.
//!
//! Every record here maps onto one collection of the record store. The
//! `sqlx` derives follow the PostgreSQL schema in `crates/database/migrations`.

use std::collections::BTreeMap;

mod endpoint;
mod job;
pub mod json;
pub mod naming;
mod project;

pub use endpoint::*;
pub use job::*;
pub use project::*;
pub use sqlx::types::Json;

/// Environment variables handed to a training or serving container.
pub type EnvVars = BTreeMap<String, String>;

/// Hyperparameters handed to a training container.
pub type HyperParameters = BTreeMap<String, String>;

/// Variant name used when a request does not name one.
pub const DEFAULT_VARIANT: &str = "default";
