//! The seam between the orchestrator and the managed ML platform.

use core::future::Future;

use reqwest::StatusCode;
use thiserror::Error;

use crate::api::models::{
    EndpointDescription, ModelRequest, ProductionVariant, TrainingJobDescription,
    TrainingJobRequest,
};

/// Failure of a platform call.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("platform throttled {operation}")]
    Throttled { operation: &'static str },

    #[error("{operation} failed with status {status}: {message}")]
    Api {
        operation: &'static str,
        status: StatusCode,
        message: String,
    },

    #[error("{operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

impl PlatformError {
    /// Returns true for requests the platform refused before accepting them.
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    /// Returns true when the platform rejected the request itself rather than failing to serve it.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Api { status, .. } => status.is_client_error(),
            Self::MissingField { .. } => true,
            Self::Transport(_) | Self::Throttled { .. } => false,
        }
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Name and ARN of a resource the platform accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub name: String,
    pub arn: String,
}

/// Calls the orchestrator makes against the managed ML platform.
///
/// Every resource is addressed by a caller-chosen name. Implementations
/// must not mutate platform state from the `describe_*` calls.
pub trait MlPlatform: Send + Sync {
    fn create_training_job(
        &self,
        request: &TrainingJobRequest,
    ) -> impl Future<Output = PlatformResult<ResourceHandle>> + Send;

    /// Returns `None` when no training job has the given name.
    fn describe_training_job(
        &self,
        name: &str,
    ) -> impl Future<Output = PlatformResult<Option<TrainingJobDescription>>> + Send;

    fn create_model(
        &self,
        request: &ModelRequest,
    ) -> impl Future<Output = PlatformResult<ResourceHandle>> + Send;

    fn create_endpoint_config(
        &self,
        name: &str,
        variants: &[ProductionVariant],
    ) -> impl Future<Output = PlatformResult<ResourceHandle>> + Send;

    fn create_endpoint(
        &self,
        name: &str,
        config_name: &str,
    ) -> impl Future<Output = PlatformResult<ResourceHandle>> + Send;

    fn update_endpoint(
        &self,
        name: &str,
        config_name: &str,
    ) -> impl Future<Output = PlatformResult<ResourceHandle>> + Send;

    /// Returns `None` only when the platform reports that the endpoint does not exist.
    fn describe_endpoint(
        &self,
        name: &str,
    ) -> impl Future<Output = PlatformResult<Option<EndpointDescription>>> + Send;

    /// Deletes an endpoint, returning false if it was already gone.
    fn delete_endpoint(&self, name: &str) -> impl Future<Output = PlatformResult<bool>> + Send;
}
