use database::StoreError;
use ml_structs::JobStatus;
use ml_structs::naming::NameError;
use platform_client::PlatformError;

/// How a caller should treat a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    /// The request itself is unacceptable; nothing was changed
    Client,
    NotFound,
    /// An optimistic write lost a race; retrying may succeed
    Conflict,
    Server,
}

impl ErrorKind {
    /// Returns true for errors the caller caused, as opposed to the system.
    #[must_use]
    pub const fn is_client_class(self) -> bool {
        matches!(self, Self::Client | Self::NotFound | Self::Conflict)
    }
}

/// Failure of an orchestrator or reconciler operation.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("project {0:?} not found")]
    ProjectNotFound(String),

    #[error("project {0:?} is not active")]
    ProjectInactive(String),

    #[error("variant {variant:?} of project {project:?} not found")]
    VariantNotFound { project: String, variant: String },

    #[error("job {0:?} not found")]
    JobNotFound(String),

    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("endpoint {endpoint:?} is {status}")]
    EndpointBusy { endpoint: String, status: JobStatus },

    #[error("training job {0:?} has no model artifacts")]
    ArtifactsUnavailable(String),

    #[error("endpoint config {name:?} was rejected: {source}")]
    EndpointConfigRejected {
        name: String,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("failed to encode job record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JobError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_)
            | Self::InvalidRequest(_)
            | Self::ProjectInactive(_)
            | Self::EndpointBusy { .. }
            | Self::ArtifactsUnavailable(_)
            | Self::EndpointConfigRejected { .. } => ErrorKind::Client,
            Self::ProjectNotFound(_) | Self::VariantNotFound { .. } | Self::JobNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::Platform(err) if err.is_client_error() => ErrorKind::Client,
            Self::Store(err) if err.is_conflict() => ErrorKind::Conflict,
            Self::Platform(_) | Self::Store(_) | Self::Encode(_) => ErrorKind::Server,
        }
    }
}

pub type JobResult<T> = Result<T, JobError>;
