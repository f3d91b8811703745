//! Name rules imposed by the ML platform on every resource it hosts.

use crate::JobType;

/// Longest name the platform accepts for jobs, models and endpoints.
pub const MAX_NAME_LEN: usize = 63;

/// A name the platform would refuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("invalid {kind} name {name:?}: must match ^[a-zA-Z0-9](-*[a-zA-Z0-9])*$")]
    Pattern { kind: &'static str, name: String },

    #[error("{kind} name {name:?} is longer than {MAX_NAME_LEN} characters")]
    TooLong { kind: &'static str, name: String },
}

/// Returns true if `name` matches `^[a-zA-Z0-9](-*[a-zA-Z0-9])*$` in full.
///
/// # Examples
///
/// ```
/// use ml_structs::naming::is_valid_platform_name;
///
/// assert!(is_valid_platform_name("churn-model-2"));
/// assert!(!is_valid_platform_name("-churn"));
/// assert!(!is_valid_platform_name("churn_model"));
/// ```
#[must_use]
pub fn is_valid_platform_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

/// Checks a user-supplied name against the platform rules.
///
/// # Errors
///
/// Returns an error if the name does not match the pattern or is too long.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), NameError> {
    if !is_valid_platform_name(name) {
        return Err(NameError::Pattern {
            kind,
            name: name.to_owned(),
        });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong {
            kind,
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// Builds the unique job name `{project}-{Train|Serve}-{epoch}`.
///
/// The same name is used for the training job, model, endpoint config and
/// endpoint created on behalf of the job.
///
/// # Errors
///
/// Returns an error if the resulting name is not a valid platform name.
pub fn job_name(project_name: &str, job_type: JobType, epoch_seconds: i64) -> Result<String, NameError> {
    let name = format!("{project_name}-{job_type}-{epoch_seconds}");
    validate_name("job", &name)?;
    Ok(name)
}
