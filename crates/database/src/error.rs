/// Failures reported by a [`crate::RecordStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} record {key:?} already exists")]
    Duplicate {
        collection: &'static str,
        key: String,
    },

    /// The stored version no longer matches the one the caller read.
    #[error("{collection} record {key:?} was modified concurrently or no longer exists")]
    Conflict {
        collection: &'static str,
        key: String,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn duplicate(collection: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            collection,
            key: key.into(),
        }
    }

    pub(crate) fn conflict(collection: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            collection,
            key: key.into(),
        }
    }

    /// Returns true if the write lost an optimistic-concurrency race.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Duplicate { .. })
    }
}

/// Result alias for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use sqlx::migrate::MigrateError;

    use super::*;

    #[test]
    fn test_migration_failure_is_not_a_conflict() {
        let err = StoreError::from(MigrateError::VersionMissing(20_260_901_000_000));
        assert!(matches!(err, StoreError::Migrate(_)));
        assert!(!err.is_conflict());
        assert!(StoreError::conflict("jobs", "churn-Serve-1").is_conflict());
    }
}
