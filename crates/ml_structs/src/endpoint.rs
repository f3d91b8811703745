use chrono::{DateTime, Utc};
use serde::Serialize;

/// Bookkeeping row written whenever an endpoint is created or updated.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Endpoint {
    pub endpoint_name: String,
    pub project_name: String,
    pub job_name: String,
    pub endpoint_config_name: String,
    pub endpoint_arn: Option<String>,

    #[serde(with = "crate::json::timestamp")]
    pub time_updated: DateTime<Utc>,
}
