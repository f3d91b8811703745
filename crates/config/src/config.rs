use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;
use core::time::Duration;

use anyhow::{Context, Result};
use ml_structs::DEFAULT_VARIANT;

const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Deployment environment selected by `MLSHIM_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Profile {
    Dev,
    Stage,
    Prod,
}

impl Profile {
    /// Record-store schema holding this environment's collections.
    #[must_use]
    pub fn default_schema(self) -> String {
        format!("mlshim_{self}")
    }
}

/// Connection settings for the ML platform gateway.
#[derive(Clone)]
pub struct PlatformConfig {
    /// Base URL of the platform REST gateway
    pub api_url: String,

    /// Bearer token sent with every request
    pub api_key: Option<String>,

    /// Client-side request rate limit
    pub requests_per_second: NonZeroU32,

    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("requests_per_second", &self.requests_per_second)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Values the orchestrator fills into every platform request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDefaults {
    /// Role the platform assumes to run jobs and host models
    pub execution_role: String,

    /// Stopping condition for training jobs
    pub max_runtime_seconds: u32,

    /// How training input is distributed across instances
    pub input_distribution: String,

    /// Variant used when a request names none
    pub default_variant: String,
}

impl DeploymentDefaults {
    /// Creates defaults for the given execution role.
    #[must_use]
    pub fn new(execution_role: impl Into<String>) -> Self {
        Self {
            execution_role: execution_role.into(),
            max_runtime_seconds: 3600,
            input_distribution: "FullyReplicated".to_owned(),
            default_variant: DEFAULT_VARIANT.to_owned(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub profile: Profile,

    /// Database connection URL
    pub database_url: String,

    /// Schema holding the record collections
    pub database_schema: String,

    pub database_max_connections: u32,

    pub platform: PlatformConfig,

    pub deployment: DeploymentDefaults,

    /// Pause between reconciliation sweeps in watch mode
    pub reconcile_interval: Duration,
}

impl Config {
    /// Loads configuration from a `.env` file and the process environment.
    ///
    /// Required environment variables:
    /// - `DATABASE_URL`: `PostgreSQL` connection string
    /// - `PLATFORM_API_URL`: base URL of the ML platform gateway
    /// - `PLATFORM_EXECUTION_ROLE`: role identity passed to the platform
    ///
    /// Optional environment variables:
    /// - `MLSHIM_ENV`: `dev`, `stage` or `prod` (default: `dev`)
    /// - `DATABASE_SCHEMA`: schema name (default: `mlshim_{env}`)
    /// - `DATABASE_MAX_CONNECTIONS` (default: 5)
    /// - `PLATFORM_API_KEY`
    /// - `PLATFORM_REQUESTS_PER_SECOND` (default: 5)
    /// - `PLATFORM_TIMEOUT_SECONDS` (default: 60)
    /// - `TRAINING_MAX_RUNTIME_SECONDS` (default: 3600)
    /// - `RECONCILE_INTERVAL_SECONDS` (default: 60)
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// a value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required keys are missing or a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .with_context(|| format!("{key} environment variable not set"))
        };

        let profile = match lookup("MLSHIM_ENV") {
            Some(raw) => Profile::from_str(&raw).with_context(|| format!("Invalid MLSHIM_ENV: {raw}"))?,
            None => Profile::Dev,
        };

        let database_schema = lookup("DATABASE_SCHEMA").unwrap_or_else(|| profile.default_schema());
        if !is_schema_identifier(&database_schema) {
            anyhow::bail!("Invalid DATABASE_SCHEMA: {database_schema}");
        }

        let mut deployment = DeploymentDefaults::new(required("PLATFORM_EXECUTION_ROLE")?);
        deployment.max_runtime_seconds = parse_or(&lookup, "TRAINING_MAX_RUNTIME_SECONDS", 3600)?;

        let platform = PlatformConfig {
            api_url: required("PLATFORM_API_URL")?.trim_end_matches('/').to_owned(),
            api_key: lookup("PLATFORM_API_KEY").filter(|key| !key.is_empty()),
            requests_per_second: parse_or(&lookup, "PLATFORM_REQUESTS_PER_SECOND", DEFAULT_REQUESTS_PER_SECOND)?,
            timeout: Duration::from_secs(parse_or(&lookup, "PLATFORM_TIMEOUT_SECONDS", 60)?),
        };

        Ok(Self {
            profile,
            database_url: required("DATABASE_URL")?,
            database_schema,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            platform,
            deployment,
            reconcile_interval: Duration::from_secs(parse_or(&lookup, "RECONCILE_INTERVAL_SECONDS", 60)?),
        })
    }
}

/// Parses an optional variable, falling back to `default` when unset.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|err| anyhow::anyhow!("Invalid {key} value {raw:?}: {err}")),
        None => Ok(default),
    }
}

/// Schema names are interpolated into SQL, so only plain lowercase identifiers pass.
fn is_schema_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= 63
}
