//! Rate-limited HTTP client for the ML platform's REST gateway.

use core::time::Duration;
use std::sync::Arc;

use backon::{ExponentialBuilder, Retryable};
use config::PlatformConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::models::{
    CreateEndpointConfigResponse, CreateModelResponse, CreateTrainingJobResponse,
    EndpointConfigRequest, EndpointDescription, EndpointRequest, EndpointResponse, ModelRequest,
    ProductionVariant, TrainingJobDescription, TrainingJobRequest,
};
use crate::platform::{MlPlatform, PlatformError, PlatformResult, ResourceHandle};

/// Attempts made for a throttled request after the first one.
const MAX_THROTTLE_RETRIES: usize = 3;

type RateLimiterType = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate-limited client for the platform gateway.
#[derive(Clone)]
pub struct HttpPlatformClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    limiter: Arc<RateLimiterType>,
}

impl HttpPlatformClient {
    /// Creates a new client with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &PlatformConfig) -> PlatformResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let limiter = RateLimiter::direct(Quota::per_second(config.requests_per_second));

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            limiter: Arc::new(limiter),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Sends a request, retrying only while the platform throttles it.
    ///
    /// Returns `None` for a 404 so callers can decide whether absence is an error.
    async fn execute(
        &self,
        operation: &'static str,
        build: impl Fn() -> RequestBuilder + Send + Sync,
    ) -> PlatformResult<Option<Response>> {
        (|| async {
            self.limiter.until_ready().await;
            debug!(operation, "Sending platform request");

            let response = build().send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(PlatformError::Throttled { operation });
            }
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(PlatformError::Api {
                    operation,
                    status,
                    message,
                });
            }

            Ok(Some(response))
        })
        .retry(
            ExponentialBuilder::default()
                .with_max_times(MAX_THROTTLE_RETRIES)
                .with_min_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(8)),
        )
        .when(PlatformError::is_throttled)
        .notify(|_, delay| {
            warn!(operation, ?delay, "Rate limited (429), will retry");
        })
        .await
    }

    /// Like [`Self::execute`], but a 404 is an error.
    async fn execute_json<R: DeserializeOwned>(
        &self,
        operation: &'static str,
        build: impl Fn() -> RequestBuilder + Send + Sync,
    ) -> PlatformResult<R> {
        let response = self
            .execute(operation, build)
            .await?
            .ok_or_else(|| PlatformError::Api {
                operation,
                status: StatusCode::NOT_FOUND,
                message: "resource not found".to_owned(),
            })?;
        Ok(response.json().await?)
    }
}

fn handle(
    operation: &'static str,
    name: &str,
    arn: Option<String>,
    field: &'static str,
) -> PlatformResult<ResourceHandle> {
    let arn = arn
        .filter(|arn| !arn.is_empty())
        .ok_or(PlatformError::MissingField { operation, field })?;
    Ok(ResourceHandle {
        name: name.to_owned(),
        arn,
    })
}

impl MlPlatform for HttpPlatformClient {
    async fn create_training_job(
        &self,
        request: &TrainingJobRequest,
    ) -> PlatformResult<ResourceHandle> {
        const OPERATION: &str = "create_training_job";
        info!(job_name = %request.training_job_name, "Creating training job");

        let response: CreateTrainingJobResponse = self
            .execute_json(OPERATION, || {
                self.request(reqwest::Method::POST, "/training-jobs").json(request)
            })
            .await?;
        handle(
            OPERATION,
            &request.training_job_name,
            response.training_job_arn,
            "TrainingJobArn",
        )
    }

    async fn describe_training_job(
        &self,
        name: &str,
    ) -> PlatformResult<Option<TrainingJobDescription>> {
        let path = format!("/training-jobs/{name}");
        let Some(response) = self
            .execute("describe_training_job", || {
                self.request(reqwest::Method::GET, &path)
            })
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(response.json().await?))
    }

    async fn create_model(&self, request: &ModelRequest) -> PlatformResult<ResourceHandle> {
        const OPERATION: &str = "create_model";
        info!(model_name = %request.model_name, image = %request.primary_container.image, "Creating model");

        let response: CreateModelResponse = self
            .execute_json(OPERATION, || {
                self.request(reqwest::Method::POST, "/models").json(request)
            })
            .await?;
        handle(OPERATION, &request.model_name, response.model_arn, "ModelArn")
    }

    async fn create_endpoint_config(
        &self,
        name: &str,
        variants: &[ProductionVariant],
    ) -> PlatformResult<ResourceHandle> {
        const OPERATION: &str = "create_endpoint_config";
        info!(
            endpoint_config = name,
            variants = variants.len(),
            "Creating endpoint config"
        );

        let body = EndpointConfigRequest {
            endpoint_config_name: name,
            production_variants: variants,
        };
        let response: CreateEndpointConfigResponse = self
            .execute_json(OPERATION, || {
                self.request(reqwest::Method::POST, "/endpoint-configs")
                    .json(&body)
            })
            .await?;
        handle(
            OPERATION,
            name,
            response.endpoint_config_arn,
            "EndpointConfigArn",
        )
    }

    async fn create_endpoint(
        &self,
        name: &str,
        config_name: &str,
    ) -> PlatformResult<ResourceHandle> {
        const OPERATION: &str = "create_endpoint";
        info!(endpoint = name, endpoint_config = config_name, "Creating endpoint");

        let body = EndpointRequest {
            endpoint_name: Some(name),
            endpoint_config_name: config_name,
        };
        let response: EndpointResponse = self
            .execute_json(OPERATION, || {
                self.request(reqwest::Method::POST, "/endpoints").json(&body)
            })
            .await?;
        handle(OPERATION, name, response.endpoint_arn, "EndpointArn")
    }

    async fn update_endpoint(
        &self,
        name: &str,
        config_name: &str,
    ) -> PlatformResult<ResourceHandle> {
        const OPERATION: &str = "update_endpoint";
        info!(endpoint = name, endpoint_config = config_name, "Updating endpoint");

        let path = format!("/endpoints/{name}");
        let body = EndpointRequest {
            endpoint_name: None,
            endpoint_config_name: config_name,
        };
        let response: EndpointResponse = self
            .execute_json(OPERATION, || {
                self.request(reqwest::Method::PUT, &path).json(&body)
            })
            .await?;
        handle(OPERATION, name, response.endpoint_arn, "EndpointArn")
    }

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<Option<EndpointDescription>> {
        let path = format!("/endpoints/{name}");
        let Some(response) = self
            .execute("describe_endpoint", || {
                self.request(reqwest::Method::GET, &path)
            })
            .await?
        else {
            debug!(endpoint = name, "Endpoint does not exist");
            return Ok(None);
        };
        Ok(Some(response.json().await?))
    }

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<bool> {
        info!(endpoint = name, "Deleting endpoint");

        let path = format!("/endpoints/{name}");
        let deleted = self
            .execute("delete_endpoint", || {
                self.request(reqwest::Method::DELETE, &path)
            })
            .await?
            .is_some();
        if !deleted {
            debug!(endpoint = name, "Endpoint was already gone");
        }
        Ok(deleted)
    }
}
