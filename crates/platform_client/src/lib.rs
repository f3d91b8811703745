//! Client for the managed ML platform hosting training jobs and endpoints.

pub mod api;
mod platform;

pub use api::client::HttpPlatformClient;
pub use api::models::*;
pub use platform::{MlPlatform, PlatformError, PlatformResult, ResourceHandle};
pub use reqwest::StatusCode;
