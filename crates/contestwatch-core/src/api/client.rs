//! API client for the upstream contest listing service.
//!
//! One request per call: retries, backoff and rate limiting belong to the
//! fetch orchestrator, which owns the cache fallback policy.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::{ApiError, ContestQuery, ContestSource};
use crate::models::{ContestsResponse, RawContest};

/// Default listing endpoint.
pub const DEFAULT_BASE_URL: &str = "https://clist.by/api/v2/contest/";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// API client for the contest listing service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref key) = self.api_key {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("ApiKey {}", key))
                    .map_err(|_| ApiError::InvalidApiKey)?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl ContestSource for ApiClient {
    async fn fetch_contests(&self, query: &ContestQuery) -> Result<Vec<RawContest>, ApiError> {
        let response = self
            .client
            .get(&self.base_url)
            .headers(self.auth_headers()?)
            .query(&query.params())
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        let parsed: ContestsResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse contest listing: {}", e)))?;

        debug!(resource = %query.resource, count = parsed.objects.len(), "Contest listing received");
        Ok(parsed.objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: Option<&str>) -> ApiClient {
        ApiClient::new(
            DEFAULT_BASE_URL,
            api_key.map(str::to_string),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
        .unwrap()
    }

    #[test]
    fn test_auth_header_uses_api_key_scheme() {
        let headers = client(Some("user:secret")).auth_headers().unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "ApiKey user:secret"
        );
    }

    #[test]
    fn test_no_key_sends_no_auth_header() {
        let headers = client(None).auth_headers().unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let result = client(Some("bad\nkey")).auth_headers();
        assert!(matches!(result, Err(ApiError::InvalidApiKey)));
    }
}
