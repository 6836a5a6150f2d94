//! HTTP client for the platform's scan and pricing endpoints.
//!
//! All endpoints answer with the `{success, data, error}` envelope. The
//! read side of the polling protocol is behind the `StatusSource` trait
//! so the driver can be exercised against scripted sources in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::{ApiEnvelope, ScanError};
use crate::models::pricing::{RateTable, UserLocation};
use crate::models::scan::{ScanJob, StartScanRequest};

/// Read side of the polling protocol.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Single status read from the primary endpoint.
    async fn fetch_status(&self, job_id: &str) -> Result<ScanJob, ScanError>;

    /// Single read from the deprecated results endpoint.
    async fn fetch_results(&self, job_id: &str) -> Result<ScanJob, ScanError>;
}

/// Client for the platform REST API.
#[derive(Debug, Clone)]
pub struct ScanApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ScanApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, ScanError> {
        let client = Client::builder()
            .user_agent(concat!("seoscope/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("x-request-id", Uuid::new_v4().to_string());
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetch a scan job from the primary status endpoint.
    pub async fn get_scan(&self, job_id: &str) -> Result<ScanJob, ScanError> {
        self.get_job(&format!("/scan/{job_id}"), job_id).await
    }

    /// Fetch a scan job from the deprecated results endpoint.
    pub async fn get_scan_results(&self, job_id: &str) -> Result<ScanJob, ScanError> {
        self.get_job(&format!("/scan/{job_id}/results"), job_id).await
    }

    async fn get_job(&self, path: &str, job_id: &str) -> Result<ScanJob, ScanError> {
        let response = self
            .request(self.client.get(self.url(path)))
            .send()
            .await?;

        // 404 identifies an unknown or expired job regardless of body shape.
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ScanError::NotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(ScanError::Transport(format!(
                "unexpected status {} from {path}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<ScanJob> = response.json().await?;
        unwrap_envelope(envelope)
    }

    /// Submit a new scan for a target URL.
    pub async fn start_scan(&self, target_url: &str) -> Result<ScanJob, ScanError> {
        let request = StartScanRequest {
            url: target_url.to_string(),
        };
        request
            .validate()
            .map_err(|e| ScanError::Invalid(e.to_string()))?;

        let response = self
            .request(self.client.post(self.url("/scan")).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScanError::Transport(format!(
                "unexpected status {} from /scan",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<ScanJob> = response.json().await?;
        unwrap_envelope(envelope)
    }

    /// Current exchange rates against USD.
    pub async fn get_exchange_rates(&self) -> Result<RateTable, ScanError> {
        self.get_data("/pricing/rates").await
    }

    /// Geolocation hint for the caller's display currency.
    pub async fn get_location(&self) -> Result<UserLocation, ScanError> {
        self.get_data("/geo").await
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScanError> {
        let response = self
            .request(self.client.get(self.url(path)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScanError::Transport(format!(
                "unexpected status {} from {path}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, ScanError> {
    if !envelope.success {
        return Err(ScanError::Api(
            envelope
                .error
                .unwrap_or_else(|| "unspecified API error".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| ScanError::Api("envelope missing data".to_string()))
}

#[async_trait]
impl StatusSource for ScanApiClient {
    async fn fetch_status(&self, job_id: &str) -> Result<ScanJob, ScanError> {
        self.get_scan(job_id).await
    }

    async fn fetch_results(&self, job_id: &str) -> Result<ScanJob, ScanError> {
        self.get_scan_results(job_id).await
    }
}
