//! HTTP client for backend instances

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::backend::instance::InstanceAddress;
use crate::backend::traits::{ForwardRequest, ForwardResponse, InstanceClient};
use crate::config::Settings;
use crate::error::{AppError, Result};

/// `reqwest`-backed instance client
pub struct HttpInstanceClient {
    client: Client,
    health_check_path: String,
    probe_timeout: Duration,
    process_path: String,
    forward_timeout: Duration,
}

impl HttpInstanceClient {
    /// Create a client using the probe and dispatch settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("instance-balancer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            health_check_path: settings.health_check.path.clone(),
            probe_timeout: settings.health_check.timeout(),
            process_path: settings.dispatch.path.clone(),
            forward_timeout: settings.dispatch.timeout(),
        })
    }
}

fn unreachable(address: &InstanceAddress, error: reqwest::Error) -> AppError {
    let reason = if error.is_timeout() {
        "timed out".to_string()
    } else {
        error.to_string()
    };
    AppError::BackendUnreachable {
        address: address.to_string(),
        reason,
    }
}

#[async_trait]
impl InstanceClient for HttpInstanceClient {
    async fn probe(&self, address: &InstanceAddress) -> Result<()> {
        let url = address.url(&self.health_check_path, None);

        let response = self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| unreachable(address, e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::BackendUnreachable {
                address: address.to_string(),
                reason: format!("health check returned {}", response.status()),
            })
        }
    }

    async fn forward(
        &self,
        address: &InstanceAddress,
        request: ForwardRequest,
    ) -> Result<ForwardResponse> {
        let query = request.query.as_deref().filter(|q| !q.is_empty());
        let url = address.url(&self.process_path, query);

        // reqwest 0.11 carries its own `http` types; cross over by value
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| AppError::InvalidRequest(format!("unsupported method: {}", e)))?;

        debug!(backend = %address, url = %url, "Forwarding request");

        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.forward_timeout);
        if let Some(content_type) = request.content_type.as_ref() {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type.as_bytes());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(|e| unreachable(address, e))?;

        let status = StatusCode::from_u16(response.status().as_u16()).map_err(|e| {
            AppError::Internal(format!("backend {} sent invalid status: {}", address, e))
        })?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| HeaderValue::from_bytes(value.as_bytes()).ok());
        let body = response.bytes().await.map_err(|e| unreachable(address, e))?;

        Ok(ForwardResponse {
            status,
            content_type,
            body,
        })
    }
}
