//! Common traits and types for talking to backend instances

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode};

use crate::backend::instance::InstanceAddress;
use crate::error::Result;

/// One unit of work to forward to an instance
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl ForwardRequest {
    /// A bodiless GET, the shape of requests from the web UI
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            query: None,
            content_type: None,
            body: Bytes::new(),
        }
    }
}

/// Backend response relayed verbatim to the caller
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Outbound HTTP to backend instances.
///
/// Both methods fail with `AppError::BackendUnreachable` when the instance
/// cannot be reached in time. A reachable instance that answers with an
/// error status is a failed probe but a successful forward.
#[async_trait]
pub trait InstanceClient: Send + Sync {
    /// Liveness check; `Ok` only for a 2xx answer
    async fn probe(&self, address: &InstanceAddress) -> Result<()>;

    /// Forward one unit of work and return the backend's answer
    async fn forward(
        &self,
        address: &InstanceAddress,
        request: ForwardRequest,
    ) -> Result<ForwardResponse>;
}
