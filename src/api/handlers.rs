//! HTTP handlers for the balancer routes

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::api::payload::{AddInstanceInput, AdminPayload, PayloadSource, RemoveInstanceInput};
use crate::backend::{ForwardRequest, InstanceView};
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// `GET /health` — every instance with its flag, in registry order
pub async fn health_status(State(state): State<Arc<AppState>>) -> Json<Vec<InstanceView>> {
    let instances = state.admin.status();
    Json(instances.iter().map(InstanceView::from).collect())
}

/// `/process` — forward to the next healthy instance and relay its answer
pub async fn process(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request = ForwardRequest {
        method,
        query: uri.query().map(str::to_string),
        content_type: headers.get(CONTENT_TYPE).cloned(),
        body,
    };

    // Run the forward on its own task so a disconnecting caller does not
    // cancel the backend call midway.
    let dispatcher = state.dispatcher.clone();
    let relayed = tokio::spawn(async move { dispatcher.dispatch(request).await })
        .await
        .map_err(|e| AppError::Internal(format!("dispatch task failed: {}", e)))??;

    let mut response = Response::builder().status(relayed.status);
    if let Some(content_type) = relayed.content_type {
        response = response.header(CONTENT_TYPE, content_type);
    }
    response
        .body(Body::from(relayed.body))
        .map_err(|e| AppError::Internal(format!("failed to build response: {}", e)))
}

/// `POST /add_instance`
pub async fn add_instance(
    State(state): State<Arc<AppState>>,
    payload: AdminPayload<AddInstanceInput>,
) -> Result<Response> {
    let added = payload
        .value
        .address()
        .map(|address| state.admin.add_instance(address));

    match payload.source {
        PayloadSource::Json => {
            let index = added?;
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse {
                    message: "instance added".to_string(),
                    index: Some(index),
                }),
            )
                .into_response())
        }
        PayloadSource::Form => {
            if let Err(e) = added {
                warn!(error = %e, "Rejected instance submitted from the web UI");
            }
            Ok(Redirect::to("/").into_response())
        }
    }
}

/// `POST /remove_instance`
pub async fn remove_instance(
    State(state): State<Arc<AppState>>,
    payload: AdminPayload<RemoveInstanceInput>,
) -> Result<Response> {
    let removed = state.admin.remove_instance(payload.value.index());

    match payload.source {
        PayloadSource::Json => {
            let instance = removed?;
            Ok(Json(MessageResponse {
                message: format!("instance {} removed", instance.address),
                index: None,
            })
            .into_response())
        }
        PayloadSource::Form => {
            if let Err(e) = removed {
                warn!(error = %e, "Rejected removal submitted from the web UI");
            }
            Ok(Redirect::to("/").into_response())
        }
    }
}
