//! Round-robin dispatcher over the healthy subset of the registry
//!
//! Every dispatch filters a fresh snapshot down to healthy instances and
//! picks `cursor mod len` from that subset. The cursor is advanced with a
//! single fetch-and-add and is not serialized with registry mutation, so
//! the rotation is only approximately fair when health or membership
//! changes under concurrent traffic: an instance may be skipped or picked
//! twice in a row around the change. Each request gets exactly one
//! forwarding attempt.

use std::sync::Arc;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::backend::{ForwardRequest, ForwardResponse, Instance, InstanceClient, InstanceRegistry};
use crate::error::{AppError, Result};

/// Selects a healthy instance and forwards work to it
pub struct Dispatcher {
    registry: Arc<InstanceRegistry>,
    client: Arc<dyn InstanceClient>,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(registry: Arc<InstanceRegistry>, client: Arc<dyn InstanceClient>) -> Self {
        Self { registry, client }
    }

    /// Pick the next instance. Leaves the cursor untouched when nothing
    /// is healthy.
    pub fn select(&self) -> Result<Instance> {
        let healthy = self.registry.healthy_subset();
        if healthy.is_empty() {
            return Err(AppError::NoHealthyInstance);
        }

        let cursor = self.registry.advance_cursor();
        let selected = healthy[cursor % healthy.len()].clone();

        debug!(
            backend = %selected.address,
            cursor,
            candidates = healthy.len(),
            "Selected instance"
        );

        Ok(selected)
    }

    /// Forward one unit of work to the next healthy instance.
    ///
    /// A transport failure or timeout marks the selected instance
    /// unhealthy and is returned as `BackendUnreachable`; no other
    /// instance is tried.
    pub async fn dispatch(&self, request: ForwardRequest) -> Result<ForwardResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", %request_id, method = %request.method);

        async move {
            let selected = match self.select() {
                Ok(instance) => instance,
                Err(e) => {
                    warn!("No healthy instance to dispatch to");
                    return Err(e);
                }
            };

            match self.client.forward(&selected.address, request).await {
                Ok(response) => {
                    debug!(
                        backend = %selected.address,
                        status = %response.status,
                        "Relaying backend response"
                    );
                    Ok(response)
                }
                Err(e) => {
                    if self.registry.set_health(&selected.address, false) {
                        warn!(
                            backend = %selected.address,
                            error = %e,
                            "Forward failed, instance marked unhealthy"
                        );
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
