//! Administrative operations on the instance pool

use std::sync::Arc;
use tracing::info;

use crate::backend::{Instance, InstanceAddress, InstanceRegistry};
use crate::error::{AppError, Result};

/// Add/remove/status over the registry, for the API and the web UI
pub struct AdminInterface {
    registry: Arc<InstanceRegistry>,
}

impl AdminInterface {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self { registry }
    }

    /// Register a new healthy instance and return its position
    pub fn add_instance(&self, address: InstanceAddress) -> usize {
        let index = self.registry.add(address.clone()) - 1;
        info!(backend = %address, index, "Instance added");
        index
    }

    /// Remove the instance at `index` in the full sequence. Snapshots
    /// already taken by the prober or a dispatch are unaffected.
    pub fn remove_instance(&self, index: i64) -> Result<Instance> {
        let position = usize::try_from(index).map_err(|_| AppError::IndexOutOfRange {
            index,
            len: self.registry.len(),
        })?;

        let removed = self.registry.remove_at(position).map_err(|e| match e {
            AppError::IndexOutOfRange { len, .. } => AppError::IndexOutOfRange { index, len },
            other => other,
        })?;

        info!(backend = %removed.address, index, "Instance removed");
        Ok(removed)
    }

    /// Every registered instance with its health flag, in order
    pub fn status(&self) -> Vec<Instance> {
        self.registry.list()
    }
}
