//! Instance registry: the ordered pool of backend instances
//!
//! Positions are dense (`0..len`) and follow insertion order; they define
//! round-robin order and are what remove-by-index addresses. Every read
//! copies a snapshot out under the shared lock, so callers never hold the
//! lock while they talk to an instance. The dispatch cursor lives beside
//! the lock as an atomic and is never reset.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::backend::instance::{Instance, InstanceAddress};
use crate::config::InstanceConfig;
use crate::error::{AppError, Result};

/// Shared, ordered collection of instances plus the dispatch cursor
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: RwLock<Vec<Instance>>,
    cursor: AtomicUsize,
}

impl InstanceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the seed instances from configuration, in order
    pub fn initialize_from_config(&self, configs: &[InstanceConfig]) -> Result<()> {
        for config in configs {
            self.add(config.address()?);
        }
        Ok(())
    }

    /// Point-in-time copy of the full sequence
    pub fn list(&self) -> Vec<Instance> {
        self.instances.read().clone()
    }

    /// Copy of the instances currently marked healthy, in registry order
    pub fn healthy_subset(&self) -> Vec<Instance> {
        self.instances
            .read()
            .iter()
            .filter(|instance| instance.healthy)
            .cloned()
            .collect()
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a healthy instance and return the new sequence length
    pub fn add(&self, address: InstanceAddress) -> usize {
        let mut instances = self.instances.write();
        instances.push(Instance::new(address));
        instances.len()
    }

    /// Remove the instance at `index` in the full sequence. Later
    /// instances shift down by one.
    pub fn remove_at(&self, index: usize) -> Result<Instance> {
        let mut instances = self.instances.write();
        if index >= instances.len() {
            return Err(AppError::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len: instances.len(),
            });
        }
        Ok(instances.remove(index))
    }

    /// Set the health flag of every instance at `address`.
    ///
    /// Returns `true` if any flag changed. An address that is no longer
    /// registered is ignored: it was removed while its probe or forward
    /// was in flight.
    pub fn set_health(&self, address: &InstanceAddress, healthy: bool) -> bool {
        let mut instances = self.instances.write();
        let mut changed = false;
        let mut found = false;

        for instance in instances.iter_mut().filter(|i| &i.address == address) {
            found = true;
            if instance.healthy != healthy {
                instance.healthy = healthy;
                changed = true;
            }
        }

        if !found {
            debug!(backend = %address, healthy, "Health update for unregistered instance ignored");
        }

        changed
    }

    /// Fetch-and-add on the dispatch cursor, returning the previous value
    pub fn advance_cursor(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed)
    }

    /// Current cursor value
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}
