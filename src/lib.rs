//! Instance Balancer
//!
//! A round-robin HTTP load balancer over a live pool of backend instances.
//! A background prober keeps health flags current while requests are
//! dispatched to the healthy subset, and the pool can be edited at runtime
//! through a JSON API or a small web page.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;

pub use error::{AppError, Result};

use std::sync::Arc;

use backend::{http_client::HttpInstanceClient, InstanceClient, InstanceRegistry};
use gateway::{AdminInterface, Dispatcher, HealthProber};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub registry: Arc<InstanceRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub prober: Arc<HealthProber>,
    pub admin: Arc<AdminInterface>,
}

impl AppState {
    /// Wire up all components over the given instance client and register
    /// the configured seed instances. The prober is not started.
    pub fn new(settings: config::Settings, client: Arc<dyn InstanceClient>) -> Result<Self> {
        let registry = Arc::new(InstanceRegistry::new());
        registry.initialize_from_config(&settings.instances)?;

        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), client.clone()));
        let prober = Arc::new(HealthProber::new(
            registry.clone(),
            client,
            settings.health_check.clone(),
        ));
        let admin = Arc::new(AdminInterface::new(registry.clone()));

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            dispatcher,
            prober,
            admin,
        })
    }

    /// Same as [`AppState::new`] with the HTTP client built from settings
    pub fn from_settings(settings: config::Settings) -> Result<Self> {
        let client = Arc::new(HttpInstanceClient::new(&settings)?);
        Self::new(settings, client)
    }
}
