//! Health prober: periodic liveness checks for every registered instance

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::{Instance, InstanceClient, InstanceRegistry};
use crate::config::HealthCheckConfig;

/// Outcome counts of one probe cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub probed: usize,
    pub healthy: usize,
    pub unhealthy: usize,
}

/// Running probe loop and the sender that stops it
struct ProbeTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// Background prober that keeps registry health flags current
pub struct HealthProber {
    registry: Arc<InstanceRegistry>,
    client: Arc<dyn InstanceClient>,
    config: HealthCheckConfig,
    task: RwLock<Option<ProbeTask>>,
}

impl HealthProber {
    /// Create a new prober
    pub fn new(
        registry: Arc<InstanceRegistry>,
        client: Arc<dyn InstanceClient>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            registry,
            client,
            config,
            task: RwLock::new(None),
        }
    }

    /// Start the probe loop. The first cycle runs immediately.
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.write().await;
        if task.is_some() {
            warn!("Health prober already running");
            return;
        }

        let (shutdown, mut stop_rx) = watch::channel(false);
        let prober = Arc::clone(self);
        let interval = self.config.interval();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tokio::select! {
                            summary = prober.probe_all() => debug!(
                                probed = summary.probed,
                                healthy = summary.healthy,
                                unhealthy = summary.unhealthy,
                                "Probe cycle completed"
                            ),
                            _ = stop_rx.changed() => break,
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        *task = Some(ProbeTask { handle, shutdown });
        info!(
            interval_secs = self.config.interval_secs,
            timeout_ms = self.config.timeout_ms,
            path = %self.config.path,
            "Started health prober"
        );
    }

    /// Signal the loop to stop and wait for it. A cycle in progress is
    /// dropped along with its outstanding probes; health flags already
    /// written stay as they are.
    pub async fn stop(&self) {
        let Some(task) = self.task.write().await.take() else {
            return;
        };

        let _ = task.shutdown.send(true);
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Health prober task ended abnormally");
        }
        info!("Stopped health prober");
    }

    /// Whether the probe loop is running
    pub async fn is_running(&self) -> bool {
        self.task.read().await.is_some()
    }

    /// Probe every instance in a fresh snapshot, at most
    /// `max_concurrency` at a time. One failed probe never affects the
    /// others.
    pub async fn probe_all(&self) -> ProbeSummary {
        let snapshot = self.registry.list();
        let probed = snapshot.len();

        let outcomes: Vec<bool> = stream::iter(snapshot)
            .map(|instance| self.probe_one(instance))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let healthy = outcomes.iter().filter(|ok| **ok).count();
        ProbeSummary {
            probed,
            healthy,
            unhealthy: probed - healthy,
        }
    }

    async fn probe_one(&self, instance: Instance) -> bool {
        let address = instance.address;
        let healthy = match self.client.probe(&address).await {
            Ok(()) => true,
            Err(e) => {
                debug!(backend = %address, error = %e, "Health probe failed");
                false
            }
        };

        if self.registry.set_health(&address, healthy) {
            if healthy {
                info!(backend = %address, "Instance recovered and marked healthy");
            } else {
                warn!(backend = %address, "Instance marked unhealthy by health probe");
            }
        }

        healthy
    }
}
