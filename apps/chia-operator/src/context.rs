use std::sync::Arc;
use std::time::Duration;

use chia_core::{Backoff, Cluster, EventPublisher, Ledger, OperatorMetrics};

use crate::config::{ImageDefaults, OperatorConfig};

/// Reconcile timings and defaults taken from configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub images: ImageDefaults,
    pub status_conflict_requeue: Duration,
    pub not_ready_requeue: Duration,
    pub resync: Duration,
}

impl Settings {
    pub fn from_config(cfg: &OperatorConfig) -> Self {
        Self {
            images: cfg.images.clone(),
            status_conflict_requeue: Duration::from_secs(cfg.reconcile.status_conflict_requeue_secs),
            not_ready_requeue: Duration::from_secs(cfg.reconcile.not_ready_requeue_secs),
            resync: Duration::from_secs(cfg.reconcile.resync_secs),
        }
    }
}

/// State shared by every controller; one per process.
pub struct Context<C> {
    pub cluster: C,
    pub events: Arc<dyn EventPublisher>,
    pub ledger: Arc<Ledger>,
    pub metrics: Arc<OperatorMetrics>,
    pub backoff: Backoff,
    pub settings: Settings,
}

impl<C: Cluster> Context<C> {
    pub fn new(
        cluster: C,
        events: Arc<dyn EventPublisher>,
        metrics: Arc<OperatorMetrics>,
        cfg: &OperatorConfig,
    ) -> Self {
        Self {
            cluster,
            events,
            ledger: Arc::new(Ledger::new(metrics.clone())),
            metrics,
            backoff: Backoff::new(cfg.reconcile.backoff_base(), cfg.reconcile.backoff_max()),
            settings: Settings::from_config(cfg),
        }
    }
}
