use crate::error::Result;
use prometheus::{IntCounter, IntGauge, Registry};

/// Counters describing the poll loop.
#[derive(Clone)]
pub struct PollMetrics {
    pub cycles: IntCounter,
    pub skipped: IntCounter,
    pub fetch_failures: IntCounter,
    pub notifications_sent: IntCounter,
    pub delivery_failures: IntCounter,
    pub persist_failures: IntCounter,
    pub tracked_assets: IntGauge,
}

impl PollMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self {
            cycles: IntCounter::new("lst_poll_cycles_total", "Poll cycles started")?,
            skipped: IntCounter::new("lst_poll_skipped_total", "Poll cycles skipped for lack of a delivery target")?,
            fetch_failures: IntCounter::new("lst_fetch_failures_total", "Asset fetches that failed")?,
            notifications_sent: IntCounter::new("lst_notifications_sent_total", "Change notifications delivered")?,
            delivery_failures: IntCounter::new("lst_delivery_failures_total", "Change notifications that could not be delivered")?,
            persist_failures: IntCounter::new("lst_persist_failures_total", "Snapshot writes that failed")?,
            tracked_assets: IntGauge::new("lst_tracked_assets", "Assets in the latest snapshot")?,
        };

        registry.register(Box::new(metrics.cycles.clone()))?;
        registry.register(Box::new(metrics.skipped.clone()))?;
        registry.register(Box::new(metrics.fetch_failures.clone()))?;
        registry.register(Box::new(metrics.notifications_sent.clone()))?;
        registry.register(Box::new(metrics.delivery_failures.clone()))?;
        registry.register(Box::new(metrics.persist_failures.clone()))?;
        registry.register(Box::new(metrics.tracked_assets.clone()))?;

        Ok(metrics)
    }

    /// Metrics bound to a private registry, for callers that never export.
    pub fn unregistered() -> Result<Self> {
        Self::new(&Registry::new())
    }
}
