//! Health aggregator
//!
//! Probing happens without the table's structural lock and without any
//! per-name transition lock, so health queries proceed during in-flight
//! lifecycle operations. An instance mid-replace is served its last cached
//! report; once the swap commits, queries see the new instance.

use crate::error::{HealthError, Result};
use pivot_registry::{InstanceEntry, InstanceTable};
use pivot_types::{
    EventSource, HealthReport, InstanceName, InstanceRecord, PivotEvent, PivotEventEnvelope,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Channel capacity for health events
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Consolidated health reporting over the instance table
pub struct HealthAggregator {
    table: Arc<InstanceTable>,
    event_tx: broadcast::Sender<PivotEventEnvelope>,
}

impl HealthAggregator {
    /// Create an aggregator over a shared instance table
    pub fn new(table: Arc<InstanceTable>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { table, event_tx }
    }

    /// Subscribe to health events
    pub fn subscribe(&self) -> broadcast::Receiver<PivotEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Probe every visible instance and return the consolidated report
    ///
    /// Side effect: each instance's cached last report is updated. Probe
    /// invocation failures are captured as `healthy: false` for that
    /// instance and never propagated.
    #[instrument(skip(self))]
    pub async fn health_all(&self) -> HashMap<InstanceName, HealthReport> {
        let entries = self.table.list().await;
        let mut reports = HashMap::with_capacity(entries.len());

        for entry in entries {
            let record = entry.snapshot().await;
            let report = self.assess(&entry, &record).await;
            reports.insert(record.name, report);
        }

        reports
    }

    /// Probe a single instance by name
    pub async fn probe_instance(&self, name: &InstanceName) -> Result<HealthReport> {
        let entry = self
            .table
            .get(name)
            .await
            .ok_or_else(|| HealthError::InstanceNotFound(name.clone()))?;
        let record = entry.snapshot().await;
        Ok(self.assess(&entry, &record).await)
    }

    /// Produce the report for one entry and update its cache
    async fn assess(&self, entry: &Arc<InstanceEntry>, record: &InstanceRecord) -> HealthReport {
        // Mid-swap instances are not probed; serve the last known health.
        if record.state.is_replacing() {
            return record
                .last_health
                .clone()
                .unwrap_or_else(|| HealthReport::healthy("replacement in progress"));
        }

        let report = match entry.component_type().probe() {
            None => HealthReport::healthy("no probe configured"),
            Some(probe) => match probe.probe(entry.component()).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(name = %record.name, error = %e, "Health probe errored");
                    HealthReport::unhealthy(format!("probe error: {e}"))
                }
            },
        };

        self.cache_and_notify(entry, record, report).await
    }

    async fn cache_and_notify(
        &self,
        entry: &Arc<InstanceEntry>,
        record: &InstanceRecord,
        report: HealthReport,
    ) -> HealthReport {
        let previous = {
            let mut guard = entry.record().write().await;
            guard.last_health.replace(report.clone())
        };

        match previous {
            Some(previous) if previous.healthy != report.healthy => {
                debug!(
                    name = %record.name,
                    healthy = report.healthy,
                    "Health status changed"
                );
                let envelope = PivotEventEnvelope::new(
                    PivotEvent::HealthChanged {
                        name: record.name.clone(),
                        healthy: report.healthy,
                    },
                    EventSource::Health,
                );
                let _ = self.event_tx.send(envelope);
            }
            _ => {}
        }

        report
    }
}
