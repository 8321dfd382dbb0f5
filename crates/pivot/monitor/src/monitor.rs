//! Condition monitor
//!
//! Runs one tokio task per condition, each on its own interval. Alerts go
//! into a capacity-bounded in-memory log and onto a broadcast channel.

use crate::alert::{Alert, AlertLevel};
use crate::condition::Condition;
use crate::error::{MonitorError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Channel capacity for monitor events
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Default bound on retained alerts
const DEFAULT_MAX_ALERTS: usize = 1000;

/// Events emitted by the condition monitor
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// An alert was raised
    AlertRaised(Alert),
}

/// Serializable snapshot of one registered condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionInfo {
    pub name: String,
    pub description: String,
    pub level: AlertLevel,
    pub interval_ms: u64,
    pub enabled: bool,
}

struct ConditionHandle {
    condition: Condition,
    enabled: AtomicBool,
}

/// Periodic condition monitor
pub struct ConditionMonitor {
    conditions: DashMap<String, Arc<ConditionHandle>>,
    alerts: RwLock<VecDeque<Alert>>,
    max_alerts: usize,
    running: AtomicBool,
    tasks: DashMap<String, JoinHandle<()>>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl ConditionMonitor {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            conditions: DashMap::new(),
            alerts: RwLock::new(VecDeque::new()),
            max_alerts: DEFAULT_MAX_ALERTS,
            running: AtomicBool::new(false),
            tasks: DashMap::new(),
            event_tx,
        }
    }

    /// Bound the number of retained alerts
    pub fn with_max_alerts(mut self, max_alerts: usize) -> Self {
        self.max_alerts = max_alerts;
        self
    }

    /// Subscribe to monitor events
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Register a condition
    ///
    /// When the monitor is already running, checking begins immediately.
    pub fn add_condition(self: &Arc<Self>, condition: Condition) -> Result<()> {
        let name = condition.name().to_string();
        if self.conditions.contains_key(&name) {
            return Err(MonitorError::ConditionAlreadyExists(name));
        }

        let handle = Arc::new(ConditionHandle {
            condition,
            enabled: AtomicBool::new(true),
        });
        self.conditions.insert(name.clone(), handle.clone());
        debug!(condition = %name, "Condition registered");

        if self.running.load(Ordering::SeqCst) {
            self.spawn_condition_task(name, handle);
        }
        Ok(())
    }

    /// Remove a condition and stop its task
    pub fn remove_condition(&self, name: &str) -> Result<()> {
        if self.conditions.remove(name).is_none() {
            return Err(MonitorError::ConditionNotFound(name.to_string()));
        }
        if let Some((_, task)) = self.tasks.remove(name) {
            task.abort();
        }
        debug!(condition = %name, "Condition removed");
        Ok(())
    }

    /// Enable or disable a condition without removing it
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let handle = self
            .conditions
            .get(name)
            .ok_or_else(|| MonitorError::ConditionNotFound(name.to_string()))?;
        handle.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    /// Start monitoring all registered conditions
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(MonitorError::AlreadyRunning);
        }
        info!(conditions = self.conditions.len(), "Condition monitor started");

        for item in self.conditions.iter() {
            self.spawn_condition_task(item.key().clone(), item.value().clone());
        }
        Ok(())
    }

    /// Stop monitoring; registered conditions and past alerts are kept
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for item in self.tasks.iter() {
            item.value().abort();
        }
        self.tasks.clear();
        info!("Condition monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Evaluate one condition immediately, returning the alert it raised,
    /// if any
    pub async fn check_now(&self, name: &str) -> Result<Option<Alert>> {
        let handle = self
            .conditions
            .get(name)
            .map(|h| h.value().clone())
            .ok_or_else(|| MonitorError::ConditionNotFound(name.to_string()))?;
        Ok(self.check_condition(&handle).await)
    }

    /// Alerts newest-first, optionally filtered by level
    pub async fn alerts(&self, level: Option<AlertLevel>, limit: usize) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .iter()
            .rev()
            .filter(|alert| level.map_or(true, |l| alert.level == l))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop all retained alerts
    pub async fn clear_alerts(&self) {
        self.alerts.write().await.clear();
    }

    /// Snapshot of all registered conditions
    pub fn conditions(&self) -> Vec<ConditionInfo> {
        let mut infos: Vec<ConditionInfo> = self
            .conditions
            .iter()
            .map(|item| {
                let handle = item.value();
                ConditionInfo {
                    name: handle.condition.name.clone(),
                    description: handle.condition.description.clone(),
                    level: handle.condition.level,
                    interval_ms: handle.condition.interval.as_millis() as u64,
                    enabled: handle.enabled.load(Ordering::SeqCst),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    // --- Internal helpers ---

    fn spawn_condition_task(self: &Arc<Self>, name: String, handle: Arc<ConditionHandle>) {
        let monitor = self.clone();
        let interval = handle.condition.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            loop {
                ticker.tick().await;
                if !monitor.running.load(Ordering::SeqCst) {
                    break;
                }
                if !monitor.conditions.contains_key(handle.condition.name()) {
                    break;
                }
                if handle.enabled.load(Ordering::SeqCst) {
                    monitor.check_condition(&handle).await;
                }
            }
        });

        if let Some(previous) = self.tasks.insert(name, task) {
            previous.abort();
        }
    }

    async fn check_condition(&self, handle: &ConditionHandle) -> Option<Alert> {
        let condition = &handle.condition;

        let alert = match condition.check.sample().await {
            Ok(value) => {
                if (condition.validator)(value) {
                    return None;
                }
                Alert::new(
                    condition.level,
                    condition.name.clone(),
                    format!("Condition '{}' failed: {}", condition.name, condition.description),
                    Some(value),
                )
            }
            Err(e) => Alert::new(
                AlertLevel::Error,
                condition.name.clone(),
                format!("Error checking condition '{}': {}", condition.name, e),
                None,
            ),
        };

        warn!(
            condition = %alert.condition,
            level = %alert.level,
            observed = ?alert.observed,
            "{}",
            alert.message
        );
        self.record_alert(alert.clone()).await;
        Some(alert)
    }

    async fn record_alert(&self, alert: Alert) {
        {
            let mut alerts = self.alerts.write().await;
            alerts.push_back(alert.clone());
            while alerts.len() > self.max_alerts {
                alerts.pop_front();
            }
        }
        let _ = self.event_tx.send(MonitorEvent::AlertRaised(alert));
    }
}

impl Default for ConditionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConditionMonitor {
    fn drop(&mut self) {
        for item in self.tasks.iter() {
            item.value().abort();
        }
    }
}
