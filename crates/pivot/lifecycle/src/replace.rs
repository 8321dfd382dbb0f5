//! Replace (hot-swap) protocol
//!
//! Supersedes a named, possibly-running instance with a freshly constructed
//! one - same or different type/config - with no observable gap in service
//! and no partial state left behind on failure.
//!
//! The protocol is make-before-break: the replacement is constructed,
//! health-verified, and (when the old instance is running) started while
//! the old instance is still live under its name. Only then is the table
//! slot swapped in a single atomic assignment; the old component is stopped
//! afterwards. Any failure before the swap restores the old instance's
//! state and discards the staged component, so a rejected replace leaves
//! the old instance fully operational.

use crate::controller::LifecycleController;
use crate::error::{LifecycleError, Result};
use pivot_config::ConfigSource;
use pivot_registry::InstanceEntry;
use pivot_types::{InstanceName, InstanceRecord, InstanceState, PivotEvent, TypeName};
use std::sync::Arc;
use tracing::{info, instrument, warn};

impl LifecycleController {
    /// Replace the instance live under `name`
    ///
    /// `new_type`/`new_config` default to the current instance's type and
    /// config (with a fresh load from the configuration source when one is
    /// attached). Fails `Busy` immediately when a replace is already in
    /// flight for the name - replacement is never queued.
    #[instrument(skip(self, new_config), fields(name = %name))]
    pub async fn replace(
        &self,
        name: &InstanceName,
        new_type: Option<TypeName>,
        new_config: Option<serde_json::Value>,
    ) -> Result<InstanceRecord> {
        // 1. Take the per-name lock without waiting; a held lock means an
        //    operation (possibly another replace) is in flight
        let (entry, _guard) = loop {
            let entry = self.table().get_required(name).await?;
            let Ok(guard) = entry.try_lock_transition() else {
                return Err(LifecycleError::Busy(name.clone()));
            };
            // Re-resolve if the entry was superseded between lookup and lock.
            if self.table().is_current(name, &entry).await {
                break (entry, guard);
            }
        };

        let prior = entry.snapshot().await;
        if prior.state.is_replacing() {
            return Err(LifecycleError::Busy(name.clone()));
        }

        // 2. Resolve the target type before entering the overlay state, so
        //    an unknown type never disturbs the instance
        let target_type = new_type.unwrap_or_else(|| prior.type_name.clone());
        let ty = self.types().resolve(&target_type).await?;

        entry
            .record()
            .write()
            .await
            .transition(InstanceState::Replacing);
        self.emit(PivotEvent::ReplaceStarted { name: name.clone() });
        info!(name = %name, target_type = %target_type, "Replace staging started");

        // 3. Construct the staged component; it is not yet reachable by name
        let config = match self.replacement_config(&target_type, new_config, &prior).await {
            Ok(config) => config,
            Err(e) => return Err(self.reject(&entry, &prior, name, e.to_string()).await),
        };

        let staged = match ty.factory().construct(&config).await {
            Ok(staged) => staged,
            Err(e) => {
                let reason = format!("construction failed: {e}");
                return Err(self.reject(&entry, &prior, name, reason).await);
            }
        };

        // 4. Health-verify the staged component when the type has a probe
        let staged_health = match ty.probe() {
            Some(probe) => match probe.probe(staged.as_ref()).await {
                Ok(report) if report.healthy => Some(report),
                Ok(report) => {
                    let reason = format!("staged instance unhealthy: {}", report.detail);
                    return Err(self.reject(&entry, &prior, name, reason).await);
                }
                Err(e) => {
                    let reason = format!("staged health probe failed: {e}");
                    return Err(self.reject(&entry, &prior, name, reason).await);
                }
            },
            None => None,
        };

        // 5. Make-before-break: a running instance is superseded by a
        //    running replacement, never by a cold one
        if prior.state.is_running() {
            if let Err(e) = staged.start().await {
                let reason = format!("staged instance failed to start: {e}");
                return Err(self.reject(&entry, &prior, name, reason).await);
            }
        }

        // 6. Commit: single slot assignment under the structural lock
        let mut record = InstanceRecord::new(name.clone(), target_type.clone(), config);
        if prior.state.is_running() {
            record.transition(InstanceState::Running);
        }
        record.last_health = staged_health;

        let replacement = Arc::new(InstanceEntry::new(record.clone(), staged, ty));
        let old = self.table().swap(name, replacement).await?;

        // 7. Decommission the old component. The swap is already committed;
        //    a stop failure here is logged, never rolled back
        if prior.state.is_running() {
            if let Err(e) = old.component().stop().await {
                warn!(name = %name, error = %e, "Failed to stop superseded instance");
            }
        }

        self.emit(PivotEvent::ReplaceCompleted {
            name: name.clone(),
            type_name: target_type.clone(),
        });
        info!(name = %name, type_name = %target_type, "Replace committed");

        Ok(record)
    }

    /// Config for the replacement: explicit > fresh source load > reuse old
    async fn replacement_config(
        &self,
        target_type: &TypeName,
        explicit: Option<serde_json::Value>,
        prior: &InstanceRecord,
    ) -> Result<serde_json::Value> {
        if let Some(config) = explicit {
            return Ok(config);
        }
        if let Some(source) = self.config_source() {
            if let Some(config) = source.load(target_type).await? {
                return Ok(config);
            }
        }
        Ok(prior.config.clone())
    }

    /// Abandon a replace: restore the old instance's state, discard the
    /// staged component, and report why
    async fn reject(
        &self,
        entry: &Arc<InstanceEntry>,
        prior: &InstanceRecord,
        name: &InstanceName,
        reason: String,
    ) -> LifecycleError {
        entry.record().write().await.transition(prior.state);
        self.emit(PivotEvent::ReplaceRejected {
            name: name.clone(),
            reason: reason.clone(),
        });
        warn!(name = %name, reason = %reason, "Replace rejected; existing instance untouched");
        LifecycleError::ReplacementRejected {
            name: name.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pivot_registry::{
        Component, ComponentError, ComponentFactory, ComponentType, HealthProbe, RegistryError,
    };
    use pivot_types::HealthReport;
    use std::any::Any;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Component whose behavior is driven by its config blob
    struct RiggedComponent {
        running: AtomicBool,
        fail_start: bool,
        healthy: bool,
        probe_error: bool,
        gain: f64,
    }

    #[async_trait]
    impl Component for RiggedComponent {
        async fn start(&self) -> std::result::Result<(), ComponentError> {
            if self.fail_start {
                return Err(ComponentError::new("rigged start failure"));
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> std::result::Result<(), ComponentError> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(serde::Deserialize, Default)]
    #[serde(deny_unknown_fields, default)]
    struct RiggedConfig {
        fail_construct: bool,
        fail_start: bool,
        unhealthy: bool,
        probe_error: bool,
        gain: f64,
    }

    /// Factory for rigged components; optionally gated on a notify so tests
    /// can hold a replace open mid-staging
    struct RiggedFactory {
        gate: Option<Arc<Notify>>,
    }

    impl RiggedFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self { gate: None })
        }

        fn gated(gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self { gate: Some(gate) })
        }
    }

    #[async_trait]
    impl ComponentFactory for RiggedFactory {
        async fn construct(
            &self,
            config: &serde_json::Value,
        ) -> std::result::Result<Box<dyn Component>, ComponentError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let config: RiggedConfig = serde_json::from_value(config.clone())
                .map_err(|e| ComponentError::new(e.to_string()))?;
            if config.fail_construct {
                return Err(ComponentError::new("rigged construction failure"));
            }
            Ok(Box::new(RiggedComponent {
                running: AtomicBool::new(false),
                fail_start: config.fail_start,
                healthy: !config.unhealthy,
                probe_error: config.probe_error,
                gain: config.gain,
            }))
        }
    }

    struct RiggedProbe;

    #[async_trait]
    impl HealthProbe for RiggedProbe {
        async fn probe(
            &self,
            component: &dyn Component,
        ) -> std::result::Result<HealthReport, ComponentError> {
            let Some(rigged) = component.as_any().downcast_ref::<RiggedComponent>() else {
                return Err(ComponentError::new("unexpected component type"));
            };
            if rigged.probe_error {
                return Err(ComponentError::new("rigged probe explosion"));
            }
            if rigged.healthy {
                Ok(HealthReport::healthy(format!("gain={}", rigged.gain)))
            } else {
                Ok(HealthReport::unhealthy("rigged unhealthy"))
            }
        }
    }

    async fn rigged_controller() -> LifecycleController {
        let controller = LifecycleController::new();
        controller
            .register_type(
                ComponentType::new("rigged", RiggedFactory::new()).with_probe(Arc::new(RiggedProbe)),
            )
            .await
            .unwrap();
        controller
    }

    fn name(s: &str) -> InstanceName {
        InstanceName::new(s)
    }

    #[tokio::test]
    async fn test_replace_running_instance_swaps_atomically() {
        let controller = rigged_controller().await;
        controller
            .create(name("s1"), TypeName::new("rigged"), None)
            .await
            .unwrap();
        controller.start(&name("s1")).await.unwrap();
        let old = controller.get(&name("s1")).await.unwrap();

        let record = controller
            .replace(&name("s1"), None, Some(serde_json::json!({ "gain": 2.0 })))
            .await
            .unwrap();

        // New instance is live under the old name, already running,
        // with the staging probe's report cached.
        assert_eq!(record.state, InstanceState::Running);
        assert_eq!(record.config, serde_json::json!({ "gain": 2.0 }));
        assert!(record.last_health.unwrap().healthy);

        let live = controller.get(&name("s1")).await.unwrap();
        assert_eq!(live.state, InstanceState::Running);
        assert!(live.created_at > old.created_at);
    }

    #[tokio::test]
    async fn test_replace_stopped_instance_stays_cold() {
        let controller = rigged_controller().await;
        controller
            .create(name("s1"), TypeName::new("rigged"), None)
            .await
            .unwrap();

        let record = controller.replace(&name("s1"), None, None).await.unwrap();
        assert_eq!(record.state, InstanceState::Created);
    }

    #[tokio::test]
    async fn test_rejected_replace_leaves_old_instance_untouched() {
        let controller = rigged_controller().await;
        controller
            .create(name("s1"), TypeName::new("rigged"), Some(serde_json::json!({ "gain": 1.0 })))
            .await
            .unwrap();
        controller.start(&name("s1")).await.unwrap();
        let old = controller.get(&name("s1")).await.unwrap();

        for bad_config in [
            serde_json::json!({ "fail_construct": true }),
            serde_json::json!({ "unhealthy": true }),
            serde_json::json!({ "probe_error": true }),
            serde_json::json!({ "fail_start": true }),
        ] {
            let err = controller
                .replace(&name("s1"), None, Some(bad_config))
                .await
                .unwrap_err();
            assert!(matches!(err, LifecycleError::ReplacementRejected { .. }));

            let live = controller.get(&name("s1")).await.unwrap();
            assert_eq!(live.created_at, old.created_at);
            assert_eq!(live.state, InstanceState::Running);
            assert_eq!(live.config, serde_json::json!({ "gain": 1.0 }));
        }
    }

    #[tokio::test]
    async fn test_replace_unknown_type_fails_before_staging() {
        let controller = rigged_controller().await;
        controller
            .create(name("s1"), TypeName::new("rigged"), None)
            .await
            .unwrap();

        let err = controller
            .replace(&name("s1"), Some(TypeName::new("ghost")), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Registry(RegistryError::TypeNotFound(_))
        ));

        // Never entered the overlay state.
        let live = controller.get(&name("s1")).await.unwrap();
        assert_eq!(live.state, InstanceState::Created);
    }

    #[tokio::test]
    async fn test_replace_can_change_type() {
        let controller = rigged_controller().await;
        controller
            .register_type(ComponentType::new("plain", RiggedFactory::new()))
            .await
            .unwrap();
        controller
            .create(name("s1"), TypeName::new("rigged"), None)
            .await
            .unwrap();
        controller.start(&name("s1")).await.unwrap();

        let record = controller
            .replace(&name("s1"), Some(TypeName::new("plain")), None)
            .await
            .unwrap();
        assert_eq!(record.type_name, TypeName::new("plain"));
        assert_eq!(record.state, InstanceState::Running);
        // "plain" has no probe, so nothing was verified or cached.
        assert!(record.last_health.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_replace_one_wins_one_busy() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(LifecycleController::new());
        controller
            .register_type(ComponentType::new("gated", RiggedFactory::gated(gate.clone())))
            .await
            .unwrap();

        // Create goes through the same gated factory.
        let create = {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .create(name("s1"), TypeName::new("gated"), None)
                    .await
            })
        };
        gate.notify_one();
        create.await.unwrap().unwrap();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.replace(&name("s1"), None, None).await })
        };

        // Wait until the first replace is parked inside the factory.
        let mut tries = 0;
        while controller.get(&name("s1")).await.unwrap().state != InstanceState::Replacing {
            tries += 1;
            assert!(tries < 100, "first replace never reached staging");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let err = controller.replace(&name("s1"), None, None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Busy(_)));

        // Ops other than replace are refused during the overlay, too.
        let err = controller.start(&name("s1")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Busy(_)));

        gate.notify_one();
        first.await.unwrap().unwrap();

        let live = controller.get(&name("s1")).await.unwrap();
        assert_eq!(live.state, InstanceState::Created);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_service_gap_during_replace() {
        use pivot_health::HealthAggregator;

        let gate = Arc::new(Notify::new());
        let controller = Arc::new(LifecycleController::new());
        controller
            .register_type(
                ComponentType::new("gated", RiggedFactory::gated(gate.clone()))
                    .with_probe(Arc::new(RiggedProbe)),
            )
            .await
            .unwrap();

        let create = {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .create(name("s1"), TypeName::new("gated"), None)
                    .await
            })
        };
        gate.notify_one();
        create.await.unwrap().unwrap();
        controller.start(&name("s1")).await.unwrap();

        let aggregator = HealthAggregator::new(controller.instance_table());
        // Seed the cache so mid-replace queries have a report to serve.
        aggregator.health_all().await;

        let replace = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.replace(&name("s1"), None, None).await })
        };

        let mut tries = 0;
        while controller.get(&name("s1")).await.unwrap().state != InstanceState::Replacing {
            tries += 1;
            assert!(tries < 100, "replace never reached staging");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        // Mid-replace, the name still resolves and reports health.
        let reports = aggregator.health_all().await;
        let report = reports.get(&name("s1")).expect("name must stay visible");
        assert!(report.healthy);

        gate.notify_one();
        replace.await.unwrap().unwrap();

        let reports = aggregator.health_all().await;
        assert!(reports.get(&name("s1")).expect("still visible").healthy);
    }

    #[tokio::test]
    async fn test_replace_reuses_old_config_by_default() {
        let controller = rigged_controller().await;
        controller
            .create(name("s1"), TypeName::new("rigged"), Some(serde_json::json!({ "gain": 3.5 })))
            .await
            .unwrap();

        let record = controller.replace(&name("s1"), None, None).await.unwrap();
        assert_eq!(record.config, serde_json::json!({ "gain": 3.5 }));
    }

    #[tokio::test]
    async fn test_replace_picks_up_reloaded_config() {
        use pivot_config::{ConfigSource, MemoryConfigSource};

        let source = Arc::new(MemoryConfigSource::new());
        let controller = LifecycleController::new().with_config_source(source.clone());
        controller
            .register_type(
                ComponentType::new("rigged", RiggedFactory::new()).with_probe(Arc::new(RiggedProbe)),
            )
            .await
            .unwrap();
        controller
            .create(name("s1"), TypeName::new("rigged"), None)
            .await
            .unwrap();

        source.set("rigged", serde_json::json!({ "gain": 9.0 })).await;
        source.reload().await.unwrap();

        let record = controller.replace(&name("s1"), None, None).await.unwrap();
        assert_eq!(record.config, serde_json::json!({ "gain": 9.0 }));
    }
}
