//! Pivot zero-downtime component replacement demo
//!
//! Walks the full lifecycle: type registration, instance creation and
//! startup, consolidated health, config-driven hot-swap (including a
//! rejected replacement and a cross-type swap), condition monitoring, and
//! a clean shutdown.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use colored::*;
use serde::Deserialize;

use pivot_config::{ConfigSource, FileConfigSource};
use pivot_health::HealthAggregator;
use pivot_lifecycle::{LifecycleController, LifecycleError};
use pivot_monitor::{check_fn, AlertLevel, Condition, ConditionMonitor};
use pivot_registry::{
    Component, ComponentError, ComponentFactory, ComponentType, HealthProbe,
};
use pivot_types::{HealthReport, InstanceName, TypeName};

/// Simulated sensor component
struct Sensor {
    gain: f64,
    unstable: bool,
    running: AtomicBool,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct SensorConfig {
    gain: f64,
    unstable: bool,
}

#[async_trait]
impl Component for Sensor {
    async fn start(&self) -> std::result::Result<(), ComponentError> {
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

struct SensorFactory;

#[async_trait]
impl ComponentFactory for SensorFactory {
    async fn construct(
        &self,
        config: &serde_json::Value,
    ) -> std::result::Result<Box<dyn Component>, ComponentError> {
        let config: SensorConfig = serde_json::from_value(config.clone())
            .map_err(|e| ComponentError::new(format!("invalid sensor config: {e}")))?;
        Ok(Box::new(Sensor {
            gain: config.gain,
            unstable: config.unstable,
            running: AtomicBool::new(false),
        }))
    }
}

struct SensorProbe;

#[async_trait]
impl HealthProbe for SensorProbe {
    async fn probe(
        &self,
        component: &dyn Component,
    ) -> std::result::Result<HealthReport, ComponentError> {
        let Some(sensor) = component.as_any().downcast_ref::<Sensor>() else {
            return Err(ComponentError::new("unexpected component type"));
        };
        if sensor.unstable {
            return Ok(HealthReport::unhealthy("sensor calibration drifting"));
        }
        Ok(HealthReport::healthy(format!("sensor ok, gain={}", sensor.gain)))
    }
}

/// Simple sink component with no probe
struct Sink;

#[async_trait]
impl Component for Sink {
    async fn start(&self) -> std::result::Result<(), ComponentError> {
        Ok(())
    }

    async fn stop(&self) -> std::result::Result<(), ComponentError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SinkFactory;

#[async_trait]
impl ComponentFactory for SinkFactory {
    async fn construct(
        &self,
        _config: &serde_json::Value,
    ) -> std::result::Result<Box<dyn Component>, ComponentError> {
        Ok(Box::new(Sink))
    }
}

fn banner(text: &str) {
    println!();
    println!("{}", format!("=== {text} ===").cyan().bold());
}

async fn print_instances(controller: &LifecycleController) {
    for record in controller.list().await {
        println!(
            "  {} [{}] type={} config={}",
            record.name.as_str().bold(),
            record.state,
            record.type_name.as_str(),
            record.config
        );
    }
}

async fn print_health(aggregator: &HealthAggregator) {
    let mut reports: Vec<_> = aggregator.health_all().await.into_iter().collect();
    reports.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, report) in reports {
        let verdict = if report.healthy {
            "healthy".green()
        } else {
            "unhealthy".red()
        };
        println!("  {} -> {} ({})", name.as_str(), verdict, report.detail);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .init();

    println!("{}", "Pivot component lifecycle demo".cyan().bold());

    // Configuration lives in external files so it can change without a
    // redeploy.
    let config_dir = std::env::temp_dir().join("pivot-swap-demo");
    tokio::fs::create_dir_all(&config_dir).await?;
    tokio::fs::write(config_dir.join("sensor.json"), r#"{ "gain": 1.0 }"#).await?;

    let source = Arc::new(FileConfigSource::open(&config_dir).await?);
    let controller = Arc::new(LifecycleController::new().with_config_source(source.clone()));
    let aggregator = HealthAggregator::new(controller.instance_table());

    banner("Registering component types");
    controller
        .register_type(
            ComponentType::new("sensor", Arc::new(SensorFactory)).with_probe(Arc::new(SensorProbe)),
        )
        .await?;
    controller
        .register_type(ComponentType::new("sink", Arc::new(SinkFactory)))
        .await?;
    for name in controller.list_types().await {
        println!("  registered {}", name.as_str());
    }

    banner("Creating and starting instances");
    controller
        .create(InstanceName::new("s1"), TypeName::new("sensor"), None)
        .await?;
    controller
        .create(InstanceName::new("sink1"), TypeName::new("sink"), None)
        .await?;
    controller.start(&InstanceName::new("s1")).await?;
    controller.start(&InstanceName::new("sink1")).await?;
    print_instances(&controller).await;

    banner("Consolidated health");
    print_health(&aggregator).await;

    banner("Hot-swap with explicit config");
    let record = controller
        .replace(
            &InstanceName::new("s1"),
            None,
            Some(serde_json::json!({ "gain": 2.0 })),
        )
        .await?;
    println!("  s1 replaced, now running with config {}", record.config);

    banner("Hot-swap after a config file reload");
    tokio::fs::write(config_dir.join("sensor.json"), r#"{ "gain": 2.5 }"#).await?;
    source.reload().await?;
    let record = controller.replace(&InstanceName::new("s1"), None, None).await?;
    println!("  s1 replaced, picked up reloaded config {}", record.config);

    banner("Rejected replacement leaves the old instance live");
    let before = controller.get(&InstanceName::new("s1")).await?;
    let err = controller
        .replace(
            &InstanceName::new("s1"),
            None,
            Some(serde_json::json!({ "gain": 9.0, "unstable": true })),
        )
        .await
        .unwrap_err();
    match err {
        LifecycleError::ReplacementRejected { reason, .. } => {
            println!("  rejected: {}", reason.yellow());
        }
        other => println!("  unexpected error: {other}"),
    }
    let after = controller.get(&InstanceName::new("s1")).await?;
    println!(
        "  s1 unchanged: same instance={} state={}",
        before.created_at == after.created_at,
        after.state
    );

    banner("Cross-type replacement");
    let record = controller
        .replace(
            &InstanceName::new("sink1"),
            Some(TypeName::new("sensor")),
            None,
        )
        .await?;
    println!("  sink1 is now a {} instance", record.type_name.as_str());
    print_health(&aggregator).await;

    banner("Condition monitoring");
    let monitor = Arc::new(ConditionMonitor::new());
    {
        let controller = controller.clone();
        monitor.add_condition(
            Condition::new(
                "instance-count",
                "at most 8 live instances",
                check_fn(move || {
                    let controller = controller.clone();
                    async move { Ok(controller.list().await.len() as f64) }
                }),
                |count| count <= 8.0,
            )
            .with_level(AlertLevel::Warning)
            .with_interval(Duration::from_millis(200)),
        )?;
    }
    {
        let controller = controller.clone();
        // Deliberately strict so the demo produces an alert.
        monitor.add_condition(
            Condition::new(
                "single-instance",
                "at most 1 live instance",
                check_fn(move || {
                    let controller = controller.clone();
                    async move { Ok(controller.list().await.len() as f64) }
                }),
                |count| count <= 1.0,
            )
            .with_level(AlertLevel::Critical)
            .with_interval(Duration::from_millis(200)),
        )?;
    }

    let mut alerts = monitor.subscribe();
    monitor.start()?;
    tokio::time::sleep(Duration::from_millis(700)).await;
    monitor.stop();

    while let Ok(pivot_monitor::MonitorEvent::AlertRaised(alert)) = alerts.try_recv() {
        println!(
            "  {} [{}] {} (observed: {:?})",
            "ALERT".red().bold(),
            alert.level,
            alert.message,
            alert.observed
        );
    }

    banner("Shutdown");
    controller.shutdown().await;
    print_instances(&controller).await;

    println!();
    println!("{}", "Demo complete.".green().bold());
    Ok(())
}
