//! Condition definitions
//!
//! A condition pairs a sampling check with a validator over the sampled
//! value. The check is host-supplied code behind a trait, so conditions can
//! watch anything: registry counts, queue depths, external gauges.

use crate::alert::AlertLevel;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between checks of one condition
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// A sampling check for a monitored condition
#[async_trait]
pub trait ConditionCheck: Send + Sync {
    /// Sample the current value
    ///
    /// An `Err` means the check itself broke; the monitor raises an
    /// error-level alert and keeps the loop alive.
    async fn sample(&self) -> std::result::Result<f64, String>;
}

/// Build a check from an async closure
pub fn check_fn<F, Fut>(f: F) -> Arc<dyn ConditionCheck>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<f64, String>> + Send + 'static,
{
    Arc::new(ClosureCheck { f })
}

struct ClosureCheck<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ConditionCheck for ClosureCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<f64, String>> + Send,
{
    async fn sample(&self) -> std::result::Result<f64, String> {
        (self.f)().await
    }
}

/// A monitored condition
pub struct Condition {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) check: Arc<dyn ConditionCheck>,
    pub(crate) validator: Arc<dyn Fn(f64) -> bool + Send + Sync>,
    pub(crate) level: AlertLevel,
    pub(crate) interval: Duration,
}

impl Condition {
    /// Define a condition
    ///
    /// The validator returns `true` while the condition holds; a `false`
    /// verdict raises an alert at the condition's level.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        check: Arc<dyn ConditionCheck>,
        validator: impl Fn(f64) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            check,
            validator: Arc::new(validator),
            level: AlertLevel::Warning,
            interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Set the alert level for failed checks
    pub fn with_level(mut self, level: AlertLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the interval between checks
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
