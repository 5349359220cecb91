//! Plugin execution scheduler.
//!
//! Runs a set of plugins against one test unit, either one at a time in
//! registration order or all at once. Every plugin's detection runs on its
//! own tokio task raced against a timeout, so a failing, panicking or slow
//! plugin only ever affects its own outcome.
//!
//! The timeout is advisory: when a plugin loses the race its task is detached,
//! not aborted, and any side effects it has may still complete in the
//! background.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Serialize, Serializer};

use crate::plugin::{DetectionResult, PluginError, QualityPlugin, TestUnit};

/// Default per-plugin timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Kind of per-plugin fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// The applicability predicate failed; the plugin was not run.
    Applicability,
    /// Detection returned an error or panicked.
    Execution,
    /// Detection did not finish within the timeout.
    Timeout,
    /// Scoring or suggestion failed, or produced an out-of-range score.
    Evaluation,
}

/// Structured record of a plugin failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginFault {
    /// Name of the failing plugin.
    pub plugin_name: String,
    /// What went wrong.
    pub kind: FaultKind,
    /// Error message.
    pub message: String,
}

impl PluginFault {
    /// Create a new fault record.
    pub fn new(plugin_name: impl Into<String>, kind: FaultKind, message: impl Into<String>) -> Self {
        Self { plugin_name: plugin_name.into(), kind, message: message.into() }
    }

    /// Check if this fault is a timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind == FaultKind::Timeout
    }
}

/// Status of a plugin within one scheduling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// Not started yet.
    Pending,
    /// Detection completed.
    Succeeded,
    /// Detection returned an error or panicked.
    Failed,
    /// Detection lost the race against the timeout.
    TimedOut,
}

impl PluginStatus {
    /// Check if the plugin has settled.
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check if the plugin succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Result of running one plugin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOutcome {
    /// Plugin identifier.
    pub plugin_id: String,
    /// Plugin name.
    pub plugin_name: String,
    /// Final status.
    pub status: PluginStatus,
    /// Detections, empty unless the plugin succeeded.
    pub detections: Vec<DetectionResult>,
    /// Time spent waiting for the plugin.
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl PluginOutcome {
    /// Outcome of a plugin that has not started yet.
    pub fn pending(plugin: &dyn QualityPlugin) -> Self {
        Self {
            plugin_id: plugin.id().to_string(),
            plugin_name: plugin.name().to_string(),
            status: PluginStatus::Pending,
            detections: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Move a pending outcome to its final status.
    pub fn settle(&mut self, status: PluginStatus, detections: Vec<DetectionResult>, duration: Duration) {
        debug_assert!(!self.status.is_finished(), "outcome settled twice");
        self.status = status;
        self.detections = detections;
        self.duration = duration;
    }
}

/// Counters for one scheduling call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    /// Plugins scheduled.
    pub total_plugins: usize,
    /// Plugins that succeeded.
    pub successful: usize,
    /// Plugins that failed, timeouts included.
    pub failed: usize,
    /// Plugins that timed out.
    pub timed_out: usize,
    /// Wall-clock duration of the call.
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl ExecutionStats {
    /// Fold another call's stats into these.
    pub fn merge(&mut self, other: &Self) {
        self.total_plugins += other.total_plugins;
        self.successful += other.successful;
        self.failed += other.failed;
        self.timed_out += other.timed_out;
        self.duration += other.duration;
    }
}

/// Result of one scheduling call.
#[derive(Debug, Clone, Default)]
pub struct ScheduleResult {
    /// One outcome per scheduled plugin.
    pub outcomes: Vec<PluginOutcome>,
    /// Execution and timeout faults.
    pub errors: Vec<PluginFault>,
    /// Call statistics.
    pub stats: ExecutionStats,
}

impl ScheduleResult {
    /// Outcomes of plugins that succeeded.
    pub fn succeeded(&self) -> impl Iterator<Item = &PluginOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_success())
    }

    /// Check if every plugin succeeded.
    pub fn all_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_success())
    }

    fn record(&mut self, outcome: PluginOutcome, fault: Option<PluginFault>) {
        debug_assert!(outcome.status.is_finished(), "recorded an unsettled outcome");
        match outcome.status {
            PluginStatus::Succeeded => self.stats.successful += 1,
            PluginStatus::TimedOut => {
                self.stats.failed += 1;
                self.stats.timed_out += 1;
            }
            PluginStatus::Failed | PluginStatus::Pending => self.stats.failed += 1,
        }
        self.outcomes.push(outcome);
        self.errors.extend(fault);
    }
}

/// Plugin scheduler.
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Per-plugin timeout
    timeout: Duration,
    /// Whether plugins run concurrently
    concurrent: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, concurrent: false }
    }
}

impl Scheduler {
    /// Create a sequential scheduler with the default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-plugin timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set concurrent mode.
    #[must_use]
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Run the plugins' detection against `unit`.
    ///
    /// In sequential mode outcomes follow the order of `plugins`. In concurrent
    /// mode they are appended as plugins settle and their order is unspecified.
    pub async fn run(&self, unit: &TestUnit, plugins: Vec<Arc<dyn QualityPlugin>>) -> ScheduleResult {
        let start = Instant::now();
        let unit = Arc::new(unit.clone());
        let mut result = ScheduleResult::default();
        result.stats.total_plugins = plugins.len();

        if plugins.is_empty() {
            return result;
        }

        tracing::debug!(
            path = %unit.path.display(),
            plugins = plugins.len(),
            concurrent = self.concurrent,
            "Scheduling plugins"
        );

        if self.concurrent {
            let mut pending: FuturesUnordered<_> = plugins
                .into_iter()
                .map(|plugin| run_plugin(plugin, Arc::clone(&unit), self.timeout))
                .collect();

            while let Some((outcome, fault)) = pending.next().await {
                result.record(outcome, fault);
            }
        } else {
            for plugin in plugins {
                let (outcome, fault) = run_plugin(plugin, Arc::clone(&unit), self.timeout).await;
                result.record(outcome, fault);
            }
        }

        result.stats.duration = start.elapsed();
        result
    }
}

/// Run one plugin on its own task, racing it against the timeout.
async fn run_plugin(
    plugin: Arc<dyn QualityPlugin>,
    unit: Arc<TestUnit>,
    timeout: Duration,
) -> (PluginOutcome, Option<PluginFault>) {
    let start = Instant::now();
    let mut outcome = PluginOutcome::pending(&*plugin);
    let name = outcome.plugin_name.clone();

    let handle = tokio::spawn(async move { plugin.detect_patterns(&unit).await });

    let (status, detections, fault) = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(detections))) => {
            tracing::debug!(plugin = %name, count = detections.len(), "Plugin finished");
            (PluginStatus::Succeeded, detections, None)
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(plugin = %name, error = %e, "Plugin failed");
            let message = PluginError::ExecutionError { plugin: name.clone(), message: format!("{e:#}") };
            let fault = PluginFault::new(&name, FaultKind::Execution, message.to_string());
            (PluginStatus::Failed, Vec::new(), Some(fault))
        }
        Ok(Err(join_error)) => {
            tracing::warn!(plugin = %name, error = %join_error, "Plugin task panicked");
            let message = PluginError::ExecutionError { plugin: name.clone(), message: join_error.to_string() };
            let fault = PluginFault::new(&name, FaultKind::Execution, message.to_string());
            (PluginStatus::Failed, Vec::new(), Some(fault))
        }
        Err(_) => {
            // The task keeps running detached; only its result is discarded.
            tracing::warn!(plugin = %name, timeout_ms = timeout.as_millis() as u64, "Plugin timed out");
            let message = PluginError::Timeout(name.clone(), timeout.as_millis() as u64);
            let fault = PluginFault::new(&name, FaultKind::Timeout, message.to_string());
            (PluginStatus::TimedOut, Vec::new(), Some(fault))
        }
    };

    outcome.settle(status, detections, start.elapsed());
    (outcome, fault)
}
