//! The analysis engine.
//!
//! Owns the plugin registry, the execution options and the risk reporter, and
//! exposes the public analysis operations on top of them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::{combine, ScoreDistribution};
use super::config::{AnalysisOptions, Config};
use super::error::{EngineError, EngineResult};
use super::scheduler::{serialize_millis, ExecutionStats, FaultKind, PluginFault, PluginOutcome, Scheduler};
use crate::plugin::{
    CustomPlugin, CustomPluginSpec, DetectionResult, Improvement, Issue, LegacyPlugin,
    PluginContext, PluginRegistry, PluginResult, PluginVariant, QualityPlugin, QualityScore,
    TestUnit,
};
use crate::risk::{
    AiReport, AnalysisSummary, BatchRiskReport, BatchStrategy, CacheStats, ProgressFn,
    ReportOptions, RiskAssessment, RiskReporter, UnitRisks,
};

/// Result of [`AnalysisEngine::analyze`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Identifier of this run.
    pub run_id: Uuid,
    /// Number of units analyzed.
    pub total_units: usize,
    /// Issues found, in scheduling order per unit.
    pub issues: Vec<Issue>,
    /// Wall-clock time of the whole call.
    #[serde(rename = "executionTimeMs", serialize_with = "serialize_millis")]
    pub execution_time: Duration,
    /// Execution, timeout and evaluation faults. Always present.
    pub errors: Vec<PluginFault>,
    /// Applicability faults.
    pub warnings: Vec<PluginFault>,
    /// Plugin counters summed over all units.
    pub stats: ExecutionStats,
}

impl AnalysisReport {
    /// Check whether any plugin fault was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Summary for the risk reporter.
    pub fn summary(&self, overall_score: f64) -> AnalysisSummary {
        AnalysisSummary::new(overall_score, self.issues.clone())
    }
}

/// One plugin's contribution to a quality report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginQualityAnalysis {
    /// Plugin identifier.
    pub plugin_id: String,
    /// Plugin name.
    pub plugin_name: String,
    /// Shape the plugin was registered with.
    pub variant: PluginVariant,
    /// Detections the score was computed from.
    pub detections: Vec<DetectionResult>,
    /// The plugin's own score.
    pub score: QualityScore,
    /// The plugin's suggestions.
    pub improvements: Vec<Improvement>,
}

/// Result of [`AnalysisEngine::analyze_with_quality`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// Path of the analyzed unit.
    pub unit: PathBuf,
    /// Per-plugin analyses, in registration order.
    pub quality_analysis: Vec<PluginQualityAnalysis>,
    /// Confidence-weighted combination of the plugin scores.
    pub aggregated_score: QualityScore,
    /// De-duplicated suggestions, highest priority first.
    pub recommendations: Vec<Improvement>,
    /// Wall-clock time of the call.
    #[serde(rename = "executionTimeMs", serialize_with = "serialize_millis")]
    pub execution_time: Duration,
    /// Execution, timeout and evaluation faults. Always present.
    pub errors: Vec<PluginFault>,
    /// Applicability faults.
    pub warnings: Vec<PluginFault>,
    /// Plugin counters.
    pub stats: ExecutionStats,
}

impl QualityReport {
    /// Issues derived from this report's detections.
    pub fn issues(&self) -> Vec<Issue> {
        self.quality_analysis
            .iter()
            .flat_map(|a| a.detections.iter().map(|d| Issue::from_detection(&a.plugin_name, d)))
            .collect()
    }

    /// Summary for the risk reporter.
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary::new(self.aggregated_score.overall, self.issues())
    }
}

/// Result of [`AnalysisEngine::analyze_batch`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQualityReport {
    /// Number of units analyzed.
    pub total_units: usize,
    /// Mean aggregated score, 0 for an empty batch.
    pub average_score: f64,
    /// Units per quality band.
    pub score_distribution: ScoreDistribution,
    /// Per-unit reports, in input order.
    pub units: Vec<QualityReport>,
    /// Wall-clock time of the call.
    #[serde(rename = "executionTimeMs", serialize_with = "serialize_millis")]
    pub execution_time: Duration,
}

/// Test quality analysis engine.
pub struct AnalysisEngine {
    registry: PluginRegistry,
    options: AnalysisOptions,
    reporter: RiskReporter,
    batch: BatchStrategy,
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("plugins", &self.registry.count())
            .field("options", &self.options)
            .finish()
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEngine {
    /// Create an engine with the default configuration and no plugins.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an engine from configuration.
    ///
    /// Custom plugins declared in the configuration are registered; invalid
    /// ones are logged and skipped.
    pub fn with_config(config: Config) -> Self {
        Self::with_registry(PluginRegistry::new(), config)
    }

    /// Create an engine around an existing registry.
    pub fn with_registry(registry: PluginRegistry, config: Config) -> Self {
        let mut engine = Self {
            registry,
            reporter: RiskReporter::from_config(&config),
            batch: BatchStrategy::from_config(&config.batch, config.risk.max_risks),
            options: config.analysis,
        };

        for spec in config.plugins {
            engine.register_custom_plugin(spec);
        }

        engine
    }

    /// Create an engine from a TOML or YAML configuration file.
    pub fn from_config_file(path: &Path) -> EngineResult<Self> {
        let config = Config::load_from_file(path).map_err(|e| EngineError::Config(format!("{e:#}")))?;
        Ok(Self::with_config(config))
    }

    /// The plugin registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Current execution options.
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Replace the execution options.
    pub fn configure(&mut self, options: AnalysisOptions) {
        tracing::debug!(
            timeout_ms = options.timeout_ms,
            concurrent = options.concurrent,
            skipped = options.skip_plugins.len(),
            "Engine reconfigured"
        );
        self.options = options;
    }

    /// Register a legacy plugin. Returns `false` if it was rejected.
    pub fn register_plugin(&mut self, plugin: Arc<dyn LegacyPlugin>) -> bool {
        let name = plugin.name().to_string();
        accepted(&name, self.registry.register_legacy(plugin))
    }

    /// Register a quality plugin. Returns `false` if it was rejected.
    pub fn register_quality_plugin(&mut self, plugin: Arc<dyn QualityPlugin>) -> bool {
        let id = plugin.id().to_string();
        accepted(&id, self.registry.register_quality(plugin))
    }

    /// Compile and register a declarative plugin. Returns `false` if it was rejected.
    pub fn register_custom_plugin(&mut self, spec: CustomPluginSpec) -> bool {
        let id = spec.id.clone();
        let result = CustomPlugin::compile(spec)
            .and_then(|plugin| self.registry.register_quality(Arc::new(plugin)));
        accepted(&id, result)
    }

    /// Remove a plugin by id.
    pub fn unregister_plugin(&mut self, id: &str) -> bool {
        self.registry.unregister(id)
    }

    fn scheduler(&self) -> Scheduler {
        Scheduler::new().timeout(self.options.timeout()).concurrent(self.options.concurrent)
    }

    /// Run every applicable plugin over `units` and collect the issues.
    pub async fn analyze(&self, units: &[TestUnit]) -> AnalysisReport {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let scheduler = self.scheduler();

        let mut issues = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut stats = ExecutionStats::default();

        tracing::info!(run = %run_id, units = units.len(), plugins = self.registry.count(), "Starting analysis");

        for unit in units {
            let context = PluginContext::from_unit(unit);
            let applicable = self.registry.applicable_plugins(&context, &self.options.skip_plugins);
            warnings.extend(applicable.warnings);

            let result = scheduler.run(unit, applicable.plugins).await;
            for outcome in result.succeeded() {
                issues.extend(outcome.detections.iter().map(|d| Issue::from_detection(&outcome.plugin_name, d)));
            }
            errors.extend(result.errors);
            stats.merge(&result.stats);
        }

        let execution_time = start.elapsed();
        tracing::info!(
            run = %run_id,
            issues = issues.len(),
            errors = errors.len(),
            elapsed_ms = execution_time.as_millis() as u64,
            "Analysis finished"
        );

        AnalysisReport { run_id, total_units: units.len(), issues, execution_time, errors, warnings, stats }
    }

    /// Score one unit with every applicable plugin and aggregate the scores.
    ///
    /// A plugin whose evaluation fails, or whose score is out of range, is
    /// reported as an evaluation fault and left out of the aggregate.
    pub async fn analyze_with_quality(&self, unit: &TestUnit) -> QualityReport {
        let start = Instant::now();
        let context = PluginContext::from_unit(unit);
        let applicable = self.registry.applicable_plugins(&context, &self.options.skip_plugins);
        let plugins = applicable.plugins;

        let result = self.scheduler().run(unit, plugins.clone()).await;
        let mut errors = result.errors;
        let mut outcomes: HashMap<String, PluginOutcome> =
            result.outcomes.into_iter().map(|o| (o.plugin_id.clone(), o)).collect();

        let mut quality_analysis = Vec::new();
        for plugin in &plugins {
            let Some(outcome) = outcomes.remove(plugin.id()) else { continue };
            if !outcome.status.is_success() {
                continue;
            }

            match evaluate(plugin.as_ref(), outcome) {
                Ok(analysis) => quality_analysis.push(analysis),
                Err(fault) => {
                    tracing::warn!(plugin = %fault.plugin_name, error = %fault.message, "Plugin evaluation failed");
                    errors.push(fault);
                }
            }
        }

        let scores: Vec<QualityScore> = quality_analysis.iter().map(|a| a.score).collect();
        let aggregated_score = combine(&scores);
        let recommendations = merge_recommendations(&quality_analysis);

        QualityReport {
            unit: unit.path.clone(),
            quality_analysis,
            aggregated_score,
            recommendations,
            execution_time: start.elapsed(),
            errors,
            warnings: applicable.warnings,
            stats: result.stats,
        }
    }

    /// Score many units and summarize the distribution of their scores.
    pub async fn analyze_batch(&self, units: &[TestUnit]) -> BatchQualityReport {
        let start = Instant::now();

        let reports: Vec<QualityReport> = stream::iter(units)
            .map(|unit| self.analyze_with_quality(unit))
            .buffered(self.batch.fan_out())
            .collect()
            .await;

        let average_score = if reports.is_empty() {
            0.0
        } else {
            reports.iter().map(|r| r.aggregated_score.overall).sum::<f64>() / reports.len() as f64
        };
        let score_distribution = ScoreDistribution::from_scores(reports.iter().map(|r| r.aggregated_score.overall));

        tracing::debug!(units = reports.len(), average_score, "Batch analysis finished");

        BatchQualityReport {
            total_units: units.len(),
            average_score,
            score_distribution,
            units: reports,
            execution_time: start.elapsed(),
        }
    }

    /// Group and rank issues into risks.
    pub fn assess_risks(&self, issues: &[Issue]) -> Vec<RiskAssessment> {
        self.reporter.assessor().assess_risks(issues)
    }

    /// Build the AI-facing report for `summary`, from the cache when possible.
    pub fn risk_report(&self, summary: &AnalysisSummary, options: ReportOptions) -> EngineResult<AiReport> {
        self.reporter.report(summary, options)
    }

    /// Globally rank risks from many units.
    pub async fn format_batch(
        &self,
        results: &[UnitRisks],
        progress: Option<&ProgressFn>,
    ) -> EngineResult<BatchRiskReport> {
        self.batch.format_batch(results, progress).await
    }

    /// Report cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.reporter.cache_stats()
    }

    /// Number of risk reports computed rather than served from the cache.
    pub fn reports_computed(&self) -> u64 {
        self.reporter.reports_computed()
    }

    /// Drop every cached risk report.
    pub fn clear_report_cache(&self) {
        self.reporter.clear_cache();
    }
}

fn accepted(id: &str, result: PluginResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(plugin = id, error = %e, "Plugin registration rejected");
            false
        }
    }
}

fn evaluate(plugin: &dyn QualityPlugin, outcome: PluginOutcome) -> Result<PluginQualityAnalysis, PluginFault> {
    let score = plugin
        .evaluate_quality(&outcome.detections)
        .map_err(|e| PluginFault::new(plugin.name(), FaultKind::Evaluation, format!("evaluation failed: {e:#}")))?;

    if !score.is_well_formed() {
        return Err(PluginFault::new(
            plugin.name(),
            FaultKind::Evaluation,
            format!("score out of range (overall {}, confidence {})", score.overall, score.confidence),
        ));
    }

    let improvements = plugin
        .suggest_improvements(&score)
        .into_iter()
        .map(|i| i.with_plugin(plugin.name()))
        .collect();

    Ok(PluginQualityAnalysis {
        plugin_id: outcome.plugin_id,
        plugin_name: outcome.plugin_name,
        variant: plugin.variant(),
        detections: outcome.detections,
        score,
        improvements,
    })
}

/// Keep the first suggestion per title and order them by priority.
fn merge_recommendations(analyses: &[PluginQualityAnalysis]) -> Vec<Improvement> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Improvement> = analyses
        .iter()
        .flat_map(|a| a.improvements.iter())
        .filter(|i| seen.insert(i.title.clone()))
        .cloned()
        .collect();
    merged.sort_by_key(|i| i.priority);
    merged
}
