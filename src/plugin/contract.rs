//! Plugin contracts.
//!
//! Two shapes are supported. [`LegacyPlugin`] is the original single-call
//! analyzer; [`QualityPlugin`] is the full contract the scheduler works with.
//! Legacy plugins are wrapped in a [`LegacyAdapter`] once, when they are
//! registered, so nothing downstream needs to know which shape it is talking to.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    DetectionResult, Improvement, Issue, PluginContext, PluginVariant, Priority, QualityScore,
    Severity, TestUnit, LEGACY_PLUGIN_VERSION,
};

/// Trait for legacy analyzers.
#[async_trait]
pub trait LegacyPlugin: Send + Sync {
    /// Get the name of this plugin. Doubles as its identifier.
    fn name(&self) -> &str;

    /// Analyze the file at `path` and return the issues found.
    async fn analyze(&self, path: &Path) -> anyhow::Result<Vec<Issue>>;
}

/// Trait for quality plugins.
#[async_trait]
pub trait QualityPlugin: Send + Sync {
    /// Unique identifier. Must pass registry validation.
    fn id(&self) -> &str;

    /// Human readable name.
    fn name(&self) -> &str;

    /// Plugin version.
    fn version(&self) -> &str;

    /// Shape the plugin was originally written in.
    fn variant(&self) -> PluginVariant {
        PluginVariant::Quality
    }

    /// Whether the plugin should run for this context.
    ///
    /// An `Err` excludes the plugin from the run; it never aborts the run.
    fn is_applicable(&self, context: &PluginContext) -> anyhow::Result<bool>;

    /// Detect patterns in the unit.
    async fn detect_patterns(&self, unit: &TestUnit) -> anyhow::Result<Vec<DetectionResult>>;

    /// Turn this plugin's detections into a quality score.
    fn evaluate_quality(&self, results: &[DetectionResult]) -> anyhow::Result<QualityScore>;

    /// Suggest improvements for a score this plugin produced.
    fn suggest_improvements(&self, score: &QualityScore) -> Vec<Improvement>;
}

/// Score deducted per finding when a legacy plugin is evaluated.
pub(crate) fn severity_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 25.0,
        Severity::High => 15.0,
        Severity::Medium => 8.0,
        Severity::Low => 3.0,
        Severity::Info | Severity::Unknown => 1.0,
    }
}

/// Wraps a [`LegacyPlugin`] in the [`QualityPlugin`] contract.
pub struct LegacyAdapter {
    inner: Arc<dyn LegacyPlugin>,
}

impl std::fmt::Debug for LegacyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyAdapter").field("name", &self.inner.name()).finish()
    }
}

impl LegacyAdapter {
    /// Wrap a legacy plugin.
    pub fn new(inner: Arc<dyn LegacyPlugin>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl QualityPlugin for LegacyAdapter {
    fn id(&self) -> &str {
        self.inner.name()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> &str {
        LEGACY_PLUGIN_VERSION
    }

    fn variant(&self) -> PluginVariant {
        PluginVariant::Legacy
    }

    fn is_applicable(&self, _context: &PluginContext) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn detect_patterns(&self, unit: &TestUnit) -> anyhow::Result<Vec<DetectionResult>> {
        let issues = self.inner.analyze(&unit.path).await?;

        Ok(issues
            .into_iter()
            .map(|issue| DetectionResult {
                pattern_id: format!("{}:{}", self.inner.name(), issue.category),
                category: issue.category,
                severity: issue.severity,
                message: issue.message,
                confidence: 1.0,
                location: issue.location,
                evidence: Vec::new(),
            })
            .collect())
    }

    fn evaluate_quality(&self, results: &[DetectionResult]) -> anyhow::Result<QualityScore> {
        let penalty: f64 = results.iter().map(|r| severity_penalty(r.severity)).sum();
        Ok(QualityScore::uniform((100.0 - penalty).max(0.0)))
    }

    fn suggest_improvements(&self, score: &QualityScore) -> Vec<Improvement> {
        if score.overall >= 90.0 {
            return Vec::new();
        }

        let priority = if score.overall < 50.0 { Priority::High } else { Priority::Medium };
        vec![Improvement::new(
            format!("Resolve issues reported by {}", self.inner.name()),
            format!(
                "{} reported findings that lowered the score to {:.0}",
                self.inner.name(),
                score.overall
            ),
            priority,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::types::Location;

    struct FixedLegacy;

    #[async_trait]
    impl LegacyPlugin for FixedLegacy {
        fn name(&self) -> &str {
            "fixed-legacy"
        }

        async fn analyze(&self, path: &Path) -> anyhow::Result<Vec<Issue>> {
            Ok(vec![
                Issue::new("assertion", Severity::High, "no assertions")
                    .with_location(Location::new(path, 3)),
                Issue::new("pattern", Severity::Low, "magic number"),
            ])
        }
    }

    #[tokio::test]
    async fn test_adapter_maps_issues_to_detections() {
        let adapter = LegacyAdapter::new(Arc::new(FixedLegacy));
        let unit = TestUnit::new("a.test.js", "");

        let detections = adapter.detect_patterns(&unit).await.unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].pattern_id, "fixed-legacy:assertion");
        assert_eq!(detections[0].severity, Severity::High);
        assert_eq!(detections[0].location.as_ref().unwrap().line, 3);
        assert!((detections[1].confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_adapter_identity() {
        let adapter = LegacyAdapter::new(Arc::new(FixedLegacy));
        assert_eq!(adapter.id(), "fixed-legacy");
        assert_eq!(adapter.version(), LEGACY_PLUGIN_VERSION);
        assert_eq!(adapter.variant(), PluginVariant::Legacy);
        assert!(adapter.is_applicable(&PluginContext::from_path(Path::new("x.py"))).unwrap());
    }

    #[test]
    fn test_adapter_evaluates_by_penalty() {
        let adapter = LegacyAdapter::new(Arc::new(FixedLegacy));
        let results = vec![
            DetectionResult::new("a", "x", Severity::High, "m"),
            DetectionResult::new("b", "x", Severity::Low, "m"),
        ];

        let score = adapter.evaluate_quality(&results).unwrap();
        assert!((score.overall - 82.0).abs() < 1e-9);
        assert!((score.dimensions.correctness - 82.0).abs() < 1e-9);
        assert!((score.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_adapter_score_floors_at_zero() {
        let adapter = LegacyAdapter::new(Arc::new(FixedLegacy));
        let results: Vec<_> = (0..10)
            .map(|i| DetectionResult::new(format!("c{i}"), "x", Severity::Critical, "m"))
            .collect();

        let score = adapter.evaluate_quality(&results).unwrap();
        assert!(score.overall.abs() < f64::EPSILON);
        assert_eq!(adapter.suggest_improvements(&score)[0].priority, Priority::High);
    }

    #[test]
    fn test_adapter_no_suggestions_for_good_score() {
        let adapter = LegacyAdapter::new(Arc::new(FixedLegacy));
        assert!(adapter.suggest_improvements(&QualityScore::uniform(95.0)).is_empty());
    }
}
