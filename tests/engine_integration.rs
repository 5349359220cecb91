//! Engine Integration Tests
//!
//! End-to-end tests for plugin registration, scheduling, failure isolation and
//! quality aggregation through the public engine API.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use testgauge::core::{AnalysisEngine, AnalysisOptions, Config, FaultKind};
use testgauge::plugin::{
    CustomPattern, CustomPluginSpec, DetectionResult, Improvement, Issue, LegacyPlugin,
    PluginContext, PluginVariant, QualityDimensions, QualityPlugin, QualityScore, Severity,
    TestUnit,
};
use testgauge::risk::RiskLevel;

// ============================================================================
// Test plugins
// ============================================================================

enum Mode {
    Ok(f64),
    Fail,
    Panic,
    Hang,
    BrokenApplicability,
}

struct Stub {
    id: &'static str,
    mode: Mode,
    detections: Arc<AtomicUsize>,
}

impl Stub {
    fn new(id: &'static str, mode: Mode) -> Arc<Self> {
        Arc::new(Self { id, mode, detections: Arc::new(AtomicUsize::new(0)) })
    }
}

#[async_trait]
impl QualityPlugin for Stub {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.id
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn is_applicable(&self, _context: &PluginContext) -> anyhow::Result<bool> {
        match self.mode {
            Mode::BrokenApplicability => anyhow::bail!("predicate exploded"),
            _ => Ok(true),
        }
    }

    async fn detect_patterns(&self, unit: &TestUnit) -> anyhow::Result<Vec<DetectionResult>> {
        self.detections.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Ok(_) | Mode::BrokenApplicability => Ok(vec![DetectionResult::new(
                format!("{}:check", self.id),
                "assertion",
                Severity::Medium,
                format!("{} flagged {}", self.id, unit.path.display()),
            )]),
            Mode::Fail => anyhow::bail!("parser crashed"),
            Mode::Panic => panic!("plugin bug"),
            Mode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    fn evaluate_quality(&self, _results: &[DetectionResult]) -> anyhow::Result<QualityScore> {
        let score = match self.mode {
            Mode::Ok(score) => score,
            _ => 50.0,
        };
        Ok(QualityScore::new(score, QualityDimensions::uniform(score)))
    }

    fn suggest_improvements(&self, _score: &QualityScore) -> Vec<Improvement> {
        Vec::new()
    }
}

struct FixedLegacy {
    issues: Vec<Issue>,
}

#[async_trait]
impl LegacyPlugin for FixedLegacy {
    fn name(&self) -> &str {
        "legacy-checker"
    }

    async fn analyze(&self, _path: &Path) -> anyhow::Result<Vec<Issue>> {
        Ok(self.issues.clone())
    }
}

fn unit(path: &str) -> TestUnit {
    TestUnit::new(path, "describe('suite', () => { it.only('runs', () => {}); });")
}

// ============================================================================
// Failure isolation
// ============================================================================

mod failure_isolation {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_single_fault() {
        let mut engine = AnalysisEngine::new();
        engine.register_quality_plugin(Stub::new("fast", Mode::Ok(90.0)));
        engine.register_quality_plugin(Stub::new("slow", Mode::Hang));
        engine.register_quality_plugin(Stub::new("steady", Mode::Ok(70.0)));
        engine.configure(AnalysisOptions::default().with_timeout(Duration::from_millis(100)));

        let report = engine.analyze(&[unit("a.test.ts")]).await;

        assert_eq!(report.errors.len(), 1);
        let fault = &report.errors[0];
        assert_eq!(fault.plugin_name, "slow");
        assert_eq!(fault.kind, FaultKind::Timeout);
        assert!(fault.message.contains("timeout"));

        let reporters: Vec<_> = report.issues.iter().filter_map(|i| i.plugin.as_deref()).collect();
        assert_eq!(reporters, vec!["fast", "steady"]);
        assert_eq!(report.stats.timed_out, 1);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.successful, 2);
    }

    #[tokio::test]
    async fn test_errors_and_panics_do_not_stop_the_run() {
        let mut engine = AnalysisEngine::new();
        engine.register_quality_plugin(Stub::new("failing", Mode::Fail));
        engine.register_quality_plugin(Stub::new("panicking", Mode::Panic));
        engine.register_quality_plugin(Stub::new("healthy", Mode::Ok(80.0)));

        let report = engine.analyze_with_quality(&unit("b.test.ts")).await;

        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.kind == FaultKind::Execution));
        assert!(report.errors.iter().any(|e| e.message.contains("parser crashed")));
        assert_eq!(report.quality_analysis.len(), 1);
        assert!((report.aggregated_score.overall - 80.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_broken_applicability_excludes_plugin() {
        let broken = Stub::new("broken", Mode::BrokenApplicability);
        let mut engine = AnalysisEngine::new();
        engine.register_quality_plugin(broken.clone());
        engine.register_quality_plugin(Stub::new("fine", Mode::Ok(60.0)));

        let report = engine.analyze_with_quality(&unit("c.test.ts")).await;

        assert_eq!(broken.detections.load(Ordering::SeqCst), 0);
        assert!(report.quality_analysis.iter().all(|a| a.plugin_id != "broken"));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, FaultKind::Applicability);
        assert!(report.errors.is_empty());
        assert_eq!(report.stats.total_plugins, 1);
    }

    #[tokio::test]
    async fn test_errors_always_present() {
        let engine = AnalysisEngine::new();
        let report = engine.analyze(&[unit("d.test.ts")]).await;

        assert!(report.errors.is_empty());
        assert!(report.issues.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["errors"].as_array().is_some());
    }
}

// ============================================================================
// Scheduling modes
// ============================================================================

mod scheduling {
    use super::*;

    #[tokio::test]
    async fn test_sequential_preserves_registration_order() {
        let mut engine = AnalysisEngine::new();
        for id in ["p1", "p2", "p3", "p4"] {
            engine.register_quality_plugin(Stub::new(id, Mode::Ok(75.0)));
        }

        let report = engine.analyze(&[unit("e.test.ts")]).await;
        let order: Vec<_> = report.issues.iter().filter_map(|i| i.plugin.clone()).collect();
        assert_eq!(order, vec!["p1", "p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn test_concurrent_mode_yields_same_findings() {
        let mut engine = AnalysisEngine::new();
        for id in ["p1", "p2", "p3", "p4"] {
            engine.register_quality_plugin(Stub::new(id, Mode::Ok(75.0)));
        }
        engine.configure(AnalysisOptions::default().with_concurrent(true));

        let report = engine.analyze(&[unit("f.test.ts")]).await;
        let mut plugins: Vec<_> = report.issues.iter().filter_map(|i| i.plugin.clone()).collect();
        plugins.sort();
        assert_eq!(plugins, vec!["p1", "p2", "p3", "p4"]);

        let quality = engine.analyze_with_quality(&unit("f.test.ts")).await;
        let ids: Vec<_> = quality.quality_analysis.iter().map(|a| a.plugin_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn test_independent_engines_do_not_share_plugins() {
        let mut first = AnalysisEngine::new();
        let second = AnalysisEngine::new();
        first.register_quality_plugin(Stub::new("only-first", Mode::Ok(90.0)));

        assert_eq!(first.registry().count(), 1);
        assert!(second.registry().is_empty());
    }
}

// ============================================================================
// Plugin shapes
// ============================================================================

mod plugin_shapes {
    use super::*;

    #[tokio::test]
    async fn test_legacy_plugin_flows_into_risks() {
        let legacy = FixedLegacy {
            issues: vec![
                Issue::new("pattern", Severity::Critical, "Focused test"),
                Issue::new("pattern", Severity::Critical, "Focused test"),
                Issue::new("security", Severity::High, "Hard-coded credential"),
            ],
        };

        let mut engine = AnalysisEngine::new();
        assert!(engine.register_plugin(Arc::new(legacy)));
        let registered = engine.registry().get("legacy-checker").unwrap();
        assert_eq!(registered.variant, PluginVariant::Legacy);

        let report = engine.analyze(&[unit("g.test.ts")]).await;
        assert_eq!(report.issues.len(), 3);

        let risks = engine.assess_risks(&report.issues);
        assert_eq!(risks.len(), 2);
        assert_eq!(risks[0].risk_level, RiskLevel::Critical);
        assert_eq!(risks[0].category, "pattern");
        assert!((risks[0].likelihood - 1.0).abs() < 1e-9);
        assert_eq!(risks[1].risk_level, RiskLevel::High);
        assert_eq!(risks[1].category, "security");
    }

    #[tokio::test]
    async fn test_legacy_score_uses_severity_penalties() {
        let legacy = FixedLegacy {
            issues: vec![
                Issue::new("pattern", Severity::Critical, "a"),
                Issue::new("timing", Severity::Medium, "b"),
            ],
        };
        let mut engine = AnalysisEngine::new();
        engine.register_plugin(Arc::new(legacy));

        let report = engine.analyze_with_quality(&unit("h.test.ts")).await;
        assert!((report.aggregated_score.overall - 67.0).abs() < 1e-6);
        assert_eq!(report.quality_analysis[0].variant, PluginVariant::Legacy);
    }

    #[tokio::test]
    async fn test_custom_plugin_from_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("testgauge.toml");
        std::fs::write(
            &path,
            r#"
[[plugins]]
id = "no-focused-tests"
extensions = [".ts"]

[[plugins.patterns]]
id = "only"
category = "pattern"
severity = "critical"
regex = '\.only\('
message = "Focused test left in the suite"
confidence = 1.0
"#,
        )
        .unwrap();

        let engine = AnalysisEngine::from_config_file(&path).unwrap();
        assert!(engine.registry().contains("no-focused-tests"));

        let report = engine.analyze(&[unit("i.test.ts"), unit("i.test.py")]).await;
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, "pattern");
        assert_eq!(report.issues[0].location.as_ref().map(|l| l.line), Some(1));

        let quality = engine.analyze_with_quality(&unit("i.test.ts")).await;
        assert!((quality.aggregated_score.dimensions.correctness - 75.0).abs() < 1e-6);
        assert!((quality.aggregated_score.dimensions.completeness - 100.0).abs() < 1e-6);
        assert!(quality.recommendations.is_empty());
    }

    #[test]
    fn test_invalid_custom_plugins_are_rejected() {
        let mut config = Config::default();
        config.plugins.push(CustomPluginSpec::new("-leading-dash"));
        config.plugins.push(CustomPluginSpec::new("bad-regex").with_pattern(CustomPattern::new(
            "p",
            "pattern",
            Severity::Low,
            "[unclosed",
            "never compiles",
        )));
        config.plugins.push(CustomPluginSpec::new("valid"));

        let engine = AnalysisEngine::with_config(config);
        let ids: Vec<_> = engine.registry().list().map(|p| p.plugin.id().to_string()).collect();
        assert_eq!(ids, vec!["valid"]);
    }
}
