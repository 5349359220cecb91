//! Core plugin types.
//!
//! Everything a plugin consumes or produces lives here: the test unit handed
//! over by the I/O layer, raw issues, detection results, quality scores and
//! improvement suggestions.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Version reported by adapted legacy plugins.
pub const LEGACY_PLUGIN_VERSION: &str = "0.0.0-legacy";

/// Shape a plugin was registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginVariant {
    /// Simple analyzer: file path in, issues out.
    Legacy,
    /// Full quality plugin with applicability, detection, evaluation and suggestions.
    Quality,
}

impl PluginVariant {
    /// Get the display name for this variant.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Legacy => "Legacy",
            Self::Quality => "Quality",
        }
    }
}

impl fmt::Display for PluginVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A single test source file as handed over by the I/O layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestUnit {
    /// Path of the test file.
    pub path: PathBuf,
    /// Full file content.
    pub content: String,
}

impl TestUnit {
    /// Create a new test unit.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into() }
    }
}

/// Information passed to applicability predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginContext {
    /// Path of the unit under analysis.
    pub path: PathBuf,
    /// File name component, if any.
    pub file_name: Option<String>,
    /// Lowercased file extension, if any.
    pub extension: Option<String>,
    /// Content length in bytes.
    pub content_length: usize,
}

impl PluginContext {
    /// Build a context for the given unit.
    pub fn from_unit(unit: &TestUnit) -> Self {
        let mut context = Self::from_path(&unit.path);
        context.content_length = unit.content.len();
        context
    }

    /// Build a context from a bare path (content unknown).
    pub fn from_path(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: path.file_name().and_then(|n| n.to_str()).map(str::to_string),
            extension: path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()),
            content_length: 0,
        }
    }

    /// Check whether the unit has one of the given extensions.
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension
            .as_deref()
            .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Severity reported by a detector.
///
/// Parsing is total and case-insensitive: any unrecognized value becomes
/// [`Severity::Unknown`]. Deserialization goes through [`Severity::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    /// Breaks the suite's ability to catch regressions.
    Critical,
    /// Likely to hide real failures.
    High,
    /// Weakens the test but does not hide failures.
    Medium,
    /// Style or hygiene problem.
    Low,
    /// Informational only.
    Info,
    /// Any value the detector emitted that is not recognized.
    Unknown,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl Severity {
    /// Parse a severity, falling back to `Unknown` for anything unrecognized.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" | "error" => Self::High,
            "medium" | "warning" => Self::Medium,
            "low" => Self::Low,
            "info" | "informational" => Self::Info,
            _ => Self::Unknown,
        }
    }

    /// Lowercase name used in keys and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File the finding was reported in.
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Location {
    /// Create a location without a column.
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self { file: file.into(), line, column: None }
    }

    /// Set the column.
    #[must_use]
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

/// A raw finding, as produced by legacy analyzers or derived from detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Issue class (e.g. `pattern`, `security`, `assertion`).
    pub category: String,
    /// Reported severity.
    pub severity: Severity,
    /// Human readable message.
    pub message: String,
    /// Where the issue was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Name of the plugin that reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl Issue {
    /// Create a new issue.
    pub fn new(category: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            severity,
            message: message.into(),
            location: None,
            plugin: None,
        }
    }

    /// Attach a location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the reporting plugin's name.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Derive an issue from a detection result.
    pub fn from_detection(plugin: &str, detection: &DetectionResult) -> Self {
        Self {
            category: detection.category.clone(),
            severity: detection.severity,
            message: detection.message.clone(),
            location: detection.location.clone(),
            plugin: Some(plugin.to_string()),
        }
    }
}

/// A single pattern match emitted by a quality plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Identifier of the matched pattern.
    pub pattern_id: String,
    /// Issue class the pattern belongs to.
    pub category: String,
    /// Severity of the match.
    pub severity: Severity,
    /// Human readable message.
    pub message: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Where the match was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Supporting evidence (matched snippets, reasons).
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl DetectionResult {
    /// Create a detection with full confidence and no location.
    pub fn new(
        pattern_id: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            category: category.into(),
            severity,
            message: message.into(),
            confidence: 1.0,
            location: None,
            evidence: Vec::new(),
        }
    }

    /// Set the confidence, clamped to [0, 1].
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Attach a location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Add a piece of evidence.
    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }
}

/// Per-dimension quality breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityDimensions {
    /// How much of the behaviour under test is exercised.
    pub completeness: f64,
    /// Whether assertions actually verify the behaviour.
    pub correctness: f64,
    /// How easy the tests are to read and change.
    pub maintainability: f64,
}

impl QualityDimensions {
    /// Dimension names, in a stable order.
    pub const NAMES: [&'static str; 3] = ["completeness", "correctness", "maintainability"];

    /// All dimensions set to the same value.
    pub fn uniform(value: f64) -> Self {
        Self { completeness: value, correctness: value, maintainability: value }
    }

    /// Iterate `(name, value)` pairs in [`Self::NAMES`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        Self::NAMES.into_iter().zip([self.completeness, self.correctness, self.maintainability])
    }

    /// Look up a dimension by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// Normalized quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Overall value in [0, 100].
    pub overall: f64,
    /// Confidence in [0, 1]. Treated as 1 when absent from serialized input.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Per-dimension sub-scores, each in [0, 100].
    #[serde(default)]
    pub dimensions: QualityDimensions,
}

impl QualityScore {
    /// A score with full confidence.
    pub fn new(overall: f64, dimensions: QualityDimensions) -> Self {
        Self { overall, confidence: 1.0, dimensions }
    }

    /// A score with the same value on every dimension.
    pub fn uniform(overall: f64) -> Self {
        Self::new(overall, QualityDimensions::uniform(overall))
    }

    /// The all-zero score returned when nothing could be aggregated.
    pub fn zero() -> Self {
        Self { overall: 0.0, confidence: 0.0, dimensions: QualityDimensions::default() }
    }

    /// Set the confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Check that every field is finite and inside its documented range.
    pub fn is_well_formed(&self) -> bool {
        let in_score_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        in_score_range(self.overall)
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
            && self.dimensions.iter().all(|(_, v)| in_score_range(v))
    }
}

/// Priority of an improvement suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Address first.
    High,
    /// Address soon.
    Medium,
    /// Nice to have.
    Low,
}

/// An improvement suggested by a plugin for a given score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    /// Short title, also used for de-duplication.
    pub title: String,
    /// What to change.
    pub description: String,
    /// How urgent the change is.
    pub priority: Priority,
    /// Dimension the improvement targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// Plugin that suggested it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl Improvement {
    /// Create a new improvement.
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
            dimension: None,
            plugin: None,
        }
    }

    /// Set the targeted dimension.
    #[must_use]
    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    /// Attach the suggesting plugin's name.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_is_total() {
        assert_eq!(Severity::parse("critical"), Severity::Critical);
        assert_eq!(Severity::parse(" HIGH "), Severity::High);
        assert_eq!(Severity::parse("warning"), Severity::Medium);
        assert_eq!(Severity::parse("info"), Severity::Info);
        assert_eq!(Severity::parse("catastrophic"), Severity::Unknown);
        assert_eq!(Severity::parse(""), Severity::Unknown);
    }

    #[test]
    fn test_severity_deserialize_unknown() {
        let severity: Severity = serde_json::from_str("\"blocker\"").unwrap();
        assert_eq!(severity, Severity::Unknown);

        let severity: Severity = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(severity, Severity::Low);
    }

    #[test]
    fn test_severity_deserialize_ignores_case() {
        let parsed: Vec<Severity> = serde_json::from_str(r#"["High", "CRITICAL", " Warning ", "error"]"#).unwrap();
        assert_eq!(parsed, vec![Severity::High, Severity::Critical, Severity::Medium, Severity::High]);

        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&Severity::Unknown).unwrap(), "\"unknown\"");
    }

    #[test]
    fn test_plugin_context_from_unit() {
        let unit = TestUnit::new("tests/Login.Spec.TS", "it('works', () => {})");
        let context = PluginContext::from_unit(&unit);

        assert_eq!(context.file_name.as_deref(), Some("Login.Spec.TS"));
        assert_eq!(context.extension.as_deref(), Some("ts"));
        assert_eq!(context.content_length, unit.content.len());
        assert!(context.has_extension(&["js", "ts"]));
        assert!(!context.has_extension(&["py"]));
    }

    #[test]
    fn test_quality_score_confidence_defaults_to_one() {
        let score: QualityScore = serde_json::from_str(r#"{"overall": 75.0}"#).unwrap();
        assert!((score.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(score.dimensions, QualityDimensions::default());
    }

    #[test]
    fn test_quality_score_well_formed() {
        assert!(QualityScore::uniform(80.0).is_well_formed());
        assert!(QualityScore::zero().is_well_formed());
        assert!(!QualityScore::uniform(120.0).is_well_formed());
        assert!(!QualityScore::uniform(f64::NAN).is_well_formed());
        assert!(!QualityScore::uniform(50.0).with_confidence(1.5).is_well_formed());
    }

    #[test]
    fn test_detection_confidence_clamped() {
        let detection = DetectionResult::new("p1", "pattern", Severity::Low, "msg").with_confidence(3.0);
        assert!((detection.confidence - 1.0).abs() < f64::EPSILON);

        let detection =
            DetectionResult::new("p1", "pattern", Severity::Low, "msg").with_confidence(f64::NAN);
        assert!(detection.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_issue_from_detection() {
        let detection = DetectionResult::new("sleep", "timing", Severity::Medium, "uses sleep")
            .with_location(Location::new("a.test.js", 4).with_column(2));
        let issue = Issue::from_detection("timing-plugin", &detection);

        assert_eq!(issue.category, "timing");
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.plugin.as_deref(), Some("timing-plugin"));
        assert_eq!(issue.location.unwrap().column, Some(2));
    }

    #[test]
    fn test_dimensions_lookup() {
        let dims = QualityDimensions { completeness: 1.0, correctness: 2.0, maintainability: 3.0 };
        assert_eq!(dims.get("correctness"), Some(2.0));
        assert_eq!(dims.get("speed"), None);
        assert_eq!(dims.iter().count(), 3);
    }
}
