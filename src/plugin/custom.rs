//! Declarative custom plugins.
//!
//! A custom plugin is described by data (usually loaded from the config file)
//! and turned into a regex-backed [`QualityPlugin`]. Each pattern is matched
//! line by line against the unit's content.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::contract::{severity_penalty, QualityPlugin};
use super::error::{PluginError, PluginResult};
use super::types::{
    DetectionResult, Improvement, Location, PluginContext, Priority, QualityDimensions,
    QualityScore, Severity, TestUnit,
};

/// Dimension a custom pattern counts against when none is given.
const DEFAULT_DIMENSION: &str = "correctness";

/// Dimension score below which an improvement is suggested.
const SUGGESTION_THRESHOLD: f64 = 70.0;

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_confidence() -> f64 {
    0.8
}

/// Definition of a custom plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPluginSpec {
    /// Plugin identifier.
    pub id: String,
    /// Display name. Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    /// Plugin version.
    #[serde(default = "default_version")]
    pub version: String,
    /// File extensions the plugin applies to. Empty means every file.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Patterns to match.
    #[serde(default)]
    pub patterns: Vec<CustomPattern>,
}

impl CustomPluginSpec {
    /// Create an empty spec.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            version: default_version(),
            extensions: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Restrict the plugin to an extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extensions.push(extension.into());
        self
    }

    /// Add a pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: CustomPattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}

/// A single regex pattern in a custom plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    /// Pattern identifier.
    pub id: String,
    /// Issue category reported on a match.
    pub category: String,
    /// Severity reported on a match.
    pub severity: Severity,
    /// Regular expression, matched per line.
    pub regex: String,
    /// Message reported on a match.
    pub message: String,
    /// Confidence of a match.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Quality dimension this pattern affects.
    #[serde(default)]
    pub dimension: Option<String>,
}

impl CustomPattern {
    /// Create a pattern with default confidence.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        regex: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            severity,
            regex: regex.into(),
            message: message.into(),
            confidence: default_confidence(),
            dimension: None,
        }
    }

    /// Set the targeted dimension.
    #[must_use]
    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }
}

#[derive(Debug)]
struct CompiledPattern {
    spec: CustomPattern,
    regex: Regex,
}

/// A compiled custom plugin.
#[derive(Debug)]
pub struct CustomPlugin {
    id: String,
    name: String,
    version: String,
    extensions: Vec<String>,
    patterns: Vec<CompiledPattern>,
}

impl CustomPlugin {
    /// Compile a spec. Fails on the first pattern that is not a valid regex.
    pub fn compile(spec: CustomPluginSpec) -> PluginResult<Self> {
        let patterns = spec
            .patterns
            .into_iter()
            .map(|pattern| {
                let regex = Regex::new(&pattern.regex).map_err(|e| PluginError::InvalidPattern {
                    plugin: spec.id.clone(),
                    pattern: pattern.id.clone(),
                    reason: e.to_string(),
                })?;
                Ok(CompiledPattern { spec: pattern, regex })
            })
            .collect::<PluginResult<Vec<_>>>()?;

        Ok(Self {
            name: spec.name.unwrap_or_else(|| spec.id.clone()),
            id: spec.id,
            version: spec.version,
            extensions: spec.extensions.into_iter().map(|e| e.trim_start_matches('.').to_string()).collect(),
            patterns,
        })
    }

    /// Number of compiled patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    fn dimension_of(&self, pattern_id: &str) -> &str {
        self.patterns
            .iter()
            .find(|p| p.spec.id == pattern_id)
            .and_then(|p| p.spec.dimension.as_deref())
            .unwrap_or(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl QualityPlugin for CustomPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn is_applicable(&self, context: &PluginContext) -> anyhow::Result<bool> {
        if self.extensions.is_empty() {
            return Ok(true);
        }
        let extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        Ok(context.has_extension(&extensions))
    }

    async fn detect_patterns(&self, unit: &TestUnit) -> anyhow::Result<Vec<DetectionResult>> {
        let mut results = Vec::new();

        for (index, line) in unit.content.lines().enumerate() {
            for pattern in &self.patterns {
                if let Some(found) = pattern.regex.find(line) {
                    results.push(
                        DetectionResult::new(
                            pattern.spec.id.clone(),
                            pattern.spec.category.clone(),
                            pattern.spec.severity,
                            pattern.spec.message.clone(),
                        )
                        .with_confidence(pattern.spec.confidence)
                        .with_location(Location::new(&unit.path, index + 1).with_column(found.start() + 1))
                        .with_evidence(line.trim()),
                    );
                }
            }
        }

        Ok(results)
    }

    fn evaluate_quality(&self, results: &[DetectionResult]) -> anyhow::Result<QualityScore> {
        let mut dimensions = QualityDimensions::uniform(100.0);

        for result in results {
            let penalty = severity_penalty(result.severity) * result.confidence;
            match self.dimension_of(&result.pattern_id) {
                "completeness" => dimensions.completeness -= penalty,
                "maintainability" => dimensions.maintainability -= penalty,
                _ => dimensions.correctness -= penalty,
            }
        }

        dimensions.completeness = dimensions.completeness.max(0.0);
        dimensions.correctness = dimensions.correctness.max(0.0);
        dimensions.maintainability = dimensions.maintainability.max(0.0);

        let overall = dimensions.iter().map(|(_, v)| v).sum::<f64>() / 3.0;
        let confidence = if results.is_empty() {
            1.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
        };

        Ok(QualityScore { overall, confidence, dimensions })
    }

    fn suggest_improvements(&self, score: &QualityScore) -> Vec<Improvement> {
        score
            .dimensions
            .iter()
            .filter(|(_, value)| *value < SUGGESTION_THRESHOLD)
            .map(|(dimension, value)| {
                let priority = if value < 50.0 { Priority::High } else { Priority::Medium };
                Improvement::new(
                    format!("Improve {dimension}"),
                    format!("{} scored {dimension} at {value:.0}", self.name),
                    priority,
                )
                .with_dimension(dimension)
                .with_plugin(&self.name)
            })
            .collect()
    }
}
