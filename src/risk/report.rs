//! AI-facing risk report with caching.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assessor::{RiskAssessment, RiskAssessor, RiskSummary};
use super::cache::{CacheStats, Fingerprint, ReportCache};
use crate::core::{Config, EngineError, EngineResult};
use crate::plugin::Issue;

/// Default location of the full rendered report.
pub const DEFAULT_REPORT_URL: &str = "./reports/test-quality-report.md";

/// What the reporter is asked to summarize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// Overall quality score in [0, 100].
    pub overall_score: f64,
    /// Raw issues found by the analysis.
    pub issues: Vec<Issue>,
}

impl AnalysisSummary {
    /// Create a summary.
    pub fn new(overall_score: f64, issues: Vec<Issue>) -> Self {
        Self { overall_score, issues }
    }

    /// Cache key for this summary.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_summary(self.overall_score, self.issues.len())
    }
}

/// Per-call reporting options.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Consult and fill the cache.
    pub use_cache: bool,
    /// Override the configured maximum number of risks. Bypasses the cache.
    pub max_risks: Option<usize>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_cache: true, max_risks: None }
    }
}

impl ReportOptions {
    /// Options that skip the cache.
    pub fn uncached() -> Self {
        Self { use_cache: false, max_risks: None }
    }
}

/// Report handed to the AI rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReport {
    /// Report identifier. A cached report keeps its identifier.
    pub id: Uuid,
    /// One-paragraph verdict.
    pub overall_assessment: String,
    /// Ranked risks.
    pub key_risks: Vec<RiskAssessment>,
    /// Where the full report lives.
    pub full_report_url: String,
    /// Risk counts per level.
    pub summary: RiskSummary,
    /// When the report was computed.
    pub generated_at: DateTime<Utc>,
}

/// Builds [`AiReport`]s and caches them by [`Fingerprint`].
#[derive(Debug)]
pub struct RiskReporter {
    assessor: RiskAssessor,
    cache: ReportCache<AiReport>,
    cache_enabled: bool,
    full_report_url: String,
    computed: AtomicU64,
}

impl Default for RiskReporter {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RiskReporter {
    /// Create a reporter from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            assessor: RiskAssessor::new(config.risk.max_risks),
            cache: ReportCache::new(config.cache.ttl(), config.cache.capacity),
            cache_enabled: config.cache.enabled,
            full_report_url: config.report.full_report_url.clone(),
            computed: AtomicU64::new(0),
        }
    }

    /// The risk assessor in use.
    pub fn assessor(&self) -> &RiskAssessor {
        &self.assessor
    }

    /// Produce the report for `summary`, from the cache when possible.
    ///
    /// Returns [`EngineError::InvalidInput`] if the score is not a finite
    /// value in [0, 100].
    pub fn report(&self, summary: &AnalysisSummary, options: ReportOptions) -> EngineResult<AiReport> {
        let score = summary.overall_score;
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(EngineError::invalid(format!("overall score {score} is outside [0, 100]")));
        }

        let cacheable = self.cache_enabled && options.use_cache && options.max_risks.is_none();
        let key = summary.fingerprint();

        if cacheable {
            if let Some(report) = self.cache.get(&key) {
                tracing::debug!(key = %key, "Report cache hit");
                return Ok(report);
            }
        }

        let assessor = match options.max_risks {
            Some(max) => RiskAssessor::new(max),
            None => self.assessor.clone(),
        };
        let key_risks = assessor.assess_risks(&summary.issues);
        let risk_summary = RiskSummary::from_risks(&key_risks);

        let report = AiReport {
            id: Uuid::new_v4(),
            overall_assessment: overall_assessment(score, &risk_summary),
            key_risks,
            full_report_url: self.full_report_url.clone(),
            summary: risk_summary,
            generated_at: Utc::now(),
        };
        self.computed.fetch_add(1, Ordering::Relaxed);

        if cacheable {
            self.cache.insert(key, report.clone());
        }

        Ok(report)
    }

    /// Number of reports computed rather than served from the cache.
    pub fn reports_computed(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached report.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn overall_assessment(score: f64, summary: &RiskSummary) -> String {
    let verdict = match score {
        s if s >= 90.0 => "Excellent test quality",
        s if s >= 70.0 => "Good test quality with room for improvement",
        s if s >= 50.0 => "Fair test quality; several areas need attention",
        _ => "Poor test quality; significant improvements are required",
    };

    let mut text = format!("{verdict} (score {score:.1}/100).");
    match summary.critical {
        0 => {}
        1 => text.push_str(" 1 critical risk requires immediate attention."),
        n => text.push_str(&format!(" {n} critical risks require immediate attention.")),
    }
    text
}
