//! Risk assessment.
//!
//! Raw issues are grouped by `(category, severity)`. The first issue of a group
//! seeds a [`RiskAssessment`]; every further issue in the group raises its
//! likelihood by [`LIKELIHOOD_STEP`], capped at 1.0. Groups are then ranked by
//! level and likelihood and truncated.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::level::{map_severity, severity_weight, RiskLevel};
use crate::plugin::{Issue, Severity};

/// Default number of risks kept after ranking.
pub const DEFAULT_MAX_RISKS: usize = 10;

/// Likelihood added per duplicate issue. An empirical tunable.
pub const LIKELIHOOD_STEP: f64 = 0.1;

const GENERIC_IMPACT: &str = "May reduce confidence in the test suite's ability to catch regressions";

static IMPACTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("assertion", "Tests may pass without verifying behaviour, hiding real defects"),
        ("pattern", "Known anti-patterns make tests brittle and failures hard to interpret"),
        ("security", "Sensitive data or unsafe operations in tests can leak into builds and logs"),
        ("coverage", "Untested paths allow regressions to ship unnoticed"),
        ("mock", "Over-mocking couples tests to implementation details and hides integration bugs"),
        ("async", "Unawaited or racy async code produces flaky, order-dependent results"),
        ("timing", "Time-dependent tests fail intermittently and slow the suite down"),
        ("maintainability", "Hard-to-read tests slow down changes and invite copy-paste errors"),
        ("performance", "Slow tests lengthen feedback loops and discourage running the suite"),
        ("structure", "Poorly organised suites make it hard to find and trust relevant tests"),
    ])
});

static MITIGATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("assertion", "Add explicit assertions on the observable outcome of every test"),
        ("pattern", "Replace the flagged pattern with the documented idiom for the framework"),
        ("security", "Move secrets to fixtures or environment variables and scrub test output"),
        ("coverage", "Add tests for the uncovered branches and error paths"),
        ("mock", "Mock only at process boundaries and assert on behaviour, not calls"),
        ("async", "Await every promise/future and use the framework's async helpers"),
        ("timing", "Use fake timers or polling with a deadline instead of fixed sleeps"),
        ("maintainability", "Extract shared setup into helpers and give tests descriptive names"),
        ("performance", "Share expensive fixtures and move slow cases to a separate suite"),
        ("structure", "Group related tests and keep one behaviour per test"),
    ])
});

/// Impact description for a category. Unknown categories get a generic message.
pub fn lookup_impact(category: &str) -> &'static str {
    IMPACTS.get(category.to_lowercase().as_str()).copied().unwrap_or(GENERIC_IMPACT)
}

/// Suggested mitigation for a category, if one is known.
pub fn lookup_mitigation(category: &str) -> Option<&'static str> {
    MITIGATIONS.get(category.to_lowercase().as_str()).copied()
}

/// A prioritized summary of one class of issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Risk level.
    pub risk_level: RiskLevel,
    /// Issue category.
    pub category: String,
    /// Description, taken from the first issue of the group.
    pub description: String,
    /// What happens if the risk is ignored.
    pub impact: String,
    /// Likelihood in [0, 1].
    pub likelihood: f64,
    /// Suggested mitigation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
    /// Number of issues folded into this risk.
    #[serde(default = "one")]
    pub occurrences: usize,
}

fn one() -> usize {
    1
}

impl RiskAssessment {
    /// Seed a risk from the first issue of its group.
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            risk_level: map_severity(issue.severity),
            category: issue.category.clone(),
            description: issue.message.clone(),
            impact: lookup_impact(&issue.category).to_string(),
            likelihood: severity_weight(issue.severity),
            mitigation: lookup_mitigation(&issue.category).map(str::to_string),
            occurrences: 1,
        }
    }

    /// Fold one more matching issue into this risk.
    pub fn reinforce(&mut self) {
        self.likelihood = (self.likelihood + LIKELIHOOD_STEP).min(1.0);
        self.occurrences += 1;
    }
}

/// Sort risks by level rank, then likelihood descending, and keep the first `max`.
///
/// The sort is stable: equal risks keep their incoming order.
pub fn rank_risks(risks: &mut Vec<RiskAssessment>, max: usize) {
    risks.sort_by(|a, b| {
        a.risk_level.rank().cmp(&b.risk_level.rank()).then_with(|| b.likelihood.total_cmp(&a.likelihood))
    });
    risks.truncate(max);
}

/// Groups and ranks issues into risks.
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    max_risks: usize,
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self { max_risks: DEFAULT_MAX_RISKS }
    }
}

impl RiskAssessor {
    /// Create an assessor keeping at most `max_risks` risks.
    pub fn new(max_risks: usize) -> Self {
        Self { max_risks }
    }

    /// Maximum number of risks returned.
    pub fn max_risks(&self) -> usize {
        self.max_risks
    }

    /// Assess a list of issues.
    pub fn assess_risks(&self, issues: &[Issue]) -> Vec<RiskAssessment> {
        let mut index: HashMap<(&str, Severity), usize> = HashMap::new();
        let mut risks: Vec<RiskAssessment> = Vec::new();

        for issue in issues {
            match index.get(&(issue.category.as_str(), issue.severity)) {
                Some(&position) => risks[position].reinforce(),
                None => {
                    index.insert((issue.category.as_str(), issue.severity), risks.len());
                    risks.push(RiskAssessment::from_issue(issue));
                }
            }
        }

        let groups = risks.len();
        rank_risks(&mut risks, self.max_risks);
        tracing::debug!(issues = issues.len(), groups, kept = risks.len(), "Assessed risks");
        risks
    }
}

/// Risk counts per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    /// `CRITICAL` risks.
    pub critical: usize,
    /// `HIGH` risks.
    pub high: usize,
    /// `MEDIUM` risks.
    pub medium: usize,
    /// `LOW` risks.
    pub low: usize,
    /// `MINIMAL` risks.
    pub minimal: usize,
}

impl RiskSummary {
    /// Count the risks in a list.
    pub fn from_risks(risks: &[RiskAssessment]) -> Self {
        let mut summary = Self::default();
        for risk in risks {
            match risk.risk_level {
                RiskLevel::Critical => summary.critical += 1,
                RiskLevel::High => summary.high += 1,
                RiskLevel::Medium => summary.medium += 1,
                RiskLevel::Low => summary.low += 1,
                RiskLevel::Minimal => summary.minimal += 1,
            }
        }
        summary
    }

    /// Total number of counted risks.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.minimal
    }
}
