//! Risk levels and the severity mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plugin::Severity;

/// Ordinal risk classification. Lower rank sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Needs attention before the suite can be trusted.
    Critical,
    /// Likely to let regressions through.
    High,
    /// Weakens the suite.
    Medium,
    /// Hygiene.
    Low,
    /// Informational or unclassified.
    Minimal,
}

impl RiskLevel {
    /// All levels, most severe first.
    pub const ALL: [RiskLevel; 5] = [Self::Critical, Self::High, Self::Medium, Self::Low, Self::Minimal];

    /// Sort rank: 0 for `Critical` up to 4 for `Minimal`.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Minimal => 4,
        }
    }

    /// Uppercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Minimal => "MINIMAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a severity to a risk level. Unrecognized severities map to the lowest level.
pub fn map_severity(severity: Severity) -> RiskLevel {
    match severity {
        Severity::Critical => RiskLevel::Critical,
        Severity::High => RiskLevel::High,
        Severity::Medium => RiskLevel::Medium,
        Severity::Low => RiskLevel::Low,
        Severity::Info | Severity::Unknown => RiskLevel::Minimal,
    }
}

/// Starting likelihood for a new risk group.
pub fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 0.9,
        Severity::High => 0.7,
        Severity::Medium => 0.5,
        Severity::Low => 0.3,
        Severity::Info | Severity::Unknown => 0.1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order() {
        let ranks: Vec<u8> = RiskLevel::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_map_severity_is_total() {
        assert_eq!(map_severity(Severity::Critical), RiskLevel::Critical);
        assert_eq!(map_severity(Severity::High), RiskLevel::High);
        assert_eq!(map_severity(Severity::Medium), RiskLevel::Medium);
        assert_eq!(map_severity(Severity::Low), RiskLevel::Low);
        assert_eq!(map_severity(Severity::Info), RiskLevel::Minimal);
        assert_eq!(map_severity(Severity::parse("whatever")), RiskLevel::Minimal);
    }

    #[test]
    fn test_severity_weights_decrease() {
        let weights: Vec<f64> = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low, Severity::Info]
            .into_iter()
            .map(severity_weight)
            .collect();
        assert!(weights.windows(2).all(|w| w[0] > w[1]));
        assert!(weights.iter().all(|w| (0.0..=1.0).contains(w)));
    }

    #[test]
    fn test_level_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"HIGH\"");
        assert_eq!(RiskLevel::Minimal.to_string(), "MINIMAL");
    }
}
