//! Confidence-weighted score aggregation.
//!
//! Each plugin scores a unit on its own. The aggregator folds those scores into
//! one, weighting every plugin by its confidence:
//!
//! ```text
//! overall    = Σ(overall_i · w_i) / Σ w_i      (0 when Σ w = 0)
//! dimension  = Σ(dimension_i · w_i) / Σ w_i    (same rule, per dimension)
//! confidence = Σ w_i / N                       (0 when N = 0)
//! ```

use serde::Serialize;

use super::error::{EngineError, EngineResult};
use crate::plugin::{QualityDimensions, QualityScore};

/// Weighted mean that is 0 instead of NaN when there is no weight.
fn weighted_mean(sum: f64, weight: f64) -> f64 {
    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

/// Combine scores that are already known to be well formed.
pub fn combine(scores: &[QualityScore]) -> QualityScore {
    if scores.is_empty() {
        return QualityScore::zero();
    }

    let mut total_weight = 0.0;
    let mut overall = 0.0;
    let mut dims = QualityDimensions::default();

    for score in scores {
        let weight = score.confidence;
        total_weight += weight;
        overall += score.overall * weight;
        dims.completeness += score.dimensions.completeness * weight;
        dims.correctness += score.dimensions.correctness * weight;
        dims.maintainability += score.dimensions.maintainability * weight;
    }

    QualityScore {
        overall: weighted_mean(overall, total_weight),
        confidence: total_weight / scores.len() as f64,
        dimensions: QualityDimensions {
            completeness: weighted_mean(dims.completeness, total_weight),
            correctness: weighted_mean(dims.correctness, total_weight),
            maintainability: weighted_mean(dims.maintainability, total_weight),
        },
    }
}

/// Validate and combine per-plugin scores.
///
/// Returns [`EngineError::InvalidInput`] if any score is non-finite or out of
/// range; there is no meaningful partial result in that case.
pub fn aggregate(scores: &[QualityScore]) -> EngineResult<QualityScore> {
    if let Some((index, bad)) = scores.iter().enumerate().find(|(_, s)| !s.is_well_formed()) {
        return Err(EngineError::invalid(format!(
            "score #{index} is out of range (overall {}, confidence {})",
            bad.overall, bad.confidence
        )));
    }

    Ok(combine(scores))
}

/// Bucket counts of scores by quality band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    /// Scores of 90 and above.
    pub excellent: usize,
    /// Scores in [70, 90).
    pub good: usize,
    /// Scores in [50, 70).
    pub fair: usize,
    /// Scores below 50.
    pub poor: usize,
}

impl ScoreDistribution {
    /// Count a score into its band.
    pub fn record(&mut self, score: f64) {
        match score {
            s if s >= 90.0 => self.excellent += 1,
            s if s >= 70.0 => self.good += 1,
            s if s >= 50.0 => self.fair += 1,
            _ => self.poor += 1,
        }
    }

    /// Build a distribution from an iterator of scores.
    pub fn from_scores(scores: impl IntoIterator<Item = f64>) -> Self {
        let mut distribution = Self::default();
        for score in scores {
            distribution.record(score);
        }
        distribution
    }

    /// Total number of recorded scores.
    pub fn total(&self) -> usize {
        self.excellent + self.good + self.fair + self.poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_aggregate_empty_is_zero() {
        let score = aggregate(&[]).unwrap();

        assert_eq!(score, QualityScore::zero());
        assert!(!score.overall.is_nan());
        assert!(score.dimensions.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_aggregate_equal_confidence_is_mean() {
        let scores = [QualityScore::uniform(100.0), QualityScore::uniform(80.0), QualityScore::uniform(60.0)];

        let score = aggregate(&scores).unwrap();
        assert!((score.overall - 80.0).abs() < EPS);
        assert!((score.confidence - 1.0).abs() < EPS);
        assert!((score.dimensions.maintainability - 80.0).abs() < EPS);
    }

    #[test]
    fn test_aggregate_weights_by_confidence() {
        let scores = [
            QualityScore::uniform(100.0).with_confidence(0.75),
            QualityScore::uniform(20.0).with_confidence(0.25),
        ];

        let score = aggregate(&scores).unwrap();
        assert!((score.overall - 80.0).abs() < EPS);
        assert!((score.confidence - 0.5).abs() < EPS);
    }

    #[test]
    fn test_aggregate_dimensions_independently() {
        let scores = [
            QualityScore::new(
                50.0,
                QualityDimensions { completeness: 10.0, correctness: 90.0, maintainability: 50.0 },
            ),
            QualityScore::new(
                70.0,
                QualityDimensions { completeness: 30.0, correctness: 70.0, maintainability: 100.0 },
            )
            .with_confidence(0.5),
        ];

        let score = aggregate(&scores).unwrap();
        assert!((score.dimensions.completeness - (10.0 + 15.0) / 1.5).abs() < EPS);
        assert!((score.dimensions.correctness - (90.0 + 35.0) / 1.5).abs() < EPS);
        assert!((score.dimensions.maintainability - (50.0 + 50.0) / 1.5).abs() < EPS);
    }

    #[test]
    fn test_aggregate_zero_weight_is_not_nan() {
        let scores = [QualityScore::uniform(90.0).with_confidence(0.0), QualityScore::uniform(40.0).with_confidence(0.0)];

        let score = aggregate(&scores).unwrap();
        assert_eq!(score.overall, 0.0);
        assert_eq!(score.confidence, 0.0);
        assert!(score.dimensions.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_aggregate_rejects_invalid_input() {
        let scores = [QualityScore::uniform(80.0), QualityScore::uniform(f64::NAN)];
        let err = aggregate(&scores).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert!(err.to_string().contains("#1"));

        assert!(aggregate(&[QualityScore::uniform(101.0)]).is_err());
        assert!(aggregate(&[QualityScore::uniform(50.0).with_confidence(-0.1)]).is_err());
    }

    #[test]
    fn test_score_distribution_bands() {
        let distribution = ScoreDistribution::from_scores([95.0, 90.0, 89.9, 70.0, 69.99, 50.0, 49.0, 0.0]);

        assert_eq!(distribution.excellent, 2);
        assert_eq!(distribution.good, 2);
        assert_eq!(distribution.fair, 2);
        assert_eq!(distribution.poor, 2);
        assert_eq!(distribution.total(), 8);
    }
}
