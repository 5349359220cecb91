//! Risk assessment and reporting.
//!
//! Turns raw issues into ranked risks, wraps them in a cached report for the
//! AI rendering layer and re-ranks very large risk sets in chunks.

mod assessor;
mod batch;
mod cache;
mod level;
mod report;

pub use assessor::{
    lookup_impact, lookup_mitigation, rank_risks, RiskAssessment, RiskAssessor, RiskSummary,
    DEFAULT_MAX_RISKS, LIKELIHOOD_STEP,
};
pub use batch::{BatchRiskReport, BatchStrategy, ProgressFn, UnitRisks, DEFAULT_BATCH_SIZE};
pub use cache::{CacheStats, Fingerprint, ReportCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
pub use level::{map_severity, severity_weight, RiskLevel};
pub use report::{AiReport, AnalysisSummary, ReportOptions, RiskReporter, DEFAULT_REPORT_URL};
