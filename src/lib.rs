//! # Testgauge
//!
//! Plugin orchestration, score aggregation and risk prioritization for test
//! quality analysis.
//!
//! Testgauge runs pluggable quality checks over test source files, folds their
//! findings into a confidence-weighted quality score and turns raw findings
//! into a ranked, size-bounded risk report for machine consumption.
//!
//! ## Features
//!
//! - **Plugins**: legacy analyzers, full quality plugins and regex-backed custom plugins
//! - **Failure isolation**: per-plugin timeouts, errors and panics are recorded, never raised
//! - **Aggregation**: confidence-weighted scores across quality dimensions
//! - **Risks**: grouped, ranked and cached risk reports, with chunked batch ranking
//!
//! ## Quick Start
//!
//! ```no_run
//! use testgauge::{AnalysisEngine, TestUnit};
//!
//! # async fn run() {
//! let engine = AnalysisEngine::new();
//! let unit = TestUnit::new("src/math.test.ts", "it('adds', () => {});");
//!
//! let report = engine.analyze_with_quality(&unit).await;
//! println!("score: {:.1}", report.aggregated_score.overall);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)]

pub mod core;
pub mod logging;
pub mod plugin;
pub mod risk;

// Re-export commonly used types
pub use crate::core::{
    AnalysisEngine, AnalysisOptions, AnalysisReport, BatchQualityReport, Config, EngineError,
    EngineResult, ExecutionStats, FaultKind, PluginFault, QualityReport,
};
pub use crate::plugin::{
    CustomPluginSpec, DetectionResult, Improvement, Issue, LegacyPlugin, PluginError,
    PluginResult, QualityPlugin, QualityScore, Severity, TestUnit,
};
pub use crate::risk::{AiReport, AnalysisSummary, ReportOptions, RiskAssessment, RiskLevel, UnitRisks};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "testgauge";
