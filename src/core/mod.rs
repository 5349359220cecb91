//! Core engine for Testgauge.
//!
//! This module contains the analysis engine and the pieces it is built from:
//! configuration, plugin scheduling, score aggregation and error types.

mod aggregate;
mod config;
mod engine;
mod error;
mod scheduler;

pub use aggregate::{aggregate, combine, ScoreDistribution};
pub use config::{
    AnalysisOptions, BatchConfig, CacheConfig, Config, ReportConfig, RiskConfig, LOCAL_CONFIG_FILE,
};
pub use engine::{
    AnalysisEngine, AnalysisReport, BatchQualityReport, PluginQualityAnalysis, QualityReport,
};
pub use error::{EngineError, EngineResult};
pub use scheduler::{
    ExecutionStats, FaultKind, PluginFault, PluginOutcome, PluginStatus, ScheduleResult, Scheduler,
    DEFAULT_TIMEOUT,
};
