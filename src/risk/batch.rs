//! Chunked risk formatting for large result sets.
//!
//! Risks from many units are split into fixed-size chunks. Each chunk is ranked
//! and truncated on a blocking task, the survivors are merged in chunk order and
//! ranked once more. Because every chunk keeps its own top `max_risks` and all
//! sorts are stable, the result is the same as ranking everything in one pass.

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use super::assessor::{rank_risks, RiskAssessment, DEFAULT_MAX_RISKS};
use crate::core::{BatchConfig, EngineError, EngineResult};

/// Default number of risks per chunk.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Progress callback, called with a percentage in [0, 100].
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

/// Risks assessed for one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRisks {
    /// Unit the risks belong to.
    pub path: PathBuf,
    /// Assessed risks.
    pub risks: Vec<RiskAssessment>,
}

impl UnitRisks {
    /// Create a new entry.
    pub fn new(path: impl Into<PathBuf>, risks: Vec<RiskAssessment>) -> Self {
        Self { path: path.into(), risks }
    }
}

/// Result of a batch formatting pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRiskReport {
    /// Globally ranked risks, at most `max_risks` of them.
    pub risks: Vec<RiskAssessment>,
    /// Number of risks considered.
    pub total_risks: usize,
    /// Number of chunks processed.
    pub chunks: usize,
}

/// Chunking parameters.
#[derive(Debug, Clone)]
pub struct BatchStrategy {
    batch_size: usize,
    fan_out: usize,
    max_risks: usize,
}

impl Default for BatchStrategy {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default(), DEFAULT_MAX_RISKS)
    }
}

impl BatchStrategy {
    /// Create a strategy from configuration.
    pub fn from_config(config: &BatchConfig, max_risks: usize) -> Self {
        Self { batch_size: config.batch_size.max(1), fan_out: config.fan_out(), max_risks }
    }

    /// Set the chunk size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the number of chunks processed at once.
    #[must_use]
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    /// Set the number of risks kept.
    #[must_use]
    pub fn with_max_risks(mut self, max_risks: usize) -> Self {
        self.max_risks = max_risks;
        self
    }

    /// Risks per chunk.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Chunks processed at once.
    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Maximum number of risks returned.
    pub fn max_risks(&self) -> usize {
        self.max_risks
    }

    /// Rank the risks of all `results` and keep the top `max_risks`.
    ///
    /// Input is validated before any work starts. `progress` receives 0 first,
    /// then a non-decreasing percentage per finished chunk, and 100 last.
    pub async fn format_batch(
        &self,
        results: &[UnitRisks],
        progress: Option<&ProgressFn>,
    ) -> EngineResult<BatchRiskReport> {
        validate(results)?;
        report_progress(progress, 0);

        let all: Vec<RiskAssessment> = results.iter().flat_map(|r| r.risks.iter().cloned()).collect();
        let total_risks = all.len();
        let chunks: Vec<Vec<RiskAssessment>> = all.chunks(self.batch_size).map(<[_]>::to_vec).collect();
        let chunk_count = chunks.len();

        tracing::debug!(
            units = results.len(),
            risks = total_risks,
            chunks = chunk_count,
            fan_out = self.fan_out,
            "Formatting risk batch"
        );

        let max = self.max_risks;
        let mut ranked = stream::iter(chunks.into_iter().map(|mut chunk| async move {
            tokio::task::spawn_blocking(move || {
                rank_risks(&mut chunk, max);
                chunk
            })
            .await
        }))
        .buffered(self.fan_out);

        let mut merged = Vec::with_capacity(chunk_count.saturating_mul(max.min(self.batch_size)));
        let mut done = 0usize;
        while let Some(chunk) = ranked.next().await {
            merged.extend(chunk?);
            done += 1;
            report_progress(progress, (done * 100 / chunk_count) as u8);
        }

        if chunk_count == 0 {
            report_progress(progress, 100);
        }

        rank_risks(&mut merged, max);
        Ok(BatchRiskReport { risks: merged, total_risks, chunks: chunk_count })
    }
}

fn report_progress(progress: Option<&ProgressFn>, percent: u8) {
    if let Some(callback) = progress {
        callback(percent.min(100));
    }
}

fn validate(results: &[UnitRisks]) -> EngineResult<()> {
    for unit in results {
        for (index, risk) in unit.risks.iter().enumerate() {
            if !risk.likelihood.is_finite() || !(0.0..=1.0).contains(&risk.likelihood) {
                return Err(EngineError::invalid(format!(
                    "risk #{index} of {} has likelihood {} outside [0, 1]",
                    unit.path.display(),
                    risk.likelihood
                )));
            }
            if risk.category.trim().is_empty() {
                return Err(EngineError::invalid(format!(
                    "risk #{index} of {} has an empty category",
                    unit.path.display()
                )));
            }
        }
    }
    Ok(())
}
