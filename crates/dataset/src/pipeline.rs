//! End-to-end pipeline driver.
//!
//! Align -> aggregate -> assemble -> fit/calibrate -> forecast, with a run
//! summary of skipped documents, coverage gaps and imputation rates. The
//! summary counts are part of the output contract, not incidental logging.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assembler::{assemble, ClassCounts};
use crate::predictor::{EventForecast, Forecaster, ProbabilisticClassifier};
use fomc_alignment::{align, DocumentIndex, EventTimeline};
use fomc_core::{AggregatedFeatureRow, PipelineConfig, Result};
use fomc_features::AggregationEngine;

/// Data-quality and dataset-shape summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Events on the timeline.
    pub events: usize,
    /// Documents accepted into the index.
    pub documents_accepted: u64,
    /// Documents rejected at registration, all reasons.
    pub documents_rejected: u64,
    /// Accepted documents published before the configured timeline start.
    pub documents_before_timeline: usize,
    /// Accepted documents published at or after the last decision.
    pub documents_after_timeline: usize,
    /// Events whose window contained zero documents.
    pub coverage_gaps: Vec<u64>,
    /// Events with fully imputed rows.
    pub insufficient_events: usize,
    /// Fraction of produced feature dimensions that were imputed.
    pub imputation_rate: f64,
    /// Applied imbalance strategy.
    pub strategy: String,
    /// Decision threshold used at prediction time.
    pub decision_threshold: f64,
    /// Training partition class balance (after the strategy).
    pub train_counts: ClassCounts,
    /// Validation partition class balance.
    pub validation_counts: ClassCounts,
    /// Test partition class balance.
    pub test_counts: ClassCounts,
    /// Examples added by oversampling.
    pub oversampled_added: usize,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// The aggregated feature table, in event order.
    pub rows: Vec<AggregatedFeatureRow>,
    /// Forecasts for the test partition, in event order.
    pub forecasts: Vec<EventForecast>,
    /// Run summary.
    pub summary: RunSummary,
}

/// Run the full pipeline over a validated timeline and document index.
///
/// The injected backend only ever sees the assembled training partition;
/// forecasts are produced for the chronologically held-out test events.
pub fn run_pipeline(
    config: &PipelineConfig,
    timeline: &EventTimeline,
    index: &DocumentIndex,
    backend: Box<dyn ProbabilisticClassifier>,
) -> Result<PipelineReport> {
    config.validate()?;

    let alignment = align(timeline, index);
    let engine = AggregationEngine::new(config);
    let (rows, aggregation_stats) = engine.run(timeline, index, &alignment);

    let splits = assemble(&rows, config)?;

    let mut forecaster = Forecaster::new(backend, config.calibration);
    forecaster.fit(&splits)?;
    let forecasts = forecaster.forecast_rows(&rows[splits.indices.test()])?;

    let index_stats = index.stats();
    let alignment_stats = alignment.stats();
    let summary = RunSummary {
        events: timeline.len(),
        documents_accepted: index_stats.accepted,
        documents_rejected: index_stats.total_rejected(),
        documents_before_timeline: alignment_stats.before_timeline,
        documents_after_timeline: alignment_stats.after_timeline,
        coverage_gaps: alignment_stats.coverage_gaps.clone(),
        insufficient_events: aggregation_stats.insufficient_events,
        imputation_rate: aggregation_stats.imputation_rate(),
        strategy: splits.strategy.label().to_string(),
        decision_threshold: splits.decision_threshold,
        train_counts: splits.train_counts,
        validation_counts: splits.validation_counts,
        test_counts: splits.test_counts,
        oversampled_added: splits.oversampled_added,
    };

    info!(
        events = summary.events,
        documents_accepted = summary.documents_accepted,
        documents_rejected = summary.documents_rejected,
        coverage_gaps = summary.coverage_gaps.len(),
        imputation_rate = summary.imputation_rate,
        forecasts = forecasts.len(),
        "pipeline run complete"
    );

    Ok(PipelineReport {
        rows,
        forecasts,
        summary,
    })
}
