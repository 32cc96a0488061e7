//! Feature aggregation engine.
//!
//! Collapses the documents assigned to each event into one fixed-width
//! feature row. Aggregation is a strict left-to-right fold over events:
//! the narrative-shift dimension of each row depends on the previous
//! event's aggregated output, carried as an explicit accumulator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decay::WeightPolicy;
use crate::imputation::TypeMeans;
use fomc_alignment::{Alignment, DocumentIndex, EventTimeline};
use fomc_core::config::AggregationConfig;
use fomc_core::{
    combined_index, type_index, AggregatedFeatureRow, Document, DocumentType, Event,
    FeatureVector, PipelineConfig, NARRATIVE_SHIFT_INDEX, SCORE_DIMS,
};

/// Statistics about one aggregation pass.
///
/// The imputation rate is part of the pipeline's output contract.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregationStats {
    /// Events aggregated.
    pub events: usize,
    /// Events with zero assigned documents (fully imputed rows).
    pub insufficient_events: usize,
    /// Total imputed dimensions across all rows.
    pub imputed_dimensions: usize,
    /// Total observed dimensions across all rows.
    pub observed_dimensions: usize,
}

impl AggregationStats {
    /// Fraction of all produced dimensions that were imputed.
    pub fn imputation_rate(&self) -> f64 {
        let total = self.imputed_dimensions + self.observed_dimensions;
        if total > 0 {
            self.imputed_dimensions as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Aggregate one event's assigned documents into a feature row.
///
/// `prev` is the previous event's aggregated row (timeline order); the
/// narrative-shift dimension is the signed difference between this row's
/// combined sentiment and the previous row's. The output vector always has
/// the declared width, for 0, 1, or N documents.
pub fn aggregate_event(
    event: &Event,
    documents: &[&Document],
    prev: Option<&AggregatedFeatureRow>,
    means: &TypeMeans,
    config: &AggregationConfig,
) -> AggregatedFeatureRow {
    let policy = WeightPolicy::new(config);
    let mut features = FeatureVector::zeroed();
    let insufficient = documents.is_empty();

    // Combined block: recency- and type-weighted mean across all documents.
    if insufficient {
        let global = means.global().to_array();
        for (dim, value) in global.iter().enumerate() {
            features.set(combined_index(dim), *value, true);
        }
    } else {
        let mut acc = [0.0; SCORE_DIMS];
        let mut weight_sum = 0.0;
        for doc in documents {
            let w = policy.weight(doc, event.decision_ts);
            let scores = doc.scores.to_array();
            for (dim, value) in scores.iter().enumerate() {
                acc[dim] += w * value;
            }
            weight_sum += w;
        }
        for (dim, value) in acc.iter().enumerate() {
            features.set(combined_index(dim), value / weight_sum, false);
        }
    }

    // Per-type blocks: recency-weighted mean within each type. A type with
    // no contributing documents is filled from the dataset-wide mean for
    // that type and flagged.
    for ty in DocumentType::ALL {
        let mut acc = [0.0; SCORE_DIMS];
        let mut weight_sum = 0.0;
        for doc in documents.iter().filter(|d| d.doc_type == ty) {
            let age_ms = event.decision_ts - doc.publish_ts;
            let w = policy.recency(ty, age_ms);
            let scores = doc.scores.to_array();
            for (dim, value) in scores.iter().enumerate() {
                acc[dim] += w * value;
            }
            weight_sum += w;
        }
        if weight_sum > 0.0 {
            for (dim, value) in acc.iter().enumerate() {
                features.set(type_index(ty, dim), value / weight_sum, false);
            }
        } else {
            let mean = means.mean_for(ty).to_array();
            for (dim, value) in mean.iter().enumerate() {
                features.set(type_index(ty, dim), *value, true);
            }
            debug!(
                event_id = event.id,
                doc_type = ty.label(),
                "type block imputed from historical means"
            );
        }
    }

    // Narrative shift: this window's combined sentiment minus the previous
    // event's. The first event has no prior row to difference against.
    let sentiment = features.get(combined_index(0));
    let (shift, shift_imputed) = match prev {
        Some(prev_row) => (sentiment - prev_row.combined_sentiment(), insufficient),
        None => (0.0, true),
    };
    features.set(NARRATIVE_SHIFT_INDEX, shift, shift_imputed);

    AggregatedFeatureRow {
        event_id: event.id,
        decision_ts: event.decision_ts,
        outcome: event.outcome,
        features,
        document_count: documents.len(),
        insufficient_data: insufficient,
    }
}

/// Aggregation engine: folds an alignment into the event feature table.
pub struct AggregationEngine {
    config: AggregationConfig,
}

impl AggregationEngine {
    /// Create an engine from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.aggregation.clone(),
        }
    }

    /// Aggregate every event in timeline order.
    ///
    /// `alignment` must have been produced from the same timeline and
    /// index. The fold is strictly sequential: each row's narrative shift
    /// depends on the row before it.
    pub fn run(
        &self,
        timeline: &EventTimeline,
        index: &DocumentIndex,
        alignment: &Alignment,
    ) -> (Vec<AggregatedFeatureRow>, AggregationStats) {
        let means = TypeMeans::from_documents(index.documents());
        let mut rows = Vec::with_capacity(timeline.len());
        let mut stats = AggregationStats::default();
        let mut prev: Option<AggregatedFeatureRow> = None;

        for (event, window) in timeline.events().iter().zip(alignment.windows()) {
            debug_assert_eq!(event.id, window.event_id);
            let documents: Vec<&Document> = index.documents_in(&window.bounds).collect();
            let row = aggregate_event(event, &documents, prev.as_ref(), &means, &self.config);

            stats.events += 1;
            if row.insufficient_data {
                stats.insufficient_events += 1;
            }
            let imputed = row.features.imputed_count();
            stats.imputed_dimensions += imputed;
            stats.observed_dimensions += row.features.width() - imputed;

            prev = Some(row.clone());
            rows.push(row);
        }

        (rows, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomc_alignment::align;
    use fomc_core::{PolicyOutcome, ScoreVector, MS_PER_HOUR};

    fn make_event(id: u64, decision_ts: i64) -> Event {
        Event {
            id,
            decision_ts,
            outcome: PolicyOutcome::Hold,
        }
    }

    fn make_doc(id: &str, publish_ts: i64, doc_type: DocumentType, sentiment: f64) -> Document {
        let mut scores = ScoreVector::zeroed();
        scores.sentiment = sentiment;
        Document {
            id: id.to_string(),
            publish_ts,
            doc_type,
            scores,
        }
    }

    fn setup(
        documents: Vec<Document>,
    ) -> (EventTimeline, DocumentIndex, Alignment, AggregationEngine) {
        let timeline = EventTimeline::new(
            vec![
                make_event(1, 100 * MS_PER_HOUR),
                make_event(2, 200 * MS_PER_HOUR),
                make_event(3, 300 * MS_PER_HOUR),
            ],
            None,
        )
        .unwrap();
        let mut index = DocumentIndex::new(None);
        index.register_all(documents);
        let alignment = align(&timeline, &index);
        let engine = AggregationEngine::new(&PipelineConfig::default());
        (timeline, index, alignment, engine)
    }

    #[test]
    fn test_fixed_width_for_any_document_count() {
        let many: Vec<Document> = (0..50)
            .map(|i| {
                make_doc(
                    &format!("d{i}"),
                    150 * MS_PER_HOUR + i,
                    DocumentType::News,
                    0.1,
                )
            })
            .collect();
        let mut docs = vec![make_doc("solo", 50 * MS_PER_HOUR, DocumentType::Speech, 0.5)];
        docs.extend(many);
        let (timeline, index, alignment, engine) = setup(docs);
        let (rows, _) = engine.run(&timeline, &index, &alignment);

        // Event 1: one document, event 2: fifty, event 3: zero.
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!(row.features.has_declared_width());
        }
        assert_eq!(rows[0].document_count, 1);
        assert_eq!(rows[1].document_count, 50);
        assert_eq!(rows[2].document_count, 0);
    }

    #[test]
    fn test_zero_document_event_fully_imputed() {
        let docs = vec![
            make_doc("n", 50 * MS_PER_HOUR, DocumentType::News, 0.4),
            make_doc("s", 60 * MS_PER_HOUR, DocumentType::Speech, 0.8),
        ];
        let (timeline, index, alignment, engine) = setup(docs);
        let (rows, stats) = engine.run(&timeline, &index, &alignment);

        let empty_row = &rows[1];
        assert!(empty_row.insufficient_data);
        assert!(empty_row.features.all_imputed());

        // Per-type blocks carry the dataset-wide type means.
        let means = TypeMeans::from_documents(index.documents());
        let news_mean = means.mean_for(DocumentType::News);
        assert!(
            (empty_row.features.get(type_index(DocumentType::News, 0)) - news_mean.sentiment)
                .abs()
                < 1e-12
        );
        assert_eq!(stats.insufficient_events, 2);
    }

    #[test]
    fn test_type_weighting_pulls_combined_block() {
        // Statement and news at the same instant with opposite sentiment:
        // the combined mean must sit on the statement's side of zero.
        let docs = vec![
            make_doc("st", 90 * MS_PER_HOUR, DocumentType::Statement, 1.0),
            make_doc("nw", 90 * MS_PER_HOUR, DocumentType::News, -1.0),
        ];
        let (timeline, index, alignment, engine) = setup(docs);
        let (rows, _) = engine.run(&timeline, &index, &alignment);
        assert!(rows[0].combined_sentiment() > 0.0);
    }

    #[test]
    fn test_recency_weighting_favors_newer_documents() {
        let docs = vec![
            make_doc("old", 10 * MS_PER_HOUR, DocumentType::News, -1.0),
            make_doc("new", 99 * MS_PER_HOUR, DocumentType::News, 1.0),
        ];
        let (timeline, index, alignment, engine) = setup(docs);
        let (rows, _) = engine.run(&timeline, &index, &alignment);
        assert!(rows[0].combined_sentiment() > 0.0);
    }

    #[test]
    fn test_missing_type_block_imputed_present_observed() {
        let docs = vec![make_doc("n", 50 * MS_PER_HOUR, DocumentType::News, 0.4)];
        let (timeline, index, alignment, engine) = setup(docs);
        let (rows, _) = engine.run(&timeline, &index, &alignment);

        let row = &rows[0];
        assert!(!row.features.is_imputed(type_index(DocumentType::News, 0)));
        assert!(row.features.is_imputed(type_index(DocumentType::Minutes, 0)));
        assert!(row.features.is_imputed(type_index(DocumentType::Statement, 0)));
    }

    #[test]
    fn test_first_event_narrative_shift_zero_and_flagged() {
        let docs = vec![make_doc("n", 50 * MS_PER_HOUR, DocumentType::News, 0.4)];
        let (timeline, index, alignment, engine) = setup(docs);
        let (rows, _) = engine.run(&timeline, &index, &alignment);

        assert!((rows[0].features.get(NARRATIVE_SHIFT_INDEX) - 0.0).abs() < 1e-12);
        assert!(rows[0].features.is_imputed(NARRATIVE_SHIFT_INDEX));
    }

    #[test]
    fn test_narrative_shift_is_sentiment_difference() {
        let docs = vec![
            make_doc("a", 50 * MS_PER_HOUR, DocumentType::News, 0.2),
            make_doc("b", 150 * MS_PER_HOUR, DocumentType::News, 0.8),
        ];
        let (timeline, index, alignment, engine) = setup(docs);
        let (rows, _) = engine.run(&timeline, &index, &alignment);

        let expected = rows[1].combined_sentiment() - rows[0].combined_sentiment();
        assert!((rows[1].features.get(NARRATIVE_SHIFT_INDEX) - expected).abs() < 1e-12);
        assert!(!rows[1].features.is_imputed(NARRATIVE_SHIFT_INDEX));
    }

    #[test]
    fn test_narrative_shift_tracks_previous_event_only() {
        // Holding event 2's documents fixed, changing event 1's documents
        // must change event 2's narrative shift, and only through the
        // previous row's sentiment.
        let event2_doc = make_doc("b", 150 * MS_PER_HOUR, DocumentType::News, 0.8);

        let (timeline, index, alignment, engine) = setup(vec![
            make_doc("a", 50 * MS_PER_HOUR, DocumentType::News, 0.2),
            event2_doc.clone(),
        ]);
        let (rows_low, _) = engine.run(&timeline, &index, &alignment);

        let (timeline, index, alignment, engine) = setup(vec![
            make_doc("a", 50 * MS_PER_HOUR, DocumentType::News, 0.6),
            event2_doc,
        ]);
        let (rows_high, _) = engine.run(&timeline, &index, &alignment);

        let shift_low = rows_low[1].features.get(NARRATIVE_SHIFT_INDEX);
        let shift_high = rows_high[1].features.get(NARRATIVE_SHIFT_INDEX);
        assert!((shift_low - shift_high).abs() > 1e-9);

        // Event 2's own combined sentiment is unchanged.
        assert!(
            (rows_low[1].combined_sentiment() - rows_high[1].combined_sentiment()).abs() < 1e-12
        );
    }

    #[test]
    fn test_imputation_rate() {
        let docs = vec![make_doc("n", 50 * MS_PER_HOUR, DocumentType::News, 0.4)];
        let (timeline, index, alignment, engine) = setup(docs);
        let (_, stats) = engine.run(&timeline, &index, &alignment);

        assert!(stats.imputation_rate() > 0.0);
        assert!(stats.imputation_rate() < 1.0);
        assert_eq!(
            stats.imputed_dimensions + stats.observed_dimensions,
            3 * fomc_core::FEATURE_WIDTH
        );
    }
}
