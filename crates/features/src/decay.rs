//! Recency and type weighting.
//!
//! A document's influence on an event decays exponentially with the gap
//! between publication and decision, with a configurable half-life per
//! document type; official communication decays slower than daily news.

use fomc_core::config::AggregationConfig;
use fomc_core::{hours_to_ms, Document, DocumentType, TimestampMs};

/// Document weighting policy derived from the aggregation configuration.
pub struct WeightPolicy<'a> {
    config: &'a AggregationConfig,
}

impl<'a> WeightPolicy<'a> {
    /// Create a policy over a configuration.
    pub fn new(config: &'a AggregationConfig) -> Self {
        Self { config }
    }

    /// Recency weight for a document age: `0.5^(age / half_life)`.
    ///
    /// Age zero weighs 1.0; one half-life weighs 0.5. Ages are never
    /// negative for aligned documents (publish strictly precedes decision).
    pub fn recency(&self, doc_type: DocumentType, age_ms: i64) -> f64 {
        let half_life_ms = hours_to_ms(self.config.half_life_hours.get(doc_type));
        0.5_f64.powf(age_ms as f64 / half_life_ms)
    }

    /// Type multiplier for a document type.
    pub fn type_multiplier(&self, doc_type: DocumentType) -> f64 {
        self.config.type_weight.get(doc_type)
    }

    /// Combined weight of a document for a decision instant:
    /// recency weight times type multiplier.
    pub fn weight(&self, document: &Document, decision_ts: TimestampMs) -> f64 {
        let age_ms = decision_ts - document.publish_ts;
        self.recency(document.doc_type, age_ms) * self.type_multiplier(document.doc_type)
    }
}
