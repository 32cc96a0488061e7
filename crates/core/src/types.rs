//! Core data types for the FOMC rate-cut forecast pipeline.

use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Milliseconds in one hour.
pub const MS_PER_HOUR: i64 = 3_600_000;

/// Convert a duration in hours to milliseconds.
#[inline]
pub fn hours_to_ms(hours: f64) -> f64 {
    hours * MS_PER_HOUR as f64
}

/// Outcome of one FOMC decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOutcome {
    /// Target rate lowered.
    Cut,
    /// Target rate unchanged.
    Hold,
    /// Target rate raised.
    Hike,
}

impl PolicyOutcome {
    /// Binary classification target: cut vs not-cut.
    #[inline]
    pub fn is_cut(self) -> bool {
        matches!(self, PolicyOutcome::Cut)
    }

    /// Stable label string (matches the serde representation).
    pub fn label(self) -> &'static str {
        match self {
            PolicyOutcome::Cut => "cut",
            PolicyOutcome::Hold => "hold",
            PolicyOutcome::Hike => "hike",
        }
    }

    /// Parse a stable label string back into an outcome.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "cut" => Some(PolicyOutcome::Cut),
            "hold" => Some(PolicyOutcome::Hold),
            "hike" => Some(PolicyOutcome::Hike),
            _ => None,
        }
    }
}

/// Kind of text artifact a score vector was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Post-meeting policy statement.
    Statement,
    /// Meeting minutes (released with a lag).
    Minutes,
    /// Chair press conference transcript.
    PressConference,
    /// Individual official's speech.
    Speech,
    /// Sell-side / academic research note.
    ResearchNote,
    /// Wire and newspaper coverage.
    News,
}

impl DocumentType {
    /// Canonical ordering of all document types.
    ///
    /// This ordering fixes the layout of the per-type blocks in
    /// [`FeatureVector`], so it must not change between runs that share
    /// persisted feature tables.
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Statement,
        DocumentType::Minutes,
        DocumentType::PressConference,
        DocumentType::Speech,
        DocumentType::ResearchNote,
        DocumentType::News,
    ];

    /// Position of this type in [`DocumentType::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        match self {
            DocumentType::Statement => 0,
            DocumentType::Minutes => 1,
            DocumentType::PressConference => 2,
            DocumentType::Speech => 3,
            DocumentType::ResearchNote => 4,
            DocumentType::News => 5,
        }
    }

    /// Stable label string (matches the serde representation).
    pub fn label(self) -> &'static str {
        match self {
            DocumentType::Statement => "statement",
            DocumentType::Minutes => "minutes",
            DocumentType::PressConference => "press_conference",
            DocumentType::Speech => "speech",
            DocumentType::ResearchNote => "research_note",
            DocumentType::News => "news",
        }
    }
}

/// One FOMC decision event.
///
/// Loaded once from a static calendar at pipeline start and immutable
/// thereafter. Events are strictly ordered by `decision_ts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique id, strictly increasing with decision time.
    pub id: u64,
    /// Instant the decision became public (ms).
    pub decision_ts: TimestampMs,
    /// Decision outcome label.
    pub outcome: PolicyOutcome,
}

/// Number of dimensions in a per-document score vector.
pub const SCORE_DIMS: usize = 5;

/// Names of the score dimensions, in [`ScoreVector::to_array`] order.
pub const SCORE_DIM_NAMES: [&str; SCORE_DIMS] = [
    "sentiment",
    "policy_bias",
    "inflation_concern",
    "growth_concern",
    "embedding_summary",
];

/// Fixed-width numeric scores for one document, produced by the external
/// NLP scoring stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    /// Overall tone, negative to positive.
    pub sentiment: f64,
    /// Hawkish (positive) vs dovish (negative) policy stance.
    pub policy_bias: f64,
    /// Emphasis on inflation risk.
    pub inflation_concern: f64,
    /// Emphasis on growth / labor-market risk.
    pub growth_concern: f64,
    /// Scalar summary of the document embedding.
    pub embedding_summary: f64,
}

impl ScoreVector {
    /// All-zero scores.
    pub fn zeroed() -> Self {
        Self::from_array([0.0; SCORE_DIMS])
    }

    /// Pack into a fixed array, ordered as [`SCORE_DIM_NAMES`].
    #[inline]
    pub fn to_array(self) -> [f64; SCORE_DIMS] {
        [
            self.sentiment,
            self.policy_bias,
            self.inflation_concern,
            self.growth_concern,
            self.embedding_summary,
        ]
    }

    /// Unpack from a fixed array, ordered as [`SCORE_DIM_NAMES`].
    #[inline]
    pub fn from_array(values: [f64; SCORE_DIMS]) -> Self {
        Self {
            sentiment: values[0],
            policy_bias: values[1],
            inflation_concern: values[2],
            growth_concern: values[3],
            embedding_summary: values[4],
        }
    }

    /// True if every dimension is a finite number.
    pub fn is_finite(self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// One scored text artifact.
///
/// `publish_ts` is the instant the content became public, never the
/// ingestion time; it is the ground truth for all leakage checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document id.
    pub id: String,
    /// Publication instant (ms).
    pub publish_ts: TimestampMs,
    /// Artifact kind.
    pub doc_type: DocumentType,
    /// Scores from the external NLP stage.
    pub scores: ScoreVector,
}

/// Half-open time window `[lower, upper)` owned by one event.
///
/// `lower` is the previous event's decision instant (`None` when the
/// timeline has no configured start and this is the first event). The
/// boundary policy is the crux of leakage prevention: a document published
/// exactly at `lower` belongs to this window, a document published exactly
/// at `upper` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    /// Inclusive lower bound; `None` = unbounded.
    pub lower: Option<TimestampMs>,
    /// Exclusive upper bound (the owning event's decision instant).
    pub upper: TimestampMs,
}

impl WindowBounds {
    /// Whether a publication instant falls inside this window.
    #[inline]
    pub fn contains(&self, ts: TimestampMs) -> bool {
        self.lower.map_or(true, |lo| ts >= lo) && ts < self.upper
    }
}

/// Total width of an aggregated feature vector:
/// one combined block, one block per document type, one narrative-shift
/// dimension.
pub const FEATURE_WIDTH: usize = SCORE_DIMS + DocumentType::ALL.len() * SCORE_DIMS + 1;

/// Index of a combined-block dimension.
#[inline]
pub fn combined_index(dim: usize) -> usize {
    debug_assert!(dim < SCORE_DIMS);
    dim
}

/// Index of a per-type-block dimension.
#[inline]
pub fn type_index(doc_type: DocumentType, dim: usize) -> usize {
    debug_assert!(dim < SCORE_DIMS);
    SCORE_DIMS + doc_type.index() * SCORE_DIMS + dim
}

/// Index of the narrative-shift dimension.
pub const NARRATIVE_SHIFT_INDEX: usize = FEATURE_WIDTH - 1;

/// Fixed-width aggregated feature vector with per-dimension imputation
/// flags.
///
/// The width is always [`FEATURE_WIDTH`] regardless of how many documents
/// contributed (0, 1, or thousands). A dimension's `imputed` flag is set
/// when its value was substituted from historical means instead of being
/// observed in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
    imputed: Vec<bool>,
}

impl FeatureVector {
    /// All-zero vector with every dimension flagged observed.
    pub fn zeroed() -> Self {
        Self {
            values: vec![0.0; FEATURE_WIDTH],
            imputed: vec![false; FEATURE_WIDTH],
        }
    }

    /// Declared width of the vector.
    #[inline]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// True if the vector has the declared width (guards deserialized data).
    pub fn has_declared_width(&self) -> bool {
        self.values.len() == FEATURE_WIDTH && self.imputed.len() == FEATURE_WIDTH
    }

    /// Dimension value.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Whether a dimension was imputed.
    #[inline]
    pub fn is_imputed(&self, index: usize) -> bool {
        self.imputed[index]
    }

    /// Set a dimension, recording whether it was imputed.
    #[inline]
    pub fn set(&mut self, index: usize, value: f64, imputed: bool) {
        self.values[index] = value;
        self.imputed[index] = imputed;
    }

    /// All dimension values in layout order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// All imputation flags in layout order.
    pub fn imputed_flags(&self) -> &[bool] {
        &self.imputed
    }

    /// Number of imputed dimensions.
    pub fn imputed_count(&self) -> usize {
        self.imputed.iter().filter(|&&f| f).count()
    }

    /// True if every dimension was imputed.
    pub fn all_imputed(&self) -> bool {
        self.imputed.iter().all(|&f| f)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// One row of the aggregated feature table: one event, one fixed-width
/// feature vector, one outcome label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedFeatureRow {
    /// Event id.
    pub event_id: u64,
    /// Event decision instant (ms).
    pub decision_ts: TimestampMs,
    /// Decision outcome label.
    pub outcome: PolicyOutcome,
    /// Aggregated features.
    pub features: FeatureVector,
    /// Number of documents assigned to the event's window.
    pub document_count: usize,
    /// True when the window contained zero documents; such rows are fully
    /// imputed and flagged, never silently dropped.
    pub insufficient_data: bool,
}

impl AggregatedFeatureRow {
    /// Combined-block sentiment (the input to the narrative-shift
    /// computation of the following event).
    #[inline]
    pub fn combined_sentiment(&self) -> f64 {
        self.features.get(combined_index(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_is_cut() {
        assert!(PolicyOutcome::Cut.is_cut());
        assert!(!PolicyOutcome::Hold.is_cut());
        assert!(!PolicyOutcome::Hike.is_cut());
    }

    #[test]
    fn test_document_type_index_matches_all() {
        for (i, ty) in DocumentType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
    }

    #[test]
    fn test_score_vector_round_trip() {
        let scores = ScoreVector {
            sentiment: 0.4,
            policy_bias: -0.2,
            inflation_concern: 0.7,
            growth_concern: 0.1,
            embedding_summary: -0.05,
        };
        assert_eq!(ScoreVector::from_array(scores.to_array()), scores);
    }

    #[test]
    fn test_score_vector_finite() {
        let mut scores = ScoreVector::zeroed();
        assert!(scores.is_finite());
        scores.inflation_concern = f64::NAN;
        assert!(!scores.is_finite());
    }

    #[test]
    fn test_window_bounds_half_open() {
        let bounds = WindowBounds {
            lower: Some(1_000),
            upper: 2_000,
        };
        assert!(bounds.contains(1_000)); // inclusive lower
        assert!(bounds.contains(1_999));
        assert!(!bounds.contains(2_000)); // exclusive upper
        assert!(!bounds.contains(999));
    }

    #[test]
    fn test_window_bounds_unbounded_lower() {
        let bounds = WindowBounds {
            lower: None,
            upper: 100,
        };
        assert!(bounds.contains(i64::MIN));
        assert!(!bounds.contains(100));
    }

    #[test]
    fn test_feature_vector_width() {
        let fv = FeatureVector::zeroed();
        assert_eq!(fv.width(), FEATURE_WIDTH);
        assert_eq!(FEATURE_WIDTH, 36);
        assert!(fv.has_declared_width());
    }

    #[test]
    fn test_feature_index_layout_disjoint() {
        // Combined block, type blocks and narrative shift must not overlap.
        let mut seen = vec![false; FEATURE_WIDTH];
        for dim in 0..SCORE_DIMS {
            seen[combined_index(dim)] = true;
        }
        for ty in DocumentType::ALL {
            for dim in 0..SCORE_DIMS {
                let idx = type_index(ty, dim);
                assert!(!seen[idx]);
                seen[idx] = true;
            }
        }
        assert!(!seen[NARRATIVE_SHIFT_INDEX]);
        seen[NARRATIVE_SHIFT_INDEX] = true;
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_feature_vector_imputed_count() {
        let mut fv = FeatureVector::zeroed();
        assert_eq!(fv.imputed_count(), 0);
        fv.set(3, 1.5, true);
        fv.set(7, -0.5, true);
        assert_eq!(fv.imputed_count(), 2);
        assert!(fv.is_imputed(3));
        assert!(!fv.is_imputed(0));
        assert!(!fv.all_imputed());
    }

    #[test]
    fn test_hours_to_ms() {
        assert!((hours_to_ms(1.0) - 3_600_000.0).abs() < 1e-9);
        assert!((hours_to_ms(0.5) - 1_800_000.0).abs() < 1e-9);
    }
}
