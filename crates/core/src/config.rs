//! Configuration structures for the forecast pipeline.
//!
//! One declarative configuration value is threaded through the whole
//! pipeline; no component reads global mutable settings.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{DocumentType, TimestampMs};

/// Main configuration for the forecast pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Timeline bounds configuration.
    pub timeline: TimelineConfig,
    /// Feature aggregation configuration.
    pub aggregation: AggregationConfig,
    /// Chronological split configuration.
    pub split: SplitConfig,
    /// Class-imbalance strategy (exactly one active per run).
    pub imbalance: ImbalanceStrategy,
    /// Minimum positive-class examples required in every partition.
    pub min_positive_examples: usize,
    /// Probability calibration applied over the injected classifier.
    pub calibration: CalibrationMethod,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            aggregation: AggregationConfig::default(),
            split: SplitConfig::default(),
            imbalance: ImbalanceStrategy::default(),
            min_positive_examples: 3,
            calibration: CalibrationMethod::None,
        }
    }
}

impl PipelineConfig {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        self.aggregation.validate()?;
        if let ImbalanceStrategy::ThresholdMoving { threshold } = self.imbalance {
            if !(threshold > 0.0 && threshold < 1.0) {
                return Err(Error::config(format!(
                    "decision threshold must be in (0, 1), got {threshold}"
                )));
            }
        }
        if self.min_positive_examples == 0 {
            return Err(Error::config(
                "min_positive_examples must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Timeline bounds configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Lower bound of the first event's window (ms). `None` leaves the
    /// first window unbounded below; this is a documented choice, not an
    /// implicit default.
    pub start: Option<TimestampMs>,
    /// Processing instant. Documents published after it are rejected as
    /// forward-dated. `None` disables the check (trusted offline batch).
    pub as_of: Option<TimestampMs>,
}

/// One value per document type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerTypeValues {
    pub statement: f64,
    pub minutes: f64,
    pub press_conference: f64,
    pub speech: f64,
    pub research_note: f64,
    pub news: f64,
}

impl PerTypeValues {
    /// Value for one document type.
    #[inline]
    pub fn get(&self, doc_type: DocumentType) -> f64 {
        match doc_type {
            DocumentType::Statement => self.statement,
            DocumentType::Minutes => self.minutes,
            DocumentType::PressConference => self.press_conference,
            DocumentType::Speech => self.speech,
            DocumentType::ResearchNote => self.research_note,
            DocumentType::News => self.news,
        }
    }

    /// True if every value satisfies the predicate.
    pub fn all(&self, pred: impl Fn(f64) -> bool) -> bool {
        DocumentType::ALL.iter().all(|&ty| pred(self.get(ty)))
    }
}

/// Feature aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Exponential-decay half-life per document type, in hours. Slow-moving
    /// official communication decays slower than daily news.
    pub half_life_hours: PerTypeValues,
    /// Relative weight multiplier per document type. Official communication
    /// outranks news by default; these are explicit configuration, not
    /// hardcoded constants.
    pub type_weight: PerTypeValues,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            half_life_hours: PerTypeValues {
                statement: 336.0,
                minutes: 336.0,
                press_conference: 168.0,
                speech: 120.0,
                research_note: 72.0,
                news: 24.0,
            },
            type_weight: PerTypeValues {
                statement: 3.0,
                minutes: 2.5,
                press_conference: 2.0,
                speech: 1.5,
                research_note: 1.2,
                news: 1.0,
            },
        }
    }
}

impl AggregationConfig {
    /// Validate half-lives and weights.
    pub fn validate(&self) -> Result<()> {
        if !self.half_life_hours.all(|v| v > 0.0 && v.is_finite()) {
            return Err(Error::config("decay half-lives must be positive"));
        }
        if !self.type_weight.all(|v| v > 0.0 && v.is_finite()) {
            return Err(Error::config("type weights must be positive"));
        }
        Ok(())
    }
}

/// Chronological split configuration. The test fraction is the remainder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of events (earliest first) used for training.
    pub train_fraction: f64,
    /// Fraction of events used for validation, immediately after train.
    pub validation_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.7,
            validation_fraction: 0.15,
        }
    }
}

impl SplitConfig {
    /// Validate the fractions.
    pub fn validate(&self) -> Result<()> {
        let ok = self.train_fraction > 0.0
            && self.validation_fraction >= 0.0
            && self.train_fraction + self.validation_fraction < 1.0;
        if !ok {
            return Err(Error::config(format!(
                "split fractions invalid: train={}, validation={}",
                self.train_fraction, self.validation_fraction
            )));
        }
        Ok(())
    }
}

/// Class-imbalance handling strategy.
///
/// Rate cuts are rare relative to holds; exactly one strategy is active per
/// run and the enum makes the alternatives mutually exclusive by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ImbalanceStrategy {
    /// Inverse-frequency example weights computed on the training partition.
    ClassWeighting,
    /// Deterministic duplication of minority-class training rows up to
    /// parity. Applied within the training partition only.
    Oversample,
    /// Leave the data untouched and move the decision threshold at
    /// prediction time.
    ThresholdMoving {
        /// Probability above which a cut is predicted.
        threshold: f64,
    },
}

impl Default for ImbalanceStrategy {
    fn default() -> Self {
        ImbalanceStrategy::ClassWeighting
    }
}

impl ImbalanceStrategy {
    /// Stable label string for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            ImbalanceStrategy::ClassWeighting => "class_weighting",
            ImbalanceStrategy::Oversample => "oversample",
            ImbalanceStrategy::ThresholdMoving { .. } => "threshold_moving",
        }
    }
}

/// Probability calibration applied uniformly over any injected classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    /// Use raw classifier probabilities.
    #[default]
    None,
    /// Isotonic regression fit on the validation partition.
    Isotonic,
}
