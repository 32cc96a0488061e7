//! Prediction interface.
//!
//! A minimal two-operation capability over any probability-emitting
//! estimator. The pipeline depends only on this contract; concrete
//! backends (gradient-boosted trees, logistic models, stubs) are injected
//! from outside.

use serde::{Deserialize, Serialize};

use crate::assembler::{DatasetSplits, Partition};
use crate::calibration::CalibratedClassifier;
use fomc_core::config::CalibrationMethod;
use fomc_core::{AggregatedFeatureRow, Error, Result, TimestampMs};

/// Capability contract for an injected probabilistic classifier.
///
/// `fit` trains on a weighted partition; `predict_probability` returns the
/// positive-class probability for one feature vector. Implementations
/// should return values in [0, 1]; the forecaster clamps out-of-range
/// outputs.
pub trait ProbabilisticClassifier {
    /// Train on the given partition.
    fn fit(&mut self, train: &Partition) -> Result<()>;

    /// Positive-class probability for one feature vector.
    fn predict_probability(&self, features: &[f64]) -> Result<f64>;
}

impl ProbabilisticClassifier for Box<dyn ProbabilisticClassifier> {
    fn fit(&mut self, train: &Partition) -> Result<()> {
        (**self).fit(train)
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64> {
        (**self).predict_probability(features)
    }
}

/// Baseline backend: predicts the weighted positive rate of its training
/// partition for every input.
///
/// A reference implementation of the capability contract and a test
/// double, not a real model.
#[derive(Debug, Default)]
pub struct ClassPriorClassifier {
    prior: Option<f64>,
}

impl ClassPriorClassifier {
    /// Create an unfitted baseline.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProbabilisticClassifier for ClassPriorClassifier {
    fn fit(&mut self, train: &Partition) -> Result<()> {
        let total_weight: f64 = train.iter().map(|e| e.weight).sum();
        if total_weight <= 0.0 {
            return Err(Error::model("cannot fit on an empty training partition"));
        }
        let positive_weight: f64 = train
            .iter()
            .filter(|e| e.label)
            .map(|e| e.weight)
            .sum();
        self.prior = Some(positive_weight / total_weight);
        Ok(())
    }

    fn predict_probability(&self, _features: &[f64]) -> Result<f64> {
        self.prior
            .ok_or_else(|| Error::model("classifier has not been fitted"))
    }
}

/// One per-event forecast with its data-quality flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventForecast {
    /// Event id.
    pub event_id: u64,
    /// Event decision instant (ms).
    pub decision_ts: TimestampMs,
    /// Calibrated cut probability in [0, 1].
    pub probability: f64,
    /// Probability compared against the active decision threshold.
    pub predicted_cut: bool,
    /// True when the event's window had zero documents.
    pub insufficient_data: bool,
    /// Number of imputed feature dimensions behind this forecast.
    pub imputed_dimensions: usize,
}

/// Fits an injected backend on the assembled dataset and produces
/// per-event probabilities.
pub struct Forecaster {
    model: CalibratedClassifier<Box<dyn ProbabilisticClassifier>>,
    method: CalibrationMethod,
    threshold: f64,
}

impl Forecaster {
    /// Create a forecaster over an injected backend.
    pub fn new(backend: Box<dyn ProbabilisticClassifier>, method: CalibrationMethod) -> Self {
        Self {
            model: CalibratedClassifier::new(backend),
            method,
            threshold: 0.5,
        }
    }

    /// Fit the backend on the training partition and, if configured,
    /// calibrate on the validation partition.
    ///
    /// Also adopts the dataset's decision threshold (moved thresholds come
    /// from the imbalance strategy).
    pub fn fit(&mut self, splits: &DatasetSplits) -> Result<()> {
        self.model.fit(&splits.train)?;
        self.threshold = splits.decision_threshold;
        if self.method == CalibrationMethod::Isotonic {
            if splits.validation.is_empty() {
                return Err(Error::model(
                    "isotonic calibration requires a non-empty validation partition",
                ));
            }
            self.model.calibrate(&splits.validation)?;
        }
        Ok(())
    }

    /// Active decision threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Forecast one aggregated event row.
    pub fn forecast_row(&self, row: &AggregatedFeatureRow) -> Result<EventForecast> {
        let raw = self.model.predict_probability(row.features.values())?;
        let probability = raw.clamp(0.0, 1.0);
        Ok(EventForecast {
            event_id: row.event_id,
            decision_ts: row.decision_ts,
            probability,
            predicted_cut: probability >= self.threshold,
            insufficient_data: row.insufficient_data,
            imputed_dimensions: row.features.imputed_count(),
        })
    }

    /// Forecast a sequence of rows in order.
    pub fn forecast_rows(&self, rows: &[AggregatedFeatureRow]) -> Result<Vec<EventForecast>> {
        rows.iter().map(|row| self.forecast_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::TrainingExample;

    fn make_example(label: bool, weight: f64) -> TrainingExample {
        TrainingExample {
            event_id: 1,
            decision_ts: 1_000,
            features: vec![0.0; 3],
            label,
            weight,
        }
    }

    #[test]
    fn test_class_prior_unweighted() {
        let mut model = ClassPriorClassifier::new();
        let train = vec![
            make_example(true, 1.0),
            make_example(false, 1.0),
            make_example(false, 1.0),
            make_example(false, 1.0),
        ];
        model.fit(&train).unwrap();
        let p = model.predict_probability(&[0.0; 3]).unwrap();
        assert!((p - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_class_prior_respects_weights() {
        let mut model = ClassPriorClassifier::new();
        let train = vec![make_example(true, 3.0), make_example(false, 1.0)];
        model.fit(&train).unwrap();
        let p = model.predict_probability(&[0.0; 3]).unwrap();
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_classifier_errors() {
        let model = ClassPriorClassifier::new();
        assert!(matches!(
            model.predict_probability(&[0.0; 3]),
            Err(Error::Model(_))
        ));
    }

    #[test]
    fn test_fit_on_empty_partition_errors() {
        let mut model = ClassPriorClassifier::new();
        assert!(model.fit(&vec![]).is_err());
    }

    /// Backend whose score is its first feature; gives calibration a
    /// signal to work with.
    struct FirstFeatureScore;

    impl ProbabilisticClassifier for FirstFeatureScore {
        fn fit(&mut self, _train: &Partition) -> Result<()> {
            Ok(())
        }

        fn predict_probability(&self, features: &[f64]) -> Result<f64> {
            Ok(features[0])
        }
    }

    fn splits_from(train: Partition, validation: Partition, test: Partition) -> DatasetSplits {
        use crate::splitter::SplitIndices;
        use fomc_core::config::ImbalanceStrategy;

        let indices = SplitIndices {
            train_end: train.len(),
            validation_end: train.len() + validation.len(),
            len: train.len() + validation.len() + test.len(),
        };
        DatasetSplits {
            train_counts: crate::assembler::ClassCounts::default(),
            validation_counts: crate::assembler::ClassCounts::default(),
            test_counts: crate::assembler::ClassCounts::default(),
            decision_threshold: 0.5,
            strategy: ImbalanceStrategy::ThresholdMoving { threshold: 0.5 },
            indices,
            train,
            validation,
            test,
            oversampled_added: 0,
        }
    }

    fn scored_example(event_id: u64, score: f64, label: bool) -> TrainingExample {
        TrainingExample {
            event_id,
            decision_ts: event_id as i64 * 1_000,
            features: vec![score, 0.0, 0.0],
            label,
            weight: 1.0,
        }
    }

    #[test]
    fn test_forecaster_uncalibrated_passthrough() {
        let splits = splits_from(
            vec![scored_example(1, 0.2, false), scored_example(2, 0.9, true)],
            vec![],
            vec![],
        );
        let mut forecaster =
            Forecaster::new(Box::new(FirstFeatureScore), CalibrationMethod::None);
        forecaster.fit(&splits).unwrap();

        let row = fomc_core::AggregatedFeatureRow {
            event_id: 9,
            decision_ts: 9_000,
            outcome: fomc_core::PolicyOutcome::Hold,
            features: {
                let mut fv = fomc_core::FeatureVector::zeroed();
                fv.set(0, 0.7, false);
                fv
            },
            document_count: 2,
            insufficient_data: false,
        };
        let forecast = forecaster.forecast_row(&row).unwrap();
        assert!((forecast.probability - 0.7).abs() < 1e-12);
        assert!(forecast.predicted_cut);
        assert!(!forecast.insufficient_data);
    }

    #[test]
    fn test_forecaster_isotonic_calibration() {
        let validation = vec![
            scored_example(3, 0.1, false),
            scored_example(4, 0.3, false),
            scored_example(5, 0.7, true),
            scored_example(6, 0.9, true),
        ];
        let splits = splits_from(
            vec![scored_example(1, 0.2, false), scored_example(2, 0.9, true)],
            validation,
            vec![],
        );
        let mut forecaster =
            Forecaster::new(Box::new(FirstFeatureScore), CalibrationMethod::Isotonic);
        forecaster.fit(&splits).unwrap();

        let mut fv = fomc_core::FeatureVector::zeroed();
        fv.set(0, 0.8, false);
        let row = fomc_core::AggregatedFeatureRow {
            event_id: 9,
            decision_ts: 9_000,
            outcome: fomc_core::PolicyOutcome::Hold,
            features: fv,
            document_count: 1,
            insufficient_data: false,
        };
        // Raw 0.8 falls in the perfectly positive block.
        let forecast = forecaster.forecast_row(&row).unwrap();
        assert!((forecast.probability - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_isotonic_requires_validation() {
        let splits = splits_from(vec![scored_example(1, 0.2, true)], vec![], vec![]);
        let mut forecaster =
            Forecaster::new(Box::new(FirstFeatureScore), CalibrationMethod::Isotonic);
        assert!(matches!(forecaster.fit(&splits), Err(Error::Model(_))));
    }

    #[test]
    fn test_moved_threshold_changes_decision() {
        let mut splits = splits_from(
            vec![scored_example(1, 0.2, false), scored_example(2, 0.9, true)],
            vec![],
            vec![],
        );
        splits.decision_threshold = 0.3;
        let mut forecaster =
            Forecaster::new(Box::new(FirstFeatureScore), CalibrationMethod::None);
        forecaster.fit(&splits).unwrap();

        let mut fv = fomc_core::FeatureVector::zeroed();
        fv.set(0, 0.4, false);
        let row = fomc_core::AggregatedFeatureRow {
            event_id: 9,
            decision_ts: 9_000,
            outcome: fomc_core::PolicyOutcome::Hold,
            features: fv,
            document_count: 1,
            insufficient_data: false,
        };
        let forecast = forecaster.forecast_row(&row).unwrap();
        assert!(forecast.predicted_cut); // 0.4 >= moved threshold 0.3
        assert!((forecaster.threshold() - 0.3).abs() < 1e-12);
    }
}
