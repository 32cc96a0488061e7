//! Probability calibration.
//!
//! Isotonic regression via pool-adjacent-violators, fit on held-out
//! validation scores. Calibration wraps any injected classifier uniformly;
//! it never touches the backend's own training.

use ordered_float::OrderedFloat;

use crate::assembler::Partition;
use crate::predictor::ProbabilisticClassifier;
use fomc_core::{Error, Result};

/// Monotonic step-function mapping from raw scores to calibrated
/// probabilities.
#[derive(Debug, Clone)]
pub struct IsotonicCalibrator {
    /// Lower score edge of each block, ascending.
    boundaries: Vec<f64>,
    /// Calibrated probability of each block, non-decreasing.
    values: Vec<f64>,
}

impl IsotonicCalibrator {
    /// Fit on (raw score, observed label) pairs with pool-adjacent-
    /// violators.
    pub fn fit(pairs: &[(f64, bool)]) -> Result<Self> {
        if pairs.is_empty() {
            return Err(Error::model("cannot fit isotonic calibration on no pairs"));
        }

        let mut sorted: Vec<(f64, f64)> = pairs
            .iter()
            .map(|&(score, label)| (score, if label { 1.0 } else { 0.0 }))
            .collect();
        sorted.sort_by_key(|&(score, _)| OrderedFloat(score));

        // Blocks of (target sum, count, min score); merge while the means
        // violate monotonicity.
        let mut blocks: Vec<(f64, usize, f64)> = Vec::with_capacity(sorted.len());
        for (score, target) in sorted {
            blocks.push((target, 1, score));
            while blocks.len() > 1 {
                let last = blocks[blocks.len() - 1];
                let prev = blocks[blocks.len() - 2];
                if prev.0 / prev.1 as f64 <= last.0 / last.1 as f64 {
                    break;
                }
                blocks.pop();
                let merged = blocks.last_mut().expect("previous block exists");
                merged.0 += last.0;
                merged.1 += last.1;
            }
        }

        Ok(Self {
            boundaries: blocks.iter().map(|b| b.2).collect(),
            values: blocks.iter().map(|b| b.0 / b.1 as f64).collect(),
        })
    }

    /// Map a raw score to its calibrated probability.
    ///
    /// Scores below the first block clamp to the first block's value.
    pub fn transform(&self, score: f64) -> f64 {
        let pos = self.boundaries.partition_point(|&b| b <= score);
        self.values[pos.saturating_sub(1)]
    }
}

/// A classifier backend with an optional isotonic stage applied on top.
///
/// `fit` delegates to the backend and drops any previous calibration;
/// `calibrate` fits the isotonic stage from the backend's own scores on a
/// held-out partition.
pub struct CalibratedClassifier<C> {
    backend: C,
    calibrator: Option<IsotonicCalibrator>,
}

impl<C: ProbabilisticClassifier> CalibratedClassifier<C> {
    /// Wrap a backend, uncalibrated.
    pub fn new(backend: C) -> Self {
        Self {
            backend,
            calibrator: None,
        }
    }

    /// Fit the isotonic stage on a held-out partition.
    pub fn calibrate(&mut self, held_out: &Partition) -> Result<()> {
        let mut pairs = Vec::with_capacity(held_out.len());
        for example in held_out {
            let score = self.backend.predict_probability(&example.features)?;
            pairs.push((score, example.label));
        }
        self.calibrator = Some(IsotonicCalibrator::fit(&pairs)?);
        Ok(())
    }

    /// Whether an isotonic stage is active.
    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_some()
    }
}

impl<C: ProbabilisticClassifier> ProbabilisticClassifier for CalibratedClassifier<C> {
    fn fit(&mut self, train: &Partition) -> Result<()> {
        self.calibrator = None;
        self.backend.fit(train)
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64> {
        let raw = self.backend.predict_probability(features)?;
        Ok(match &self.calibrator {
            Some(calibrator) => calibrator.transform(raw),
            None => raw,
        })
    }
}
