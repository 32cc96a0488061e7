//! Dataset assembler.
//!
//! Joins aggregated event features with labels, applies the chronological
//! split, enforces the per-partition positive-example floor, and applies
//! the configured class-imbalance strategy to the training partition.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::balance::{apply_class_weighting, decision_threshold, oversample_minority};
use crate::splitter::{split_chronological, SplitIndices};
use fomc_core::config::ImbalanceStrategy;
use fomc_core::{AggregatedFeatureRow, Error, PipelineConfig, Result, TimestampMs};

/// One labeled training example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Source event id.
    pub event_id: u64,
    /// Source event decision instant (ms).
    pub decision_ts: TimestampMs,
    /// Feature values in declared layout order.
    pub features: Vec<f64>,
    /// Binary target: cut vs not-cut.
    pub label: bool,
    /// Example weight (1.0 unless class weighting is active).
    pub weight: f64,
}

/// An ordered sequence of training examples.
pub type Partition = Vec<TrainingExample>;

/// Class balance of one partition.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClassCounts {
    /// Examples in the partition.
    pub total: usize,
    /// Positive-class (cut) examples.
    pub positives: usize,
}

impl ClassCounts {
    fn of(partition: &Partition) -> Self {
        Self {
            total: partition.len(),
            positives: partition.iter().filter(|e| e.label).count(),
        }
    }

    /// Negative-class examples.
    pub fn negatives(&self) -> usize {
        self.total - self.positives
    }
}

/// Assembled, split, imbalance-adjusted dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSplits {
    /// Training partition (imbalance strategy applied).
    pub train: Partition,
    /// Validation partition.
    pub validation: Partition,
    /// Test partition.
    pub test: Partition,
    /// Index boundaries into the source row sequence.
    pub indices: SplitIndices,
    /// The strategy that was applied.
    pub strategy: ImbalanceStrategy,
    /// Decision threshold to use at prediction time.
    pub decision_threshold: f64,
    /// Training class balance after the strategy was applied.
    pub train_counts: ClassCounts,
    /// Validation class balance.
    pub validation_counts: ClassCounts,
    /// Test class balance.
    pub test_counts: ClassCounts,
    /// Examples added by oversampling (zero for other strategies).
    pub oversampled_added: usize,
}

fn to_examples(rows: &[AggregatedFeatureRow]) -> Partition {
    rows.iter()
        .map(|row| TrainingExample {
            event_id: row.event_id,
            decision_ts: row.decision_ts,
            features: row.features.values().to_vec(),
            label: row.outcome.is_cut(),
            weight: 1.0,
        })
        .collect()
}

fn check_positive_floor(name: &str, partition: &Partition, floor: usize) -> Result<()> {
    let positives = partition.iter().filter(|e| e.label).count();
    if positives < floor {
        return Err(Error::insufficient_data(format!(
            "{name} partition has {positives} positive examples, need at least {floor}"
        )));
    }
    Ok(())
}

/// Assemble train/validation/test partitions from the event feature table.
///
/// Splitting is strictly chronological. The positive-example floor is
/// checked on the raw partitions before any resampling, so oversampling
/// cannot mask a shortage. Fails with [`Error::InsufficientData`] naming
/// the offending partition.
pub fn assemble(
    rows: &[AggregatedFeatureRow],
    config: &PipelineConfig,
) -> Result<DatasetSplits> {
    config.validate()?;
    let indices = split_chronological(rows, &config.split)?;

    let mut train = to_examples(&rows[indices.train()]);
    let validation = to_examples(&rows[indices.validation()]);
    let test = to_examples(&rows[indices.test()]);

    let floor = config.min_positive_examples;
    check_positive_floor("train", &train, floor)?;
    if !validation.is_empty() {
        check_positive_floor("validation", &validation, floor)?;
    }
    check_positive_floor("test", &test, floor)?;

    let mut oversampled_added = 0;
    match config.imbalance {
        ImbalanceStrategy::ClassWeighting => apply_class_weighting(&mut train),
        ImbalanceStrategy::Oversample => {
            oversampled_added = oversample_minority(&mut train);
        }
        ImbalanceStrategy::ThresholdMoving { .. } => {}
    }

    let splits = DatasetSplits {
        train_counts: ClassCounts::of(&train),
        validation_counts: ClassCounts::of(&validation),
        test_counts: ClassCounts::of(&test),
        decision_threshold: decision_threshold(&config.imbalance),
        strategy: config.imbalance,
        indices,
        train,
        validation,
        test,
        oversampled_added,
    };
    info!(
        strategy = splits.strategy.label(),
        train = splits.train_counts.total,
        validation = splits.validation_counts.total,
        test = splits.test_counts.total,
        oversampled = splits.oversampled_added,
        "dataset assembled"
    );
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomc_core::{FeatureVector, PolicyOutcome};

    fn make_row(event_id: u64, outcome: PolicyOutcome) -> AggregatedFeatureRow {
        AggregatedFeatureRow {
            event_id,
            decision_ts: event_id as i64 * 1_000,
            outcome,
            features: FeatureVector::zeroed(),
            document_count: 1,
            insufficient_data: false,
        }
    }

    /// 20 events: cuts sprinkled through every segment of the default
    /// 14/3/3 split.
    fn rows_with_cuts() -> Vec<AggregatedFeatureRow> {
        (1..=20u64)
            .map(|id| {
                let outcome = if id % 3 == 0 {
                    PolicyOutcome::Cut
                } else {
                    PolicyOutcome::Hold
                };
                make_row(id, outcome)
            })
            .collect()
    }

    fn config_with_floor(floor: usize) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.min_positive_examples = floor;
        config
    }

    #[test]
    fn test_assemble_chronological_partitions() {
        let rows = rows_with_cuts();
        let splits = assemble(&rows, &config_with_floor(1)).unwrap();

        assert_eq!(splits.train.len(), 14);
        assert_eq!(splits.validation.len(), 3);
        assert_eq!(splits.test.len(), 3);

        let max_train = splits.train.iter().map(|e| e.decision_ts).max().unwrap();
        let min_test = splits.test.iter().map(|e| e.decision_ts).min().unwrap();
        assert!(max_train < min_test);
    }

    #[test]
    fn test_insufficient_positives_rejected() {
        let rows: Vec<_> = (1..=20u64)
            .map(|id| make_row(id, PolicyOutcome::Hold))
            .collect();
        let err = assemble(&rows, &config_with_floor(1)).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
        assert!(err.to_string().contains("train"));
    }

    #[test]
    fn test_class_weighting_applied_to_train_only() {
        let rows = rows_with_cuts();
        let splits = assemble(&rows, &config_with_floor(1)).unwrap();

        assert!(splits.train.iter().any(|e| (e.weight - 1.0).abs() > 1e-9));
        assert!(splits.validation.iter().all(|e| (e.weight - 1.0).abs() < 1e-12));
        assert!(splits.test.iter().all(|e| (e.weight - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_oversampling_confined_to_train() {
        let rows = rows_with_cuts();
        let mut config = config_with_floor(1);
        config.imbalance = ImbalanceStrategy::Oversample;
        let splits = assemble(&rows, &config).unwrap();

        assert!(splits.oversampled_added > 0);
        assert_eq!(
            splits.train_counts.positives,
            splits.train_counts.negatives()
        );
        // Other partitions keep their natural sizes.
        assert_eq!(splits.validation.len(), 3);
        assert_eq!(splits.test.len(), 3);
        // Training never reaches past the validation boundary.
        let boundary = splits.validation[0].decision_ts;
        assert!(splits.train.iter().all(|e| e.decision_ts < boundary));
    }

    #[test]
    fn test_threshold_moving_leaves_data_untouched() {
        let rows = rows_with_cuts();
        let mut config = config_with_floor(1);
        config.imbalance = ImbalanceStrategy::ThresholdMoving { threshold: 0.25 };
        let splits = assemble(&rows, &config).unwrap();

        assert_eq!(splits.train.len(), 14);
        assert!(splits.train.iter().all(|e| (e.weight - 1.0).abs() < 1e-12));
        assert!((splits.decision_threshold - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_labels_follow_outcomes() {
        let rows = vec![
            make_row(1, PolicyOutcome::Cut),
            make_row(2, PolicyOutcome::Hold),
            make_row(3, PolicyOutcome::Hike),
            make_row(4, PolicyOutcome::Cut),
            make_row(5, PolicyOutcome::Cut),
            make_row(6, PolicyOutcome::Cut),
        ];
        let mut config = config_with_floor(1);
        config.split.train_fraction = 0.5;
        config.split.validation_fraction = 0.0;
        let splits = assemble(&rows, &config).unwrap();

        assert_eq!(
            splits.train.iter().map(|e| e.label).collect::<Vec<_>>(),
            vec![true, false, false]
        );
        assert_eq!(splits.test_counts.positives, 3);
    }
}
