//! Chronological dataset splitting.
//!
//! Partitions the event feature table into train/validation/test segments
//! by event order. Random shuffling across the full set is disallowed: it
//! would leak future market-regime information into training.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use fomc_core::config::SplitConfig;
use fomc_core::{AggregatedFeatureRow, Error, Result};

/// Index boundaries of a chronological split over an ordered row slice:
/// train is `[0, train_end)`, validation `[train_end, validation_end)`,
/// test `[validation_end, len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train_end: usize,
    pub validation_end: usize,
    pub len: usize,
}

impl SplitIndices {
    /// Training segment range.
    pub fn train(&self) -> Range<usize> {
        0..self.train_end
    }

    /// Validation segment range.
    pub fn validation(&self) -> Range<usize> {
        self.train_end..self.validation_end
    }

    /// Test segment range.
    pub fn test(&self) -> Range<usize> {
        self.validation_end..self.len
    }
}

/// Split rows chronologically according to the configured fractions.
///
/// The rows must already be in strict decision-time order (the aggregation
/// fold produces them that way); any violation is rejected rather than
/// silently reordered.
pub fn split_chronological(
    rows: &[AggregatedFeatureRow],
    config: &SplitConfig,
) -> Result<SplitIndices> {
    config.validate()?;
    if rows.is_empty() {
        return Err(Error::insufficient_data("no aggregated rows to split"));
    }
    for pair in rows.windows(2) {
        if pair[1].decision_ts <= pair[0].decision_ts {
            return Err(Error::Other(format!(
                "rows out of chronological order at events {} and {}",
                pair[0].event_id, pair[1].event_id
            )));
        }
    }

    let n = rows.len();
    let train_end = (n as f64 * config.train_fraction).floor() as usize;
    let validation_end = train_end + (n as f64 * config.validation_fraction).floor() as usize;

    Ok(SplitIndices {
        train_end,
        validation_end: validation_end.min(n),
        len: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomc_core::{FeatureVector, PolicyOutcome};

    fn make_row(event_id: u64, decision_ts: i64) -> AggregatedFeatureRow {
        AggregatedFeatureRow {
            event_id,
            decision_ts,
            outcome: PolicyOutcome::Hold,
            features: FeatureVector::zeroed(),
            document_count: 1,
            insufficient_data: false,
        }
    }

    fn make_rows(n: usize) -> Vec<AggregatedFeatureRow> {
        (0..n).map(|i| make_row(i as u64 + 1, (i as i64 + 1) * 1_000)).collect()
    }

    #[test]
    fn test_split_ranges_cover_all_rows() {
        let rows = make_rows(20);
        let config = SplitConfig {
            train_fraction: 0.7,
            validation_fraction: 0.15,
        };
        let idx = split_chronological(&rows, &config).unwrap();

        assert_eq!(idx.train(), 0..14);
        assert_eq!(idx.validation(), 14..17);
        assert_eq!(idx.test(), 17..20);
        assert_eq!(idx.train().len() + idx.validation().len() + idx.test().len(), 20);
    }

    #[test]
    fn test_chronological_property() {
        // Every training decision strictly precedes every test decision.
        let rows = make_rows(17);
        let idx = split_chronological(&rows, &SplitConfig::default()).unwrap();

        let max_train = rows[idx.train()].iter().map(|r| r.decision_ts).max().unwrap();
        let min_test = rows[idx.test()].iter().map(|r| r.decision_ts).min().unwrap();
        assert!(max_train < min_test);
    }

    #[test]
    fn test_out_of_order_rows_rejected() {
        let mut rows = make_rows(5);
        rows.swap(1, 3);
        assert!(split_chronological(&rows, &SplitConfig::default()).is_err());
    }

    #[test]
    fn test_empty_rows_rejected() {
        assert!(matches!(
            split_chronological(&[], &SplitConfig::default()),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_zero_validation_fraction() {
        let rows = make_rows(10);
        let config = SplitConfig {
            train_fraction: 0.8,
            validation_fraction: 0.0,
        };
        let idx = split_chronological(&rows, &config).unwrap();
        assert_eq!(idx.validation().len(), 0);
        assert_eq!(idx.test(), 8..10);
    }
}
