//! Class-imbalance handling.
//!
//! Rate cuts are rare relative to holds. Exactly one strategy is active
//! per assembled dataset, and every strategy is confined to the training
//! partition; the validation/test boundary is never crossed.

use tracing::debug;

use crate::assembler::Partition;
use fomc_core::config::ImbalanceStrategy;

/// Assign inverse-frequency weights to the training examples.
///
/// With `n` examples of which `p` are positive, positives weigh
/// `n / (2p)` and negatives `n / (2(n - p))`, so both classes contribute
/// equal total weight. A single-class partition is left at unit weights
/// (the assembler's positive floor rejects it earlier in practice).
pub fn apply_class_weighting(train: &mut Partition) {
    let n = train.len();
    let positives = train.iter().filter(|e| e.label).count();
    if positives == 0 || positives == n {
        return;
    }
    let negatives = n - positives;
    let w_pos = n as f64 / (2.0 * positives as f64);
    let w_neg = n as f64 / (2.0 * negatives as f64);
    for example in train.iter_mut() {
        example.weight = if example.label { w_pos } else { w_neg };
    }
    debug!(w_pos, w_neg, "class weights applied");
}

/// Oversample the minority class up to parity by deterministic cyclic
/// duplication, then restore chronological order.
///
/// Returns the number of duplicated examples. No RNG is involved, so the
/// assembled dataset is reproducible without a seed.
pub fn oversample_minority(train: &mut Partition) -> usize {
    let positives = train.iter().filter(|e| e.label).count();
    let negatives = train.len() - positives;
    if positives == 0 || negatives == 0 || positives == negatives {
        return 0;
    }

    let minority_label = positives < negatives;
    let minority: Vec<_> = train
        .iter()
        .filter(|e| e.label == minority_label)
        .cloned()
        .collect();
    let deficit = positives.abs_diff(negatives);

    for i in 0..deficit {
        train.push(minority[i % minority.len()].clone());
    }
    // Stable sort keeps duplicates adjacent to their originals.
    train.sort_by_key(|e| e.decision_ts);
    deficit
}

/// Decision threshold implied by the strategy (0.5 unless moved).
pub fn decision_threshold(strategy: &ImbalanceStrategy) -> f64 {
    match strategy {
        ImbalanceStrategy::ThresholdMoving { threshold } => *threshold,
        _ => 0.5,
    }
}
