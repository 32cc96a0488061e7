//! Feature aggregation for the FOMC rate-cut forecast pipeline.
//!
//! This crate handles:
//! - Recency (half-life) and type weighting of document scores
//! - Dataset-wide historical type means for imputation
//! - Per-event aggregation into fixed-width feature rows
//! - The narrative-shift fold across consecutive events

pub mod decay;
pub mod engine;
pub mod imputation;

pub use decay::WeightPolicy;
pub use engine::{aggregate_event, AggregationEngine, AggregationStats};
pub use imputation::TypeMeans;
