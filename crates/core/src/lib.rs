//! Core types and configuration for the FOMC rate-cut forecast pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Event and document data types
//! - Feature vector layout
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use types::*;
