//! Fatal error taxonomy.
//!
//! Recoverable per-line failures (wrong field count, unparsable numerics) are
//! counted in [`Diagnostics`] and never surface here.

use crate::log::Diagnostics;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("input file not found: {path}")]
    FileNotFound { path: String },

    #[error("no parsable rows in {path}")]
    EmptyInput { path: String },

    #[error("zero records survived reconciliation ({diagnostics})")]
    EmptyResult { diagnostics: Diagnostics },

    #[error("required grouping column {column:?} missing from {path}")]
    AggregationKey { column: &'static str, path: String },
}
