//! Parsing and reconciliation of the benchmark timing logs.

pub mod parse;
pub mod reconcile;
pub mod record;

pub use parse::{QueueRow, parse_queue_file, parse_timing_file};
pub use reconcile::{RECORD_WIDTH, Reconciled, reconcile};
pub use record::{Diagnostics, Record};
