use serde::Serialize;
use std::fmt;

/// One reconciled observation from the 6-column timing log.
///
/// Column layout: RunID  Filter  ProcessNum  Mode  BlockSize  Result
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub run_id: u64,
    pub filter: String,
    pub process_num: u32,
    pub mode: String,
    pub block_size: u32,
    /// Wall-clock execution time in seconds.
    pub result_secs: f64,
}

/// Drop counters accumulated while reconciling one file, surfaced alongside
/// the record table instead of aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Token lines seen (blank, comment, and header lines excluded).
    pub token_lines: usize,
    /// Lines dropped for a wrong token count or an unparsable field.
    pub invalid: usize,
    /// 1-based numbers of the invalid lines.
    pub invalid_line_numbers: Vec<usize>,
    /// Short lines dropped because no well-formed line preceded them.
    pub unresolved_run_id: usize,
    /// Records dropped as exact duplicates of an earlier record.
    pub duplicates: usize,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} invalid, {} unresolved RunID, {} duplicates out of {} token lines",
            self.invalid, self.unresolved_run_id, self.duplicates, self.token_lines
        )
    }
}
