//! Reconciliation of the ragged 6-column timing log.
//!
//! The benchmark runners sometimes re-emit an observation without its leading
//! RunID column, so the same file mixes 6-token and 5-token lines. We rebuild
//! a uniform table in one left-to-right pass: classify each line by token
//! count, inherit the missing RunID from the nearest preceding well-formed
//! line, and drop the re-emissions as exact duplicates.
//!
//! Known limitation: duplicate suppression assumes a short line follows its
//! well-formed counterpart directly. If the runners ever interleave output
//! from several runs, a short line may inherit the wrong RunID and survive as
//! a distinct record.

use crate::error::ReportError;
use crate::log::record::{Diagnostics, Record};
use std::collections::BTreeSet;

/// Expected token count of a well-formed timing-log line.
pub const RECORD_WIDTH: usize = 6;

/// Output of [`reconcile`]: the ordered record table plus drop counters.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub records: Vec<Record>,
    pub diagnostics: Diagnostics,
}

/// Candidate row after classification, before RunID resolution.
struct Classified {
    run_id: Option<u64>,
    filter: String,
    process_num: u32,
    mode: String,
    block_size: u32,
    result_secs: f64,
}

/// Reconcile a timing log into an ordered record table.
///
/// The first `header_rows` physical lines are skipped unconditionally; blank
/// lines and `#` comments are ignored everywhere. Per-line failures never
/// abort: they are counted in the diagnostics and the line is dropped. The
/// only error is [`ReportError::EmptyResult`], raised when token lines were
/// present but none survived.
///
/// No state is carried between calls; reconciling the same text twice yields
/// identical output.
pub fn reconcile(text: &str, header_rows: usize) -> Result<Reconciled, ReportError> {
    let mut diagnostics = Diagnostics::default();
    let mut records: Vec<Record> = Vec::new();
    let mut seen: BTreeSet<(u64, String, u32, String, u32, u64)> = BTreeSet::new();
    let mut last_run_id: Option<u64> = None;

    for (lineno, line) in text.lines().enumerate() {
        if lineno < header_rows {
            continue;
        }
        let lno = lineno + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        diagnostics.token_lines += 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let classified = match classify(&tokens) {
            Some(c) => c,
            None => {
                diagnostics.invalid += 1;
                diagnostics.invalid_line_numbers.push(lno);
                continue;
            }
        };

        // Forward fill: a short line takes the RunID of the nearest
        // preceding well-formed line.
        let run_id = match classified.run_id {
            Some(id) => {
                last_run_id = Some(id);
                id
            }
            None => match last_run_id {
                Some(id) => id,
                None => {
                    diagnostics.unresolved_run_id += 1;
                    continue;
                }
            },
        };

        // Short lines are re-emissions of their well-formed predecessor;
        // anything matching an already-emitted tuple exactly is dropped.
        let key = (
            run_id,
            classified.filter.clone(),
            classified.process_num,
            classified.mode.clone(),
            classified.block_size,
            classified.result_secs.to_bits(),
        );
        if !seen.insert(key) {
            diagnostics.duplicates += 1;
            continue;
        }

        records.push(Record {
            run_id,
            filter: classified.filter,
            process_num: classified.process_num,
            mode: classified.mode,
            block_size: classified.block_size,
            result_secs: classified.result_secs,
        });
    }

    if records.is_empty() && diagnostics.token_lines > 0 {
        return Err(ReportError::EmptyResult { diagnostics });
    }

    Ok(Reconciled {
        records,
        diagnostics,
    })
}

/// Classify a token line by width and convert its fields.
///
/// `None` means invalid: a token count that is neither `RECORD_WIDTH` nor
/// `RECORD_WIDTH - 1`, a field that fails its numeric conversion, or a value
/// outside its bound (ProcessNum >= 1, Result finite and >= 0). A failed
/// conversion invalidates the whole line; records are never partial.
fn classify(tokens: &[&str]) -> Option<Classified> {
    let (run_id, rest) = match tokens.len() {
        RECORD_WIDTH => {
            let id = tokens[0].parse::<u64>().ok()?;
            (Some(id), &tokens[1..])
        }
        n if n == RECORD_WIDTH - 1 => (None, tokens),
        _ => return None,
    };

    let filter = rest[0].to_string();
    let process_num: u32 = rest[1].parse().ok()?;
    let mode = rest[2].to_string();
    let block_size: u32 = rest[3].parse().ok()?;
    let result_secs: f64 = rest[4].parse().ok()?;

    if process_num < 1 || !result_secs.is_finite() || result_secs < 0.0 {
        return None;
    }

    Some(Classified {
        run_id,
        filter,
        process_num,
        mode,
        block_size,
        result_secs,
    })
}
