//! File-level readers for the benchmark logs.

use crate::Result;
use crate::diagnostics;
use crate::error::ReportError;
use crate::log::reconcile::{Reconciled, reconcile};

use anyhow::Context;
use std::fs;
use std::io::ErrorKind;

/// One observation from the 3-column queue timing log.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    pub compute_mode: String,
    pub log_tag: String,
    pub time_secs: f64,
}

/// Read a file, mapping a missing file to [`ReportError::FileNotFound`].
pub fn read_input(path: &str) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ReportError::FileNotFound {
            path: path.to_string(),
        }
        .into()),
        Err(e) => Err(e).with_context(|| format!("read log file {}", path)),
    }
}

/// Parse a 6-column timing log through the reconciler.
///
/// Expected columns (whitespace-separated):
/// RunID  Filter  ProcessNum  Mode  BlockSize  Result
///
/// Example:
/// 3   mb   4   by_row   8   0.512
///
/// The first `header_rows` physical lines are skipped. A file with no token
/// lines at all is [`ReportError::EmptyInput`]; drop counters are reported to
/// stderr and returned alongside the records.
pub fn parse_timing_file(path: &str, header_rows: usize) -> Result<Reconciled> {
    let text = read_input(path)?;
    if !has_token_lines(&text, header_rows) {
        return Err(ReportError::EmptyInput {
            path: path.to_string(),
        }
        .into());
    }
    let reconciled = reconcile(&text, header_rows)?;
    warn_drops(path, &reconciled);
    Ok(reconciled)
}

/// Parse the queue timing log: `ComputeMode  LogTag  Time`.
///
/// Example:
/// by_row   QPUSH   0.000413
///
/// Lines with a wrong token count or an unparsable time are dropped and
/// counted, mirroring the tolerant policy of the reconciler. Returns the rows
/// plus the dropped-line count.
pub fn parse_queue_file(path: &str) -> Result<(Vec<QueueRow>, usize)> {
    let text = read_input(path)?;
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let parsed = match tokens.as_slice() {
            [mode, tag, time] => time
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite())
                .map(|time_secs| QueueRow {
                    compute_mode: mode.to_string(),
                    log_tag: tag.to_string(),
                    time_secs,
                }),
            _ => None,
        };
        match parsed {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    if rows.is_empty() {
        return Err(ReportError::EmptyInput {
            path: path.to_string(),
        }
        .into());
    }
    Ok((rows, dropped))
}

fn has_token_lines(text: &str, header_rows: usize) -> bool {
    text.lines().skip(header_rows).any(|l| {
        let l = l.trim();
        !l.is_empty() && !l.starts_with('#')
    })
}

fn warn_drops(path: &str, reconciled: &Reconciled) {
    let d = &reconciled.diagnostics;
    if d.invalid > 0 {
        diagnostics::warn(format!(
            "{}: dropped {} invalid lines (line numbers {:?})",
            path, d.invalid, d.invalid_line_numbers
        ));
    }
    if d.unresolved_run_id > 0 {
        diagnostics::warn(format!(
            "{}: dropped {} short lines with no preceding RunID",
            path, d.unresolved_run_id
        ));
    }
    if d.duplicates > 0 {
        diagnostics::warn(format!(
            "{}: dropped {} duplicate records",
            path, d.duplicates
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = parse_timing_file("/nonexistent/timing-results.dat", 0).unwrap_err();
        match err.downcast_ref::<ReportError>() {
            Some(ReportError::FileNotFound { path }) => {
                assert_eq!(path, "/nonexistent/timing-results.dat");
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn comment_only_file_is_empty_input() {
        let f = write_temp("# nothing here\n\n# still nothing\n");
        let err = parse_timing_file(f.path().to_str().unwrap(), 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::EmptyInput { .. })
        ));
    }

    #[test]
    fn header_rows_do_not_count_as_token_lines() {
        let f = write_temp("some header\nanother header\n1 mb 4 by_row 8 0.5\n");
        let out = parse_timing_file(f.path().to_str().unwrap(), 2).unwrap();
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn queue_file_drops_malformed_lines() {
        let f = write_temp(
            "# queue timings\n\
             by_row QPUSH 0.004\n\
             by_row QPOP not-a-number\n\
             by_row WORKER 1.25\n\
             short line\n",
        );
        let (rows, dropped) = parse_queue_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].log_tag, "QPUSH");
        assert_eq!(rows[1].time_secs, 1.25);
    }

    #[test]
    fn queue_file_with_no_valid_rows_is_empty_input() {
        let f = write_temp("garbage\nmore garbage here too\n");
        let err = parse_queue_file(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::EmptyInput { .. })
        ));
    }
}
