//! Append-only tab-separated summary table accumulated across queue runs.
//!
//! Layout: `MIX  COMPUTE_MODE  LOG_TAG  mean  std`, one header row, floats
//! written with 6 decimal places. Each invocation is assumed to own its
//! paths, so plain append semantics suffice.

use crate::Result;
use crate::diagnostics;
use crate::error::ReportError;
use crate::log::parse::read_input;
use crate::model::TagStat;

use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;

pub const SUMMARY_COLUMNS: [&str; 5] = ["MIX", "COMPUTE_MODE", "LOG_TAG", "mean", "std"];

/// One accumulated row of the summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub mix: String,
    pub compute_mode: String,
    pub log_tag: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// Append per-tag aggregates for one run. The header is written only when
/// the file is missing or empty.
pub fn append_summary(
    path: &str,
    mix: &str,
    compute_mode: &str,
    stats: &[TagStat],
) -> Result<()> {
    let header_needed = match std::fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open summary file {}", path))?;

    if header_needed {
        writeln!(file, "{}", SUMMARY_COLUMNS.join("\t"))?;
    }
    for s in stats {
        writeln!(
            file,
            "{}\t{}\t{}\t{:.6}\t{:.6}",
            mix, compute_mode, s.log_tag, s.mean, s.std_dev
        )?;
    }
    Ok(())
}

/// Read the summary table back, sorted by mix.
///
/// The header is validated by name so the layout can gain columns without
/// breaking old readers; a missing required column is the fatal
/// [`ReportError::AggregationKey`]. Malformed data rows are dropped and
/// counted.
pub fn read_summary(path: &str) -> Result<Vec<SummaryRow>> {
    let text = read_input(path)?;
    let mut lines = text.lines().filter(|l| {
        let l = l.trim();
        !l.is_empty() && !l.starts_with('#')
    });

    let header = lines.next().ok_or_else(|| ReportError::EmptyInput {
        path: path.to_string(),
    })?;
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
    for required in SUMMARY_COLUMNS {
        if !columns.contains(&required) {
            return Err(ReportError::AggregationKey {
                column: required,
                path: path.to_string(),
            }
            .into());
        }
    }
    // Positions are guaranteed by the check above.
    let idx = |name: &str| columns.iter().position(|c| *c == name).unwrap();
    let (mix_i, mode_i, tag_i, mean_i, std_i) = (
        idx("MIX"),
        idx("COMPUTE_MODE"),
        idx("LOG_TAG"),
        idx("mean"),
        idx("std"),
    );

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let parsed = (|| {
            Some(SummaryRow {
                mix: fields.get(mix_i)?.to_string(),
                compute_mode: fields.get(mode_i)?.to_string(),
                log_tag: fields.get(tag_i)?.to_string(),
                mean: fields.get(mean_i)?.parse().ok()?,
                std_dev: fields.get(std_i)?.parse().ok()?,
            })
        })();
        match parsed {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        diagnostics::warn(format!(
            "{}: dropped {} malformed summary rows",
            path, dropped
        ));
    }
    if rows.is_empty() {
        return Err(ReportError::EmptyInput {
            path: path.to_string(),
        }
        .into());
    }

    rows.sort_by(|a, b| a.mix.cmp(&b.mix));
    Ok(rows)
}
