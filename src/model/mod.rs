//! Aggregation model: turn reconciled records into chart-ready series.

use crate::log::{QueueRow, Record};
use crate::summary::SummaryRow;

use std::collections::{BTreeMap, BTreeSet};

/// Queue-operation tags (time spent blocked on the queue).
pub const QUEUE_OP_TAGS: &[&str] = &["QPOP", "QPUSH"];

/// Thread-role tags (whole-thread execution time).
pub const THREAD_TAGS: &[&str] = &["WORKER", "READER", "WRITER"];

/// Canonical computation-mode order for the per-filter thread charts.
/// Modes outside this list never reach the x axis.
const CANONICAL_MODES: &[&str] = &["by_row", "by_column", "by_grid"];

/// Consecutive filter combinations the pair report recognizes.
const ALLOWED_PAIRS: &[(&str, &str)] = &[
    ("gb", "sh"),
    ("sh", "gb"),
    ("mb", "sh"),
    ("sh", "mb"),
    ("gg", "sh"),
    ("sh", "gg"),
];

/// Mean / spread summary of one group of observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); 0 for singleton groups.
    pub std_dev: f64,
    /// 95% confidence half-width, normal approximation; 0 for singletons.
    pub ci95: f64,
    pub n: usize,
}

/// Chart-ready table: one row of bars per category, one color per series.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSeries {
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    /// Legend entry; empty for a single anonymous series.
    pub label: String,
    /// (mean, error) per category; missing cells are zero.
    pub values: Vec<(f64, f64)>,
}

/// One aggregated MPI cell: Result statistics per (process, mode, block).
#[derive(Debug, Clone, PartialEq)]
pub struct MpiCell {
    pub process_num: u32,
    pub mode: String,
    pub block_size: u32,
    pub avg_time: f64,
    pub std_dev: f64,
}

/// Per-tag aggregate of queue timings.
#[derive(Debug, Clone, PartialEq)]
pub struct TagStat {
    pub log_tag: String,
    pub mean: f64,
    pub std_dev: f64,
}

pub fn summarize(values: &[f64]) -> Sample {
    let n = values.len();
    if n == 0 {
        return Sample {
            mean: 0.0,
            std_dev: 0.0,
            ci95: 0.0,
            n: 0,
        };
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let std_dev = if n > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    let ci95 = if n > 1 {
        1.96 * std_dev / (n as f64).sqrt()
    } else {
        0.0
    };
    Sample {
        mean,
        std_dev,
        ci95,
        n,
    }
}

/// Expand a two-letter filter code into its chart label.
pub fn filter_display_name(code: &str) -> &str {
    match code {
        "mb" => "Motion Blur",
        "bb" => "Basic Blur",
        "gb" => "Gaussian Blur",
        "em" => "Emboss Filter",
        "mm" => "Median Filter",
        "sh" => "Sharpen Filter",
        "bo" => "Box Blur",
        "mg" => "Medium Gaussian Blur",
        "gg" => "Big Gaussian Blur",
        "co" => "Standard Convolution",
        other => other,
    }
}

/// Fold single-threaded rows into one mode/block bucket before aggregation.
pub fn normalize_single_thread(records: &mut [Record]) {
    for r in records {
        if r.process_num == 1 {
            r.mode = "single_thread".to_string();
            r.block_size = 0;
        }
    }
}

/// Distinct filter codes in first-seen order.
pub fn unique_filters(records: &[Record]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in records {
        if !out.contains(&r.filter) {
            out.push(r.filter.clone());
        }
    }
    out
}

/// Mean time per filter for single-threaded rows, first-seen filter order,
/// 95% confidence error bars. Filter codes are expanded to display names.
pub fn single_thread_stats(records: &[Record]) -> GroupedSeries {
    let mut order: Vec<String> = Vec::new();
    let mut by_filter: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.process_num == 1) {
        if !by_filter.contains_key(&r.filter) {
            order.push(r.filter.clone());
        }
        by_filter
            .entry(r.filter.clone())
            .or_default()
            .push(r.result_secs);
    }

    let values = order
        .iter()
        .map(|f| {
            let s = summarize(&by_filter[f]);
            (s.mean, s.ci95)
        })
        .collect();

    GroupedSeries {
        categories: order
            .iter()
            .map(|f| filter_display_name(f).to_string())
            .collect(),
        series: vec![BarSeries {
            label: String::new(),
            values,
        }],
    }
}

/// Grouped mode x block-size table for one filter (multi-threaded rows only).
///
/// The x axis is restricted to the canonical modes present in the data, in
/// canonical order. Returns `None` when the filter has no multi-threaded
/// observations in a canonical mode.
pub fn filter_mode_table(records: &[Record], filter: &str) -> Option<GroupedSeries> {
    let rows: Vec<&Record> = records
        .iter()
        .filter(|r| r.filter == filter && r.process_num > 1)
        .collect();
    if rows.is_empty() {
        return None;
    }

    let block_sizes: BTreeSet<u32> = rows.iter().map(|r| r.block_size).collect();
    let modes: Vec<String> = CANONICAL_MODES
        .iter()
        .filter(|m| rows.iter().any(|r| r.mode == **m))
        .map(|m| m.to_string())
        .collect();
    if modes.is_empty() {
        return None;
    }

    let mut series = Vec::new();
    for bs in block_sizes {
        let values = modes
            .iter()
            .map(|mode| {
                let times: Vec<f64> = rows
                    .iter()
                    .filter(|r| r.block_size == bs && r.mode == *mode)
                    .map(|r| r.result_secs)
                    .collect();
                let s = summarize(&times);
                (s.mean, s.ci95)
            })
            .collect();
        series.push(BarSeries {
            label: format!("Block Size {}", bs),
            values,
        });
    }

    Some(GroupedSeries {
        categories: modes,
        series,
    })
}

/// Mean combined time for each allowed consecutive filter pair.
///
/// Scans consecutive record pairs in file order; pair labels keep first-seen
/// order. No error bars (the source report plots plain means).
pub fn filter_pair_stats(records: &[Record]) -> GroupedSeries {
    let mut order: Vec<String> = Vec::new();
    let mut totals: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for w in records.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        if ALLOWED_PAIRS.contains(&(a.filter.as_str(), b.filter.as_str())) {
            let label = format!("{}-{}", a.filter, b.filter);
            if !totals.contains_key(&label) {
                order.push(label.clone());
            }
            totals
                .entry(label)
                .or_default()
                .push(a.result_secs + b.result_secs);
        }
    }

    let values = order
        .iter()
        .map(|l| (summarize(&totals[l]).mean, 0.0))
        .collect();
    GroupedSeries {
        categories: order,
        series: vec![BarSeries {
            label: String::new(),
            values,
        }],
    }
}

/// Aggregate Result by (ProcessNum, Mode, BlockSize), key order.
pub fn aggregate_mpi(records: &[Record]) -> Vec<MpiCell> {
    let mut groups: BTreeMap<(u32, String, u32), Vec<f64>> = BTreeMap::new();
    for r in records {
        groups
            .entry((r.process_num, r.mode.clone(), r.block_size))
            .or_default()
            .push(r.result_secs);
    }
    groups
        .into_iter()
        .map(|((process_num, mode, block_size), times)| {
            let s = summarize(&times);
            MpiCell {
                process_num,
                mode,
                block_size,
                avg_time: s.mean,
                std_dev: s.std_dev,
            }
        })
        .collect()
}

/// For each block size: a mode x process-count comparison.
pub fn mpi_by_block_size(cells: &[MpiCell]) -> Vec<(u32, GroupedSeries)> {
    let modes = sorted_modes(cells);
    let procs: BTreeSet<u32> = cells.iter().map(|c| c.process_num).collect();
    let blocks: BTreeSet<u32> = cells.iter().map(|c| c.block_size).collect();

    let mut out = Vec::new();
    for bs in blocks {
        let mut series = Vec::new();
        for p in &procs {
            let values = modes
                .iter()
                .map(|mode| {
                    cells
                        .iter()
                        .find(|c| {
                            c.block_size == bs && c.process_num == *p && c.mode == *mode
                        })
                        .map(|c| (c.avg_time, c.std_dev))
                        .unwrap_or((0.0, 0.0))
                })
                .collect();
            series.push(BarSeries {
                label: format!("{} procs", p),
                values,
            });
        }
        out.push((
            bs,
            GroupedSeries {
                categories: modes.clone(),
                series,
            },
        ));
    }
    out
}

/// For each process count: a mode x block-size comparison.
pub fn mpi_by_proc_num(cells: &[MpiCell]) -> Vec<(u32, GroupedSeries)> {
    let modes = sorted_modes(cells);
    let procs: BTreeSet<u32> = cells.iter().map(|c| c.process_num).collect();
    let blocks: BTreeSet<u32> = cells.iter().map(|c| c.block_size).collect();

    let mut out = Vec::new();
    for p in procs {
        let mut series = Vec::new();
        for bs in &blocks {
            let values = modes
                .iter()
                .map(|mode| {
                    cells
                        .iter()
                        .find(|c| {
                            c.process_num == p && c.block_size == *bs && c.mode == *mode
                        })
                        .map(|c| (c.avg_time, c.std_dev))
                        .unwrap_or((0.0, 0.0))
                })
                .collect();
            series.push(BarSeries {
                label: format!("Block {}", bs),
                values,
            });
        }
        out.push((
            p,
            GroupedSeries {
                categories: modes.clone(),
                series,
            },
        ));
    }
    out
}

fn sorted_modes(cells: &[MpiCell]) -> Vec<String> {
    let modes: BTreeSet<String> = cells.iter().map(|c| c.mode.clone()).collect();
    modes.into_iter().collect()
}

/// The compute mode of a queue run. The log is expected to carry a single
/// mode; the first row wins.
pub fn compute_mode(rows: &[QueueRow]) -> Option<&str> {
    rows.first().map(|r| r.compute_mode.as_str())
}

/// Aggregate queue timings by tag (tag order).
pub fn aggregate_queue(rows: &[QueueRow]) -> Vec<TagStat> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in rows {
        groups
            .entry(r.log_tag.clone())
            .or_default()
            .push(r.time_secs);
    }
    groups
        .into_iter()
        .map(|(log_tag, times)| {
            let s = summarize(&times);
            TagStat {
                log_tag,
                mean: s.mean,
                std_dev: s.std_dev,
            }
        })
        .collect()
}

/// Single-series bars for the tags in `tags` that are present, mean +- std.
pub fn tag_series(stats: &[TagStat], tags: &[&str]) -> Option<GroupedSeries> {
    let picked: Vec<&TagStat> = stats
        .iter()
        .filter(|s| tags.contains(&s.log_tag.as_str()))
        .collect();
    if picked.is_empty() {
        return None;
    }
    Some(GroupedSeries {
        categories: picked.iter().map(|s| s.log_tag.clone()).collect(),
        series: vec![BarSeries {
            label: String::new(),
            values: picked.iter().map(|s| (s.mean, s.std_dev)).collect(),
        }],
    })
}

/// Cross-mix comparison for one compute mode: x = mixes, one series per tag.
pub fn summary_comparison(
    rows: &[SummaryRow],
    compute_mode: &str,
    tags: &[&str],
) -> Option<GroupedSeries> {
    let picked: Vec<&SummaryRow> = rows
        .iter()
        .filter(|r| r.compute_mode == compute_mode && tags.contains(&r.log_tag.as_str()))
        .collect();
    if picked.is_empty() {
        return None;
    }

    let mut mixes: Vec<String> = picked.iter().map(|r| r.mix.clone()).collect();
    mixes.sort();
    mixes.dedup();
    let present: BTreeSet<String> = picked.iter().map(|r| r.log_tag.clone()).collect();

    let mut series = Vec::new();
    for tag in present {
        let values = mixes
            .iter()
            .map(|mix| {
                picked
                    .iter()
                    .find(|r| r.mix == *mix && r.log_tag == tag)
                    .map(|r| (r.mean, r.std_dev))
                    .unwrap_or((0.0, 0.0))
            })
            .collect();
        series.push(BarSeries { label: tag, values });
    }

    Some(GroupedSeries {
        categories: mixes,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(filter: &str, process_num: u32, mode: &str, block_size: u32, secs: f64) -> Record {
        Record {
            run_id: 1,
            filter: filter.to_string(),
            process_num,
            mode: mode.to_string(),
            block_size,
            result_secs: secs,
        }
    }

    #[test]
    fn summarize_known_values() {
        let s = summarize(&[1.0, 2.0, 3.0]);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.std_dev, 1.0);
        assert_eq!(s.n, 3);
        assert!((s.ci95 - 1.96 / 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summarize_singleton_has_zero_spread() {
        let s = summarize(&[4.5]);
        assert_eq!(s.mean, 4.5);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.ci95, 0.0);
    }

    #[test]
    fn single_thread_stats_keeps_first_seen_order() {
        let records = vec![
            rec("sh", 1, "single_thread", 0, 2.0),
            rec("mb", 1, "single_thread", 0, 1.0),
            rec("sh", 1, "single_thread", 0, 4.0),
            rec("gb", 8, "by_row", 16, 9.0),
        ];
        let out = single_thread_stats(&records);
        assert_eq!(out.categories, vec!["Sharpen Filter", "Motion Blur"]);
        assert_eq!(out.series[0].values[0].0, 3.0);
        assert_eq!(out.series[0].values[1].0, 1.0);
    }

    #[test]
    fn filter_mode_table_is_mode_by_block() {
        let records = vec![
            rec("mb", 4, "by_row", 8, 1.0),
            rec("mb", 4, "by_row", 16, 2.0),
            rec("mb", 4, "by_column", 8, 3.0),
            rec("mb", 1, "single_thread", 0, 9.0),
        ];
        let out = filter_mode_table(&records, "mb").unwrap();
        assert_eq!(out.categories, vec!["by_row", "by_column"]);
        assert_eq!(out.series.len(), 2);
        assert_eq!(out.series[0].label, "Block Size 8");
        assert_eq!(out.series[0].values, vec![(1.0, 0.0), (3.0, 0.0)]);
        // Missing cell (by_column, 16) aggregates over nothing.
        assert_eq!(out.series[1].values, vec![(2.0, 0.0), (0.0, 0.0)]);
    }

    #[test]
    fn filter_mode_table_keeps_canonical_mode_order() {
        let records = vec![
            rec("mb", 4, "by_grid", 8, 1.0),
            rec("mb", 4, "by_row", 8, 2.0),
            rec("mb", 4, "weird_mode", 8, 3.0),
        ];
        let out = filter_mode_table(&records, "mb").unwrap();
        // Canonical order, not file order; unknown modes stay off the axis.
        assert_eq!(out.categories, vec!["by_row", "by_grid"]);
        assert_eq!(out.series[0].values, vec![(2.0, 0.0), (1.0, 0.0)]);
    }

    #[test]
    fn filter_mode_table_none_without_multithread_rows() {
        let records = vec![rec("mb", 1, "single_thread", 0, 1.0)];
        assert_eq!(filter_mode_table(&records, "mb"), None);
    }

    #[test]
    fn filter_mode_table_none_for_unknown_modes_only() {
        let records = vec![rec("mb", 4, "weird_mode", 8, 1.0)];
        assert_eq!(filter_mode_table(&records, "mb"), None);
    }

    #[test]
    fn normalize_single_thread_folds_mode_and_block() {
        let mut records = vec![
            rec("mb", 1, "by_row", 8, 1.0),
            rec("mb", 4, "by_row", 8, 2.0),
        ];
        normalize_single_thread(&mut records);
        assert_eq!(records[0].mode, "single_thread");
        assert_eq!(records[0].block_size, 0);
        assert_eq!(records[1].mode, "by_row");
        assert_eq!(records[1].block_size, 8);
    }

    #[test]
    fn filter_pairs_sum_consecutive_allowed_combinations() {
        let records = vec![
            rec("gb", 4, "by_row", 8, 1.0),
            rec("sh", 4, "by_row", 8, 2.0),
            rec("bb", 4, "by_row", 8, 5.0),
            rec("gb", 4, "by_row", 8, 3.0),
            rec("sh", 4, "by_row", 8, 4.0),
        ];
        let out = filter_pair_stats(&records);
        assert_eq!(out.categories, vec!["gb-sh"]);
        // (1+2) and (3+4) average to 5.
        assert_eq!(out.series[0].values, vec![(5.0, 0.0)]);
    }

    #[test]
    fn aggregate_mpi_groups_and_spreads() {
        let records = vec![
            rec("mb", 4, "by_row", 8, 1.0),
            rec("mb", 4, "by_row", 8, 3.0),
            rec("mb", 2, "by_col", 8, 7.0),
        ];
        let cells = aggregate_mpi(&records);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].process_num, 2);
        assert_eq!(cells[0].std_dev, 0.0);
        assert_eq!(cells[1].avg_time, 2.0);
        assert!((cells[1].std_dev - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn mpi_facets_cover_every_dimension_value() {
        let records = vec![
            rec("mb", 2, "by_row", 8, 1.0),
            rec("mb", 4, "by_row", 8, 2.0),
            rec("mb", 2, "by_col", 16, 3.0),
        ];
        let cells = aggregate_mpi(&records);

        let by_block = mpi_by_block_size(&cells);
        assert_eq!(by_block.len(), 2);
        let (bs, table) = &by_block[0];
        assert_eq!(*bs, 8);
        assert_eq!(table.categories, vec!["by_col", "by_row"]);
        assert_eq!(table.series[0].label, "2 procs");
        assert_eq!(table.series[0].values, vec![(0.0, 0.0), (1.0, 0.0)]);

        let by_proc = mpi_by_proc_num(&cells);
        assert_eq!(by_proc.len(), 2);
        assert_eq!(by_proc[0].0, 2);
        assert_eq!(by_proc[0].1.series[0].label, "Block 8");
    }

    #[test]
    fn queue_aggregation_and_tag_selection() {
        let rows = vec![
            QueueRow {
                compute_mode: "by_row".to_string(),
                log_tag: "QPUSH".to_string(),
                time_secs: 1.0,
            },
            QueueRow {
                compute_mode: "by_row".to_string(),
                log_tag: "QPUSH".to_string(),
                time_secs: 3.0,
            },
            QueueRow {
                compute_mode: "by_row".to_string(),
                log_tag: "WORKER".to_string(),
                time_secs: 5.0,
            },
        ];
        assert_eq!(compute_mode(&rows), Some("by_row"));

        let stats = aggregate_queue(&rows);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].log_tag, "QPUSH");
        assert_eq!(stats[0].mean, 2.0);

        let ops = tag_series(&stats, QUEUE_OP_TAGS).unwrap();
        assert_eq!(ops.categories, vec!["QPUSH"]);
        let threads = tag_series(&stats, THREAD_TAGS).unwrap();
        assert_eq!(threads.categories, vec!["WORKER"]);
        assert_eq!(tag_series(&stats, &["READER"]), None);
    }

    #[test]
    fn first_compute_mode_wins_in_mixed_queue_log() {
        let rows = vec![
            QueueRow {
                compute_mode: "by_row".to_string(),
                log_tag: "QPUSH".to_string(),
                time_secs: 1.0,
            },
            QueueRow {
                compute_mode: "by_column".to_string(),
                log_tag: "QPOP".to_string(),
                time_secs: 2.0,
            },
        ];
        assert_eq!(compute_mode(&rows), Some("by_row"));
    }

    #[test]
    fn summary_comparison_is_mix_by_tag() {
        let row = |mix: &str, tag: &str, mean: f64| SummaryRow {
            mix: mix.to_string(),
            compute_mode: "by_row".to_string(),
            log_tag: tag.to_string(),
            mean,
            std_dev: 0.1,
        };
        let rows = vec![
            row("2-1-1", "QPUSH", 1.0),
            row("1-2-1", "QPUSH", 2.0),
            row("1-2-1", "QPOP", 3.0),
        ];
        let out = summary_comparison(&rows, "by_row", QUEUE_OP_TAGS).unwrap();
        assert_eq!(out.categories, vec!["1-2-1", "2-1-1"]);
        assert_eq!(out.series.len(), 2);
        assert_eq!(out.series[0].label, "QPOP");
        assert_eq!(out.series[0].values, vec![(3.0, 0.1), (0.0, 0.0)]);
        assert_eq!(out.series[1].values, vec![(2.0, 0.1), (1.0, 0.1)]);

        assert_eq!(summary_comparison(&rows, "by_col", QUEUE_OP_TAGS), None);
    }
}
