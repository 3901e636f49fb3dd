use anyhow::bail;
use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::{Path, PathBuf};

mod diagnostics;
mod error;
mod log;
mod model;
mod render;
mod summary;

pub type Result<T> = anyhow::Result<T>;

/// Header layout of timing-results.dat produced by the thread runner.
const THREAD_LOG_HEADER_ROWS: usize = 2;
/// The MPI runner writes a single header line.
const MPI_LOG_HEADER_ROWS: usize = 1;

#[derive(Parser)]
#[command(name = "bmpconv-report")]
#[command(about = "Comparison charts for the bmp-conv benchmark timing logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Thread-benchmark charts: single-thread filter comparison plus
    /// per-filter mode/block-size breakdowns.
    Threads {
        #[arg(long)]
        log: String,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },

    /// Mean combined time for consecutive filter pairs.
    Pairs {
        #[arg(long)]
        log: String,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },

    /// MPI benchmark charts grouped by block size and by process count.
    Mpi {
        #[arg(long)]
        log: String,

        #[arg(short = 'o', long)]
        out: PathBuf,

        /// Write the reconciliation diagnostics as JSON.
        #[arg(long)]
        diag_out: Option<PathBuf>,
    },

    /// Aggregate one queue run, append it to the summary table, and plot it.
    Queue {
        #[arg(long)]
        log: String,

        #[arg(long)]
        summary: String,

        /// Reader,Worker,Writer role ratio used for labeling (e.g. 1,2,1).
        #[arg(long)]
        mix: String,

        /// Skip the per-mix charts and only append the summary rows.
        #[arg(long)]
        no_plot: bool,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },

    /// Cross-mix comparison charts from the accumulated summary table.
    QueueSummary {
        #[arg(long)]
        summary: String,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Threads { log, out } => cmd_threads(&log, &out),
        Commands::Pairs { log, out } => cmd_pairs(&log, &out),
        Commands::Mpi { log, out, diag_out } => cmd_mpi(&log, &out, diag_out.as_deref()),
        Commands::Queue {
            log,
            summary,
            mix,
            no_plot,
            out,
        } => cmd_queue(&log, &summary, &mix, no_plot, &out),
        Commands::QueueSummary { summary, out } => cmd_queue_summary(&summary, &out),
    }
}

fn cmd_threads(log_path: &str, out: &Path) -> Result<()> {
    let reconciled = log::parse_timing_file(log_path, THREAD_LOG_HEADER_ROWS)?;
    let mut records = reconciled.records;
    model::normalize_single_thread(&mut records);

    let single = model::single_thread_stats(&records);
    if !single.categories.is_empty() {
        render::render_grouped_bars(
            &out.join("st").join("all_filters_execution_time.png"),
            "Execution Time for Different Filters (Single Thread)",
            "Filter",
            "Execution Time (seconds)",
            &single,
        )?;
    }

    for filter in model::unique_filters(&records) {
        if let Some(table) = model::filter_mode_table(&records, &filter) {
            render::render_grouped_bars(
                &out.join("mt")
                    .join(format!("{}_execution_time_vs_mode.png", filter)),
                &format!(
                    "Execution Time vs Computation Mode for {}",
                    model::filter_display_name(&filter)
                ),
                "Computation Mode",
                "Execution Time (seconds)",
                &table,
            )?;
        }
    }
    Ok(())
}

fn cmd_pairs(log_path: &str, out: &Path) -> Result<()> {
    let reconciled = log::parse_timing_file(log_path, 0)?;
    let pairs = model::filter_pair_stats(&reconciled.records);
    if pairs.categories.is_empty() {
        bail!(
            "{}",
            diagnostics::error_message(format!("no allowed filter pairs found in {}", log_path))
        );
    }
    render::render_grouped_bars(
        &out.join("filter_pairs_execution_time.png"),
        "Average Execution Time for Filter Combinations",
        "Filter Pairs",
        "Average Execution Time (seconds)",
        &pairs,
    )
}

fn cmd_mpi(log_path: &str, out: &Path, diag_out: Option<&Path>) -> Result<()> {
    let reconciled = log::parse_timing_file(log_path, MPI_LOG_HEADER_ROWS)?;
    println!(
        "Reconciled {} records ({})",
        reconciled.records.len(),
        reconciled.diagnostics
    );

    if let Some(diag_path) = diag_out {
        let json = serde_json::to_string_pretty(&reconciled.diagnostics)?;
        std::fs::write(diag_path, json)?;
        println!("Wrote {}", diag_path.display());
    }

    let cells = model::aggregate_mpi(&reconciled.records);

    for (bs, table) in model::mpi_by_block_size(&cells) {
        render::render_grouped_bars(
            &out.join("by_block_size")
                .join(format!("mpi_perf_block_{}.png", bs)),
            &format!("MPI Performance Comparison (Block Size: {})", bs),
            "Computation Mode",
            "Average Execution Time (seconds)",
            &table,
        )?;
    }
    for (pn, table) in model::mpi_by_proc_num(&cells) {
        render::render_grouped_bars(
            &out.join("by_proc_num")
                .join(format!("mpi_perf_proc_{}.png", pn)),
            &format!("MPI Performance Comparison (Processes: {})", pn),
            "Computation Mode",
            "Average Execution Time (seconds)",
            &table,
        )?;
    }
    Ok(())
}

fn cmd_queue(
    log_path: &str,
    summary_path: &str,
    mix: &str,
    no_plot: bool,
    out: &Path,
) -> Result<()> {
    let mix_label = mix_label(mix)?;

    let (rows, dropped) = log::parse_queue_file(log_path)?;
    if dropped > 0 {
        diagnostics::warn(format!(
            "{}: dropped {} malformed queue lines",
            log_path, dropped
        ));
    }

    let mode = match model::compute_mode(&rows) {
        Some(m) => m.to_string(),
        None => bail!(
            "{}",
            diagnostics::error_message(format!("no compute mode found in {}", log_path))
        ),
    };
    let stats = model::aggregate_queue(&rows);

    summary::append_summary(summary_path, &mix_label, &mode, &stats)?;
    println!("Appended {} rows to {}", stats.len(), summary_path);

    if no_plot {
        return Ok(());
    }

    let plots = [
        (
            model::QUEUE_OP_TAGS,
            format!(
                "Average Queue Operations Time (Mode: {}, Mix: {})",
                mode, mix_label
            ),
            "Queue Operation",
            "Average Operation Time (seconds)",
            format!("{}_{}_qblock_ops_avg.png", mode, mix_label),
        ),
        (
            model::THREAD_TAGS,
            format!(
                "Average Thread Execution Times (Mode: {}, Mix: {})",
                mode, mix_label
            ),
            "Thread Role",
            "Average Execution Time (seconds)",
            format!("{}_{}_thread_exec_avg.png", mode, mix_label),
        ),
    ];
    for (tags, title, x_label, y_label, file_name) in plots {
        match model::tag_series(&stats, tags) {
            Some(table) => render::render_grouped_bars(
                &out.join(&mode).join(file_name),
                &title,
                x_label,
                y_label,
                &table,
            )?,
            None => diagnostics::warn(format!("no data for tags {:?}; skipping plot", tags)),
        }
    }
    Ok(())
}

fn cmd_queue_summary(summary_path: &str, out: &Path) -> Result<()> {
    let rows = summary::read_summary(summary_path)?;

    let mut modes: Vec<String> = rows.iter().map(|r| r.compute_mode.clone()).collect();
    modes.sort();
    modes.dedup();

    for mode in &modes {
        let plots = [
            (
                model::QUEUE_OP_TAGS,
                format!("Comparison of Avg Queue Ops Times (Mode: {}) Across Mixes", mode),
                "Average Operation Time (seconds)",
                format!("{}_qops_summary_compare.png", mode),
            ),
            (
                model::THREAD_TAGS,
                format!(
                    "Comparison of Avg Thread Execution Times (Mode: {}) Across Mixes",
                    mode
                ),
                "Average Execution Time (seconds)",
                format!("{}_thread_summary_compare.png", mode),
            ),
        ];
        for (tags, title, y_label, file_name) in plots {
            match model::summary_comparison(&rows, mode, tags) {
                Some(table) => render::render_grouped_bars(
                    &out.join("summary").join(file_name),
                    &title,
                    "Reader-Worker-Writer Mix",
                    y_label,
                    &table,
                )?,
                None => diagnostics::warn(format!(
                    "no summary rows for mode {} tags {:?}",
                    mode, tags
                )),
            }
        }
    }
    Ok(())
}

/// Validate the role-ratio mix and rewrite it for filenames ("1,2,1" -> "1-2-1").
fn mix_label(mix: &str) -> Result<String> {
    let re = Regex::new(r"^\d+(,\d+)*$")?;
    if !re.is_match(mix) {
        bail!(
            "{}",
            diagnostics::error_message(format!(
                "invalid --mix {:?}: expected comma-separated counts like 1,2,1",
                mix
            ))
        );
    }
    Ok(mix.replace(',', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mix_label_rewrites_commas() {
        assert_eq!(mix_label("1,2,1").unwrap(), "1-2-1");
        assert_eq!(mix_label("4").unwrap(), "4");
    }

    #[test]
    fn mix_label_rejects_garbage() {
        assert!(mix_label("1,2,").is_err());
        assert!(mix_label("a,b,c").is_err());
        assert!(mix_label("").is_err());
    }
}
