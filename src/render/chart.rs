//! Grouped bar charts rendered to PNG via plotters.

use crate::Result;
use crate::model::GroupedSeries;

use anyhow::anyhow;
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (1280, 720);

/// Render one grouped bar chart with vertical error whiskers.
///
/// Categories sit on the x axis; each series gets one bar per category and a
/// legend entry. The legend is suppressed for a single anonymous series.
/// Parent directories are created on demand.
pub fn render_grouped_bars(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    data: &GroupedSeries,
) -> Result<()> {
    if data.categories.is_empty() || data.series.is_empty() {
        return Err(anyhow!("nothing to plot for {}", path.display()));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let n_cat = data.categories.len();
    let n_series = data.series.len();

    let y_max = data
        .series
        .iter()
        .flat_map(|s| s.values.iter())
        .map(|(mean, err)| mean + err)
        .fold(0.0f64, f64::max)
        .max(1e-9)
        * 1.1;

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("fill chart: {}", e))?;

    let categories = &data.categories;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(16)
        .x_label_area_size(56)
        .y_label_area_size(72)
        .build_cartesian_2d(-0.5f64..(n_cat as f64 - 0.5), 0f64..y_max)
        .map_err(|e| anyhow!("build chart: {}", e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n_cat)
        .x_label_formatter(&|x| {
            let i = x.round();
            if i < 0.0 || i >= n_cat as f64 {
                return String::new();
            }
            categories[i as usize].clone()
        })
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()
        .map_err(|e| anyhow!("draw mesh: {}", e))?;

    let total_width = 0.8f64;
    let bar_width = total_width / n_series as f64;

    for (i, series) in data.series.iter().enumerate() {
        let color = Palette99::pick(i).mix(1.0);
        let offset = -total_width / 2.0 + i as f64 * bar_width;

        let bars = chart
            .draw_series(series.values.iter().enumerate().map(|(cat, (mean, _))| {
                let x0 = cat as f64 + offset;
                let x1 = x0 + bar_width * 0.9;
                Rectangle::new([(x0, 0.0), (x1, *mean)], color.filled())
            }))
            .map_err(|e| anyhow!("draw bars: {}", e))?;

        if !(n_series == 1 && series.label.is_empty()) {
            bars.label(series.label.clone()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
        }

        chart
            .draw_series(series.values.iter().enumerate().map(|(cat, (mean, err))| {
                let x = cat as f64 + offset + bar_width * 0.45;
                ErrorBar::new_vertical(x, mean - err, *mean, mean + err, BLACK.filled(), 8)
            }))
            .map_err(|e| anyhow!("draw error bars: {}", e))?;
    }

    if n_series > 1 || !data.series[0].label.is_empty() {
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()
            .map_err(|e| anyhow!("draw legend: {}", e))?;
    }

    root.present()
        .map_err(|e| anyhow!("write chart {}: {}", path.display(), e))?;
    println!("Saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BarSeries;

    #[test]
    fn empty_table_is_rejected_before_touching_the_backend() {
        let empty = GroupedSeries {
            categories: vec![],
            series: vec![BarSeries {
                label: String::new(),
                values: vec![],
            }],
        };
        let err = render_grouped_bars(
            Path::new("/nonexistent/out/chart.png"),
            "t",
            "x",
            "y",
            &empty,
        )
        .unwrap_err();
        assert!(err.to_string().contains("nothing to plot"));
    }
}
