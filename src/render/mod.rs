//! Chart rendering (PNG bar charts).

pub mod chart;

pub use chart::render_grouped_bars;
