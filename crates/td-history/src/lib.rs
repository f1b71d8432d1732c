//! td-history
//!
//! Best-price history per category and its chart projection.
//!
//! - `deals`: best deal per tier, from an untyped snapshot or from records
//! - `aggregator`: per-category append-only series of best-price points
//! - `chart`: time bucketing and the single-series chart view

mod aggregator;
mod chart;
mod deals;

pub use aggregator::HistoryAggregator;
pub use chart::{bucket_highs, project_chart, ChartRender, ChartSeries, ChartState};
pub use deals::{BestDeals, Deal};
