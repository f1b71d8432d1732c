use std::collections::BTreeMap;

use chrono::Utc;
use td_schemas::{Category, HistoryPoint};
use tracing::debug;

use crate::BestDeals;

/// Category -> chronological series of best-price points.
///
/// Points are only ever appended. With a retention cap the oldest points of
/// a category are dropped once the cap is exceeded.
#[derive(Debug, Clone, Default)]
pub struct HistoryAggregator {
    series: BTreeMap<String, Vec<HistoryPoint>>,
    max_points: Option<usize>,
}

impl HistoryAggregator {
    /// `max_points_per_category`: `None` (or `Some(0)`) keeps everything.
    pub fn new(max_points_per_category: Option<usize>) -> Self {
        Self {
            series: BTreeMap::new(),
            max_points: max_points_per_category.filter(|n| *n > 0),
        }
    }

    /// Append the highest tier price of `deals`, stamped now.
    pub fn log_best_price(&mut self, category: &Category, deals: &BestDeals) -> Option<HistoryPoint> {
        self.log_best_price_at(category, deals, Utc::now().timestamp_millis())
    }

    /// As [`log_best_price`](Self::log_best_price) with an explicit epoch-ms
    /// timestamp. Nothing is appended when no tier has a price.
    pub fn log_best_price_at(
        &mut self,
        category: &Category,
        deals: &BestDeals,
        timestamp: i64,
    ) -> Option<HistoryPoint> {
        let highest = deals.highest()?;
        let point = HistoryPoint { timestamp, highest };

        let series = self.series.entry(category.as_str().to_string()).or_default();
        series.push(point);
        if let Some(cap) = self.max_points {
            if series.len() > cap {
                let excess = series.len() - cap;
                series.drain(..excess);
            }
        }
        debug!(category = %category, highest, points = series.len(), "history point logged");
        Some(point)
    }

    pub fn series(&self, category: &Category) -> &[HistoryPoint] {
        self.series
            .get(category.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn all(&self) -> &BTreeMap<String, Vec<HistoryPoint>> {
        &self.series
    }

    pub fn max_points(&self) -> Option<usize> {
        self.max_points
    }
}
