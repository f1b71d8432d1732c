use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use td_schemas::HistoryPoint;

/// Bucket start (epoch ms, floored) -> highest value seen in that bucket.
pub fn bucket_highs(points: &[HistoryPoint], bucket_ms: i64) -> BTreeMap<i64, f64> {
    let width = bucket_ms.max(1);
    let mut out: BTreeMap<i64, f64> = BTreeMap::new();
    for p in points {
        let start = p.timestamp.div_euclid(width) * width;
        out.entry(start)
            .and_modify(|v| *v = v.max(p.highest))
            .or_insert(p.highest);
    }
    out
}

/// One rendered line series. `labels` and `values` always have equal length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Project bucketed highs of `selected` into a chart series, ascending by
/// time, labelled `HH:MM` (UTC). Unknown categories yield an empty series.
pub fn project_chart(
    buckets_by_category: &BTreeMap<String, BTreeMap<i64, f64>>,
    selected: &str,
    names: &BTreeMap<String, String>,
    bucket_minutes: u32,
) -> ChartSeries {
    let name = names.get(selected).map(String::as_str).unwrap_or(selected);
    let label = format!("{name} Highest Price per {bucket_minutes} Minutes (¥)");

    let Some(buckets) = buckets_by_category.get(selected) else {
        return ChartSeries {
            label,
            labels: Vec::new(),
            values: Vec::new(),
        };
    };

    let (labels, values): (Vec<String>, Vec<f64>) = buckets
        .iter()
        .map(|(ts, v)| (hh_mm(*ts), *v))
        .unzip();

    ChartSeries {
        label,
        labels,
        values,
    }
}

fn hh_mm(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

/// Whether [`ChartState::render`] created the chart or updated it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartRender {
    Created,
    Updated,
}

/// The single chart instance a viewer keeps. The first render creates it;
/// later renders replace its label and data.
#[derive(Debug, Clone, Default)]
pub struct ChartState {
    current: Option<ChartSeries>,
}

impl ChartState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, series: ChartSeries) -> ChartRender {
        match &mut self.current {
            Some(existing) => {
                *existing = series;
                ChartRender::Updated
            }
            None => {
                self.current = Some(series);
                ChartRender::Created
            }
        }
    }

    pub fn current(&self) -> Option<&ChartSeries> {
        self.current.as_ref()
    }
}
