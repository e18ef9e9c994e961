//! KPI aggregation over metric series.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiAggregate {
    pub total: f64,
    pub avg: f64,
}

/// Converts a cumulative series into per-step deltas; the first value is kept
pub fn to_daily(values: &[f64]) -> Vec<f64> {
    let Some(first) = values.first() else {
        return Vec::new();
    };
    std::iter::once(*first)
        .chain(values.windows(2).map(|w| w[1] - w[0]))
        .collect()
}

/// The last `n` elements, or all of them when there are fewer
pub fn last_n<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

/// Total and mean over the last `points` values of every series
pub fn kpi_aggregates<S: AsRef<[f64]>>(series: &[S], points: usize) -> KpiAggregate {
    let (sum, count) = series
        .iter()
        .flat_map(|s| last_n(s.as_ref(), points))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    KpiAggregate {
        total: sum,
        avg: if count > 0 { sum / count as f64 } else { 0.0 },
    }
}
