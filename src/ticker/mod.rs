//! KPI ticker: per-project metrics with a rolling index series, fed either
//! from a local random-walk synthesizer or from the backend's WebSocket.

use crate::domain::ProjectId;
use serde::{Deserialize, Serialize};

pub mod feed;
pub mod format;
pub mod kpi;
pub mod seed;
pub mod synth;

pub use feed::{FeedSubscription, TickerFeed};
pub use synth::{Subscription, TickerSynthesizer};

/// Latest metrics for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTickerDatum {
    pub project_id: ProjectId,
    /// Short ticker symbol, e.g. `IAD`
    pub symbol: String,
    pub name: String,
    /// Latest daily profit in dollars
    pub profit: f64,
    /// 0..=1
    pub margin: f64,
    pub time_saved_hrs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_events: Option<i64>,
    /// Index values normalized to a baseline of 100, oldest first
    pub index_series: Vec<f64>,
}

/// Changed metrics for one project; absent fields are unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerDelta {
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_saved_hrs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_events: Option<i64>,
    /// New point to append to the index series
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_point: Option<f64>,
}

impl TickerDelta {
    pub fn for_project(project_id: ProjectId) -> Self {
        Self {
            project_id,
            profit: None,
            margin: None,
            time_saved_hrs: None,
            prs: None,
            app_events: None,
            index_point: None,
        }
    }
}

/// Appends `point`, keeping at most `history` points
pub(crate) fn push_capped(series: &mut Vec<f64>, point: f64, history: usize) {
    series.push(point);
    if series.len() > history {
        let excess = series.len() - history;
        series.drain(..excess);
    }
}

/// The consumer-side view of the ticker: current data with deltas applied.
#[derive(Debug, Clone, Default)]
pub struct TickerBook {
    data: Vec<ProjectTickerDatum>,
    history: usize,
}

impl TickerBook {
    pub fn new(data: Vec<ProjectTickerDatum>, history: usize) -> Self {
        Self { data, history }
    }

    pub fn data(&self) -> &[ProjectTickerDatum] {
        &self.data
    }

    pub fn get(&self, project_id: &ProjectId) -> Option<&ProjectTickerDatum> {
        self.data.iter().find(|d| &d.project_id == project_id)
    }

    /// Applies a batch of deltas. Deltas for unknown projects are ignored.
    pub fn apply(&mut self, deltas: &[TickerDelta]) {
        for delta in deltas {
            let Some(datum) = self
                .data
                .iter_mut()
                .find(|d| d.project_id == delta.project_id)
            else {
                continue;
            };

            if let Some(profit) = delta.profit {
                datum.profit = profit;
            }
            if let Some(margin) = delta.margin {
                datum.margin = margin;
            }
            if let Some(hours) = delta.time_saved_hrs {
                datum.time_saved_hrs = hours;
            }
            if delta.prs.is_some() {
                datum.prs = delta.prs;
            }
            if delta.app_events.is_some() {
                datum.app_events = delta.app_events;
            }
            if let Some(point) = delta.index_point {
                push_capped(&mut datum.index_series, point, self.history);
            }
        }
    }
}
