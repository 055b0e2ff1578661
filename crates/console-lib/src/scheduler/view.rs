//! Published state of the metrics view

use crate::metrics::{ClassifiedMetric, MetricSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metrics of the currently viewed service
///
/// `generation` identifies the (service, minutes) session the data belongs
/// to. With no service viewed, `service` is `None` and everything is empty.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsView {
    pub service: Option<String>,
    pub minutes: u32,
    pub generation: u64,
    pub metrics: Vec<ClassifiedMetric>,
    pub live: MetricSnapshot,
    pub historical_error: Option<String>,
    pub live_error: Option<String>,
    /// True until the first historical result of the session arrives
    pub loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) historical_seq: u64,
    #[serde(skip)]
    pub(crate) live_seq: u64,
}

impl MetricsView {
    pub(crate) fn loading(service: &str, minutes: u32, generation: u64) -> Self {
        Self {
            service: Some(service.to_string()),
            minutes,
            generation,
            loading: true,
            ..Default::default()
        }
    }

    pub(crate) fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        self.historical_error.is_some() || self.live_error.is_some()
    }
}
