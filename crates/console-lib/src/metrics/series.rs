//! Metric data types produced by the ingestion pipeline

use serde::Serialize;
use std::collections::BTreeMap;

/// Single sample: epoch-millisecond timestamp and a finite value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Time series, ordered by non-decreasing timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSeries {
    pub points: Vec<MetricPoint>,
}

impl MetricSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&MetricPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&MetricPoint> {
        self.points.last()
    }

    /// Arithmetic mean of the values, `None` for an empty series
    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let sum: f64 = self.points.iter().map(|p| p.value).sum();
        let mean = sum / self.points.len() as f64;
        mean.is_finite().then_some(mean)
    }
}

/// Semantic category of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    ResponseTime,
    RequestRate,
    ErrorRate,
    Cpu,
    Memory,
    Unknown,
}

impl MetricKind {
    /// Display title for known kinds
    pub fn title(&self) -> Option<&'static str> {
        match self {
            MetricKind::Memory => Some("Memory Usage"),
            MetricKind::RequestRate => Some("Request Rate"),
            MetricKind::ResponseTime => Some("Response Time"),
            MetricKind::ErrorRate => Some("Error Rate"),
            MetricKind::Cpu => Some("CPU Usage"),
            MetricKind::Unknown => None,
        }
    }
}

/// How a metric's values should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFormat {
    Bytes,
    /// Requests per second
    Rate,
    /// Seconds
    Duration,
    /// Fraction in `[0, 1]`
    Percentage,
    Number,
}

/// Series with its semantic kind and presentation hints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedMetric {
    pub key: String,
    pub kind: MetricKind,
    pub format: DisplayFormat,
    pub title: String,
    pub series: MetricSeries,
}

/// Live values by metric name; `None` marks an absent value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSnapshot {
    values: BTreeMap<String, Option<f64>>,
}

impl MetricSnapshot {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.values
            .insert(name.into(), value.filter(|v| v.is_finite()));
    }

    /// Value of `name`, `None` when absent or unknown
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
