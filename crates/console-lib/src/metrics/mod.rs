//! Metrics ingestion pipeline
//!
//! Turns the loosely shaped metrics payloads of the backend into typed
//! series and live snapshots. Nothing in here returns an error: malformed
//! input degrades to empty series, `Unknown` kinds and absent values.

mod classify;
mod normalize;
mod series;
mod snapshot;


pub use classify::{classify, display_format, humanize_key};
pub use normalize::{extract_series, normalize_series};
pub use series::{
    ClassifiedMetric, DisplayFormat, MetricKind, MetricPoint, MetricSeries, MetricSnapshot,
};
pub use snapshot::build_snapshot;

use serde_json::Value;

/// Names of the live values shown as summary cards
pub const RESPONSE_TIME: &str = "responseTime";
pub const REQUEST_RATE: &str = "requestRate";
pub const JVM_MEMORY: &str = "jvm_memory";
pub const ERROR_RATE: &str = "errorRate";

pub const LIVE_CARDS: [&str; 4] = [RESPONSE_TIME, REQUEST_RATE, JVM_MEMORY, ERROR_RATE];

/// Classify every series of a historical metrics payload
///
/// The metric collection is `payload.metrics` when present, otherwise the
/// payload itself. Named series come out ordered by key and fields that
/// hold no series are skipped. An array of unlabeled series keeps its order
/// and is keyed `series_0`, `series_1`, ...
pub fn ingest_historical(payload: &Value) -> Vec<ClassifiedMetric> {
    let collection = match payload {
        Value::Object(map) => map.get("metrics").unwrap_or(payload),
        other => other,
    };

    match collection {
        // a lone series object
        Value::Object(map) if normalize::point_array_of(map).is_some() => {
            vec![ClassifiedMetric::new("series_0", normalize_series(collection))]
        }
        Value::Object(map) => {
            let mut metrics: Vec<ClassifiedMetric> = map
                .iter()
                .filter_map(|(key, raw)| {
                    extract_series(raw).map(|series| ClassifiedMetric::new(key.as_str(), series))
                })
                .collect();
            metrics.sort_by(|a, b| a.key.cmp(&b.key));
            metrics
        }
        Value::Array(items) if !items.is_empty() && normalize::is_point_array(items) => {
            vec![ClassifiedMetric::new("series_0", normalize_series(collection))]
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                extract_series(raw)
                    .map(|series| ClassifiedMetric::new(format!("series_{index}"), series))
            })
            .collect(),
        _ => Vec::new(),
    }
}
