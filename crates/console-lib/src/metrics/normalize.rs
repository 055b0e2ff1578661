//! Series normalization
//!
//! Backend payloads carry points in several shapes: a series object with a
//! `dataPoints` (or already normalized `points`) array, a bare array of
//! points, an array of series, or a mapping nesting any of these. Every
//! points-like array found is merged into one series sorted by timestamp.

use super::series::{MetricPoint, MetricSeries};
use serde_json::{Map, Value};

/// Recursion bound for nested payloads
const MAX_DEPTH: usize = 8;

/// Keys under which a series object keeps its points
const POINT_KEYS: [&str; 2] = ["dataPoints", "points"];

/// Normalize any supported shape into one series
///
/// Never fails: unrecognized input yields an empty series.
pub fn normalize_series(raw: &Value) -> MetricSeries {
    extract_series(raw).unwrap_or_default()
}

/// Like [`normalize_series`], but `None` when `raw` contains no
/// points-like array at all
pub fn extract_series(raw: &Value) -> Option<MetricSeries> {
    let mut points = Vec::new();
    if !collect(raw, 0, &mut points) {
        return None;
    }
    // stable: equal timestamps keep discovery order
    points.sort_by_key(|p| p.timestamp);
    Some(MetricSeries { points })
}

fn collect(value: &Value, depth: usize, out: &mut Vec<MetricPoint>) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }

    match value {
        Value::Array(items) if is_point_array(items) => {
            out.extend(items.iter().filter_map(parse_point));
            true
        }
        Value::Array(items) => items
            .iter()
            .fold(false, |found, item| collect(item, depth + 1, out) | found),
        Value::Object(map) => {
            if let Some(items) = point_array_of(map) {
                out.extend(items.iter().filter_map(parse_point));
                return true;
            }
            map.values()
                .fold(false, |found, nested| collect(nested, depth + 1, out) | found)
        }
        _ => false,
    }
}

pub(crate) fn point_array_of(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    POINT_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
}

/// An empty array, or one holding at least one point-like object and no
/// series object. Other elements are left for [`parse_point`] to drop.
pub(crate) fn is_point_array(items: &[Value]) -> bool {
    let mut has_point = items.is_empty();
    for item in items {
        if let Value::Object(map) = item {
            if point_array_of(map).is_some() {
                return false;
            }
            has_point |= map.contains_key("timestamp") || map.contains_key("value");
        }
    }
    has_point
}

fn parse_point(item: &Value) -> Option<MetricPoint> {
    let map = item.as_object()?;
    Some(MetricPoint {
        timestamp: coerce_timestamp(map.get("timestamp")?)?,
        value: coerce_number(map.get("value")?)?,
    })
}

fn coerce_timestamp(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

/// Number or numeric string, finite only
pub(crate) fn coerce_number(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
