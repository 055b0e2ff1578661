//! Live metric snapshots

use super::normalize::coerce_number;
use super::series::MetricSnapshot;
use serde_json::Value;

/// Build a snapshot from a live payload
///
/// Accepts `{"metrics": {...}}` or a bare `{name: value}` map. Entries that
/// cannot be reduced to a number are recorded as absent.
pub fn build_snapshot(raw: &Value) -> MetricSnapshot {
    let mut snapshot = MetricSnapshot::default();

    let Some(map) = raw.as_object() else {
        return snapshot;
    };
    let entries = match map.get("metrics") {
        Some(Value::Object(inner)) => inner,
        _ => map,
    };

    for (name, value) in entries {
        snapshot.insert(name.as_str(), scalar_of(value));
    }
    snapshot
}

fn scalar_of(value: &Value) -> Option<f64> {
    match value {
        Value::Array(items) => match items.first()? {
            Value::Object(point) => coerce_number(point.get("value")?),
            other => coerce_number(other),
        },
        Value::Object(map) => coerce_number(map.get("value")?),
        other => coerce_number(other),
    }
}
