//! Semantic classification of metric series

use super::series::{ClassifiedMetric, DisplayFormat, MetricKind, MetricSeries};

/// Key substrings checked in order; the first match wins
const KEYWORDS: &[(&[&str], MetricKind)] = &[
    (&["memory"], MetricKind::Memory),
    (&["request", "http"], MetricKind::RequestRate),
    (&["response", "duration"], MetricKind::ResponseTime),
    (&["error"], MetricKind::ErrorRate),
    (&["cpu"], MetricKind::Cpu),
];

/// Mean above which an unlabeled series is taken to be a byte count
const BYTES_THRESHOLD: f64 = 1_000_000.0;

/// Classify a series by its key, falling back to value magnitude
pub fn classify(key: &str, series: &MetricSeries) -> MetricKind {
    classify_key(key).unwrap_or_else(|| match series.mean() {
        Some(mean) if mean > BYTES_THRESHOLD => MetricKind::Memory,
        _ => MetricKind::Unknown,
    })
}

fn classify_key(key: &str) -> Option<MetricKind> {
    let key = key.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| key.contains(needle)))
        .map(|(_, kind)| *kind)
}

/// Presentation hint for a classified series
pub fn display_format(kind: MetricKind, series: &MetricSeries) -> DisplayFormat {
    match kind {
        MetricKind::Memory => DisplayFormat::Bytes,
        MetricKind::RequestRate => DisplayFormat::Rate,
        MetricKind::ResponseTime => DisplayFormat::Duration,
        MetricKind::ErrorRate | MetricKind::Cpu => DisplayFormat::Percentage,
        MetricKind::Unknown => match series.mean() {
            Some(mean) if mean > BYTES_THRESHOLD => DisplayFormat::Bytes,
            Some(mean) if mean < 1.0 => DisplayFormat::Percentage,
            _ => DisplayFormat::Number,
        },
    }
}

/// `weird_metric_7` -> `Weird Metric 7`
pub fn humanize_key(key: &str) -> String {
    let mut title = String::with_capacity(key.len());
    let mut in_word = false;
    for c in key.chars().map(|c| if c == '_' { ' ' } else { c }) {
        if c.is_alphanumeric() {
            if in_word {
                title.push(c);
            } else {
                title.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            title.push(c);
            in_word = false;
        }
    }
    title
}

impl ClassifiedMetric {
    pub fn new(key: impl Into<String>, series: MetricSeries) -> Self {
        let key = key.into();
        let kind = classify(&key, &series);
        let format = display_format(kind, &series);
        let title = kind
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| humanize_key(&key));
        Self {
            key,
            kind,
            format,
            title,
            series,
        }
    }
}
