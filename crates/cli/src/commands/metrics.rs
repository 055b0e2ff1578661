//! Metrics commands

use anyhow::{Context, Result};
use serde_json::json;
use tabled::Tabled;

use super::CommandContext;
use crate::output::{
    color_error_rate, format_timestamp, format_value, print_error, print_info, print_json,
    print_table, print_warning,
};
use console_lib::metrics::{
    build_snapshot, classify, display_format, humanize_key, ingest_historical, ClassifiedMetric,
    MetricKind, MetricSeries, MetricSnapshot, LIVE_CARDS,
};
use console_lib::MetricsView;

/// Row for the live value cards
#[derive(Tabled)]
struct CardRow {
    #[tabled(rename = "Metric")]
    title: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Row for the per-series summary
#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Metric")]
    title: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "First")]
    first: String,
    #[tabled(rename = "Last")]
    last: String,
    #[tabled(rename = "Mean")]
    mean: String,
}

fn card_row(name: &str, value: Option<f64>) -> CardRow {
    let none = MetricSeries::default();
    let kind = classify(name, &none);
    let formatted = match kind {
        MetricKind::ErrorRate => color_error_rate(value),
        _ => format_value(value, display_format(kind, &none)),
    };
    CardRow {
        title: kind
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| humanize_key(name)),
        value: formatted,
    }
}

/// Summary cards first, then any other live value the backend sent
fn card_rows(live: &MetricSnapshot) -> Vec<CardRow> {
    let mut rows: Vec<CardRow> = LIVE_CARDS
        .iter()
        .map(|name| card_row(name, live.get(name)))
        .collect();
    rows.extend(
        live.iter()
            .filter(|(name, _)| !LIVE_CARDS.contains(name))
            .map(|(name, value)| card_row(name, value)),
    );
    rows
}

fn series_rows(metrics: &[ClassifiedMetric]) -> Vec<SeriesRow> {
    metrics
        .iter()
        .map(|metric| {
            let series = &metric.series;
            SeriesRow {
                title: metric.title.clone(),
                key: metric.key.clone(),
                points: series.len(),
                first: format_value(series.first().map(|p| p.value), metric.format),
                last: format_value(series.last().map(|p| p.value), metric.format),
                mean: format_value(series.mean(), metric.format),
            }
        })
        .collect()
}

/// Fetch historical and live metrics once and print them
pub async fn show_metrics(
    ctx: &CommandContext,
    service: &str,
    minutes: Option<u32>,
    method: Option<&str>,
) -> Result<()> {
    let minutes = ctx.minutes(minutes);

    let (historical, live) = match method {
        Some(method) => (
            ctx.client
                .fetch_method_metrics(service, method, minutes)
                .await,
            None,
        ),
        None => {
            let (historical, live) = tokio::join!(
                ctx.client.fetch_historical_metrics(service, minutes),
                ctx.client.fetch_live_metrics(service)
            );
            (historical, Some(live))
        }
    };

    let historical =
        historical.with_context(|| format!("Failed to fetch metrics of {}", service))?;
    let metrics = ingest_historical(&historical);

    let live = match live {
        Some(Ok(payload)) => Some(build_snapshot(&payload)),
        Some(Err(err)) => {
            if !ctx.is_json() {
                print_warning(&format!("Live metrics unavailable: {}", err));
            }
            None
        }
        None => None,
    };

    if ctx.is_json() {
        return print_json(&json!({
            "service": service,
            "method": method,
            "minutes": minutes,
            "live": live,
            "metrics": metrics,
        }));
    }

    match method {
        Some(method) => print_info(&format!(
            "{} {} over the last {} minutes",
            service, method, minutes
        )),
        None => print_info(&format!("{} over the last {} minutes", service, minutes)),
    }
    if let Some(live) = &live {
        print_table(&card_rows(live), "No live metrics");
    }
    print_table(&series_rows(&metrics), "No historical metrics");
    Ok(())
}

fn render_view(ctx: &CommandContext, view: &MetricsView) -> Result<()> {
    if ctx.is_json() {
        return print_json(view);
    }

    print_info(&format!(
        "{} at {}",
        view.service.as_deref().unwrap_or_default(),
        format_timestamp(view.updated_at)
    ));
    if let Some(err) = &view.historical_error {
        print_error(&format!("Historical metrics: {}", err));
    }
    if let Some(err) = &view.live_error {
        print_error(&format!("Live metrics: {}", err));
    }
    print_table(&card_rows(&view.live), "No live metrics");
    Ok(())
}

/// Poll the live metrics of a service until Ctrl-C
pub async fn watch_metrics(ctx: &CommandContext, service: &str, minutes: Option<u32>) -> Result<()> {
    let scheduler = ctx.scheduler();
    let mut updates = scheduler.subscribe();
    scheduler
        .view(service, ctx.minutes(minutes))
        .with_context(|| format!("Failed to watch {}", service))?;

    if !ctx.is_json() {
        print_info(&format!(
            "Watching {}, refreshing every {}s (Ctrl-C to stop)",
            service,
            ctx.config.live_poll_interval().as_secs()
        ));
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let view = updates.borrow_and_update().clone();
                if view.loading {
                    continue;
                }
                if let Err(err) = render_view(ctx, &view) {
                    break Err(err);
                }
            }
            _ = &mut ctrl_c => break Ok(()),
        }
    };

    scheduler.leave();
    outcome
}
