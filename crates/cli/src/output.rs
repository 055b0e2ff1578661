//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use console_lib::metrics::DisplayFormat;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Shown wherever a value is absent or unknown
pub const NOT_AVAILABLE: &str = "N/A";

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table
pub fn print_table<T: Tabled>(items: &[T], empty_message: &str) {
    if items.is_empty() {
        println!("{}", empty_message.yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let magnitude = bytes.abs();
    if magnitude >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if magnitude >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if magnitude >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{:.0} B", bytes)
    }
}

/// Format a duration given in seconds
pub fn format_duration(seconds: f64) -> String {
    let millis = seconds * 1000.0;
    if millis < 1.0 {
        format!("{:.0}μs", millis * 1000.0)
    } else if millis < 1000.0 {
        format!("{:.1}ms", millis)
    } else {
        format!("{:.2}s", seconds)
    }
}

/// Format a fraction in `[0, 1]` as percentage
pub fn format_percentage(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn format_rate(per_second: f64) -> String {
    format!("{:.2} req/s", per_second)
}

/// Format an optional instant, "N/A" when absent
pub fn format_timestamp(instant: Option<DateTime<Utc>>) -> String {
    instant
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Format a value according to its display hint
pub fn format_value(value: Option<f64>, format: DisplayFormat) -> String {
    let Some(value) = value else {
        return NOT_AVAILABLE.to_string();
    };
    match format {
        DisplayFormat::Bytes => format_bytes(value),
        DisplayFormat::Rate => format_rate(value),
        DisplayFormat::Duration => format_duration(value),
        DisplayFormat::Percentage => format_percentage(value),
        DisplayFormat::Number => format!("{:.2}", value),
    }
}

/// Highlight a behavior that differs from the method's default
pub fn color_behavior(behavior: &str, overridden: bool) -> String {
    if overridden {
        behavior.yellow().bold().to_string()
    } else {
        behavior.to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "up" | "healthy" | "running" | "available" => status.green().to_string(),
        "degraded" | "warning" | "unknown" => status.yellow().to_string(),
        "down" | "unavailable" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color an error rate: green below 1%, yellow below 5%, red above
pub fn color_error_rate(rate: Option<f64>) -> String {
    let formatted = format_value(rate, DisplayFormat::Percentage);
    match rate {
        Some(r) if r < 0.01 => formatted.green().to_string(),
        Some(r) if r < 0.05 => formatted.yellow().to_string(),
        Some(_) => formatted.red().to_string(),
        None => formatted,
    }
}
