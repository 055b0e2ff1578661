//! Service registry commands

use anyhow::{Context, Result};
use serde_json::json;
use tabled::Tabled;

use super::CommandContext;
use crate::output::{
    color_behavior, color_status, format_timestamp, print_info, print_json, print_success,
    print_table, print_warning,
};
use console_lib::{RegistrySnapshot, ServiceConfig};

/// Row for services table
#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "Classes")]
    classes: usize,
    #[tabled(rename = "Methods")]
    methods: usize,
    #[tabled(rename = "Overridden")]
    overridden: String,
}

/// Row for the per-method table of one service
#[derive(Tabled)]
struct MethodRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Available")]
    available: String,
}

fn method_rows(service: &ServiceConfig) -> Vec<MethodRow> {
    service
        .methods()
        .map(|(class, method)| MethodRow {
            class: class.to_string(),
            method: method.method_name().to_string(),
            current: color_behavior(method.current().as_str(), method.is_overridden()),
            default: method.default_behavior().to_string(),
            available: method
                .available()
                .iter()
                .map(|b| b.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

fn print_summary(snapshot: &RegistrySnapshot) {
    print_info(&format!(
        "{} services ({} unavailable), last discovery: {}",
        snapshot.total_services(),
        snapshot.unavailable_services(),
        format_timestamp(snapshot.last_discovery())
    ));
}

/// List every service in the registry
pub async fn list_services(ctx: &CommandContext, refresh: bool) -> Result<()> {
    let store = ctx.store();
    let snapshot = if refresh {
        store.refresh().await
    } else {
        store.load().await
    }
    .context("Failed to load service registry")?;

    let registry = snapshot.to_registry();
    if ctx.is_json() {
        return print_json(&registry);
    }

    let rows: Vec<ServiceRow> = registry
        .services
        .values()
        .map(|service| {
            let overridden = service.overridden_count();
            ServiceRow {
                name: service.service_name.clone(),
                classes: service.classes.len(),
                methods: service.method_count(),
                overridden: color_behavior(&overridden.to_string(), overridden > 0),
            }
        })
        .collect();

    print_table(&rows, "No services discovered");
    print_summary(&snapshot);
    Ok(())
}

/// Show the runtime configuration of one service
pub async fn show_service(ctx: &CommandContext, service: &str) -> Result<()> {
    let detail = ctx
        .client
        .fetch_service_detail(service)
        .await
        .with_context(|| format!("Failed to fetch service {}", service))?;

    if ctx.is_json() {
        return print_json(&detail);
    }

    println!(
        "Service {} is {}, last seen {}",
        detail.runtime_config.service_name,
        color_status(&detail.status),
        format_timestamp(detail.last_seen)
    );
    if detail.modified {
        print_warning("Runtime configuration differs from the template");
    }

    print_table(&method_rows(&detail.runtime_config), "No methods configured");
    Ok(())
}

/// Reset a service to its template configuration
pub async fn reset_service(ctx: &CommandContext, service: &str) -> Result<()> {
    let store = ctx.store();
    store
        .load()
        .await
        .context("Failed to load service registry")?;

    let snapshot = store
        .reset_service(service)
        .await
        .with_context(|| format!("Failed to reset service {}", service))?;

    let config = snapshot.service(service);
    if ctx.is_json() {
        return print_json(&config);
    }

    print_success(&format!("Service {} reset to its template configuration", service));
    if let Some(config) = config {
        let remaining = config.overridden_count();
        if remaining > 0 {
            print_warning(&format!(
                "{} methods still differ from their default behavior",
                remaining
            ));
        }
    }
    Ok(())
}

/// Trigger discovery, wait for it to settle and reload the registry
pub async fn discover(ctx: &CommandContext, full: bool) -> Result<()> {
    let store = ctx.store();
    let scheduler = ctx.scheduler();

    if !ctx.is_json() {
        print_info(&format!(
            "Triggering {} discovery, registry reloads in {}s",
            if full { "full" } else { "quick" },
            ctx.config.discovery_delay().as_secs()
        ));
    }

    let summary = scheduler
        .full_discovery(&store, full)
        .await
        .context("Discovery failed")?;
    let snapshot = store.snapshot();

    if ctx.is_json() {
        return print_json(&json!({
            "discovery": summary,
            "registry": snapshot.to_registry(),
        }));
    }

    if summary.message.is_empty() {
        print_success(&format!("Discovery ({}) completed", summary.mode));
    } else {
        print_success(&summary.message);
    }
    print_summary(&snapshot);
    Ok(())
}
