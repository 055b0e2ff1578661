//! Behavior change command

use anyhow::{Context, Result};
use serde_json::json;

use super::CommandContext;
use crate::output::{color_behavior, print_json, print_success, print_warning};
use console_lib::{BehaviorId, ConsoleError, MethodPath};

/// Switch one method to another behavior
///
/// The change shows up locally before the backend confirms it. When the
/// backend refuses, the reloaded value is printed and the command fails.
pub async fn set_behavior(
    ctx: &CommandContext,
    service: &str,
    class: &str,
    method: &str,
    behavior: &str,
) -> Result<()> {
    let store = ctx.store();
    store
        .load()
        .await
        .context("Failed to load service registry")?;

    let path = MethodPath::new(service, class, method);
    let requested = BehaviorId::from(behavior);
    let previous = store
        .snapshot()
        .method(&path)
        .map(|m| m.current().clone());

    let outcome = store
        .apply_optimistic_behavior_change(&path, requested.clone())
        .await;

    let snapshot = store.snapshot();
    let shown = snapshot.method(&path);

    if let Err(ConsoleError::InvalidBehavior { .. }) = &outcome {
        if let Some(config) = shown {
            let available: Vec<&str> = config.available().iter().map(|b| b.as_str()).collect();
            print_warning(&format!("Available behaviors: {}", available.join(", ")));
        }
    }
    if let Err(ConsoleError::StaleState { .. }) = &outcome {
        if let Some(config) = shown {
            print_warning(&format!(
                "{} was not changed, backend reports {}",
                path,
                color_behavior(config.current().as_str(), config.is_overridden())
            ));
        }
    }
    outcome.with_context(|| format!("Failed to set {} to {}", path, requested))?;

    if ctx.is_json() {
        return print_json(&json!({
            "service": path.service,
            "class": path.class,
            "method": path.method,
            "previous": previous,
            "current": shown.map(|m| m.current()),
        }));
    }

    match previous {
        Some(previous) if previous == requested => {
            print_success(&format!("{} already uses {}", path, requested));
        }
        Some(previous) => {
            print_success(&format!("{}: {} -> {}", path, previous, requested));
        }
        None => print_success(&format!("{} set to {}", path, requested)),
    }
    Ok(())
}
