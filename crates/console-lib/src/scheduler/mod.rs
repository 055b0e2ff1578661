//! Scheduling of metrics polling and discovery
//!
//! This module provides:
//! - [`PollScheduler`], which owns the recurring live-metrics refresh of
//!   the viewed service and publishes [`MetricsView`] snapshots
//! - The two-phase discovery flow (trigger, wait, reload)

mod poll;
mod view;


pub use poll::{PollScheduler, SchedulerConfig};
pub use view::MetricsView;
