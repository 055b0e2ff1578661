//! Client engine for the Marionette fault-injection control panel
//!
//! This crate provides the core functionality for:
//! - Talking to the control-panel backend over HTTP
//! - Keeping a local behavior registry with optimistic updates
//! - Normalizing and classifying service metrics
//! - Polling live metrics for the viewed service
//! - Configuration and observability

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod registry;
pub mod scheduler;
pub mod sync;

pub use config::{BehaviorEncoding, ConsoleConfig};
pub use error::{ConsoleError, Result};
pub use models::*;
pub use observability::{ConsoleMetrics, StructuredLogger};
pub use registry::{RegistrySnapshot, RegistryStore};
pub use scheduler::{MetricsView, PollScheduler, SchedulerConfig};
pub use sync::{ClientConfig, ControlPlane, RemoteSyncClient};
