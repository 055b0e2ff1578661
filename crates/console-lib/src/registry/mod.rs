//! Behavior registry
//!
//! This module provides:
//! - Immutable, cheaply shared registry snapshots
//! - A store that loads the registry and applies optimistic behavior
//!   changes, falling back to an authoritative reload when the backend
//!   does not confirm them

mod snapshot;
mod store;


pub use snapshot::RegistrySnapshot;
pub use store::RegistryStore;
