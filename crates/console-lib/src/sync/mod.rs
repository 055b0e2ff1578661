//! Synchronization with the control-panel backend
//!
//! This module provides:
//! - The [`ControlPlane`] trait describing every remote operation
//! - An HTTP implementation built on reqwest
//! - Decoding of the registry wire shapes into the domain model

mod client;
mod payload;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ClientConfig, ControlPlane, RemoteSyncClient};
