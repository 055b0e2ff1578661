//! Registry store with optimistic behavior changes
//!
//! The store owns the only writable copy of the registry. Readers get
//! `Arc<RegistrySnapshot>` handles, either on demand or through a watch
//! subscription, and never observe a partially applied change.

use super::snapshot::RegistrySnapshot;
use crate::error::{ConsoleError, Result};
use crate::models::{BehaviorId, MethodPath};
use crate::observability::{ConsoleMetrics, StructuredLogger};
use crate::sync::ControlPlane;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

pub struct RegistryStore {
    client: Arc<dyn ControlPlane>,
    state: watch::Sender<Arc<RegistrySnapshot>>,
    /// Last load ticket handed out; loads apply only if newer than the
    /// ticket of the published snapshot
    tickets: AtomicU64,
    metrics: ConsoleMetrics,
    logger: StructuredLogger,
}

impl RegistryStore {
    pub fn new(client: Arc<dyn ControlPlane>, logger: StructuredLogger) -> Self {
        let (state, _) = watch::channel(Arc::new(RegistrySnapshot::default()));
        Self {
            client,
            state,
            tickets: AtomicU64::new(0),
            metrics: ConsoleMetrics::new(),
            logger,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<RegistrySnapshot>> {
        self.state.subscribe()
    }

    /// Replace the registry with the backend's current state
    ///
    /// A load whose response arrives after a later-issued load has already
    /// been applied is discarded. On failure the previous snapshot stays
    /// in place.
    pub async fn load(&self) -> Result<Arc<RegistrySnapshot>> {
        self.load_with(false).await
    }

    /// Like [`RegistryStore::load`], asking the backend to re-query its
    /// services first
    pub async fn refresh(&self) -> Result<Arc<RegistrySnapshot>> {
        self.load_with(true).await
    }

    async fn load_with(&self, refresh: bool) -> Result<Arc<RegistrySnapshot>> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let registry = self.client.fetch_registry(refresh).await?;

        let mut applied = None;
        self.state.send_if_modified(|current| {
            if ticket <= current.load_ticket() {
                return false;
            }
            let next = Arc::new(RegistrySnapshot::build(
                registry,
                current.revision() + 1,
                ticket,
            ));
            applied = Some(next.clone());
            *current = next;
            true
        });

        match applied {
            Some(snapshot) => {
                self.logger.log_registry_loaded(
                    snapshot.total_services(),
                    snapshot.unavailable_services(),
                    snapshot.revision(),
                );
                Ok(snapshot)
            }
            None => {
                self.metrics.inc_stale_results();
                debug!(ticket = ticket, "Discarded registry response superseded by a newer load");
                Ok(self.snapshot())
            }
        }
    }

    /// Switch a method's behavior, showing the change before the backend
    /// confirms it
    ///
    /// Unknown paths and behaviors outside the available set are refused
    /// before any request is sent. If the backend does not confirm, the
    /// registry is reloaded and [`ConsoleError::StaleState`] is returned.
    /// There is no local rollback: should the reload fail as well, the
    /// unconfirmed value stays visible until the next successful load.
    pub async fn apply_optimistic_behavior_change(
        &self,
        path: &MethodPath,
        behavior: BehaviorId,
    ) -> Result<()> {
        let previous = self.apply_local(path, &behavior)?;
        if previous == behavior {
            debug!(method = %path, behavior = %behavior, "Behavior already current");
        }

        match self.client.change_behavior(path, &behavior).await {
            Ok(()) => {
                self.logger.log_behavior_change(
                    &path.to_string(),
                    previous.as_str(),
                    behavior.as_str(),
                    true,
                );
                Ok(())
            }
            Err(err) => {
                self.logger.log_behavior_change(
                    &path.to_string(),
                    previous.as_str(),
                    behavior.as_str(),
                    false,
                );
                self.metrics.inc_optimistic_reloads();

                if let Err(reload_err) = self.load().await {
                    // The backend state is unknown; the unconfirmed value
                    // stays until the next successful load
                    warn!(
                        method = %path,
                        shown = %behavior,
                        error = %reload_err,
                        "Registry reload failed, behavior is unconfirmed"
                    );
                }

                Err(ConsoleError::StaleState {
                    path: path.clone(),
                    source: Box::new(err),
                })
            }
        }
    }

    /// Reset a service to its template configuration and reload
    pub async fn reset_service(&self, service: &str) -> Result<Arc<RegistrySnapshot>> {
        if !self.snapshot().contains_service(service) {
            return Err(ConsoleError::NotFound(format!("service {service}")));
        }

        let outcome = self.client.reset_service(service).await;
        self.logger.log_service_reset(service, outcome.is_ok());

        let reloaded = self.load().await;
        outcome?;
        reloaded
    }

    /// Apply a change locally under a fresh load ticket, so that loads
    /// issued before it cannot overwrite it
    fn apply_local(&self, path: &MethodPath, behavior: &BehaviorId) -> Result<BehaviorId> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let mut outcome = Err(ConsoleError::NotFound(path.to_string()));
        self.state
            .send_if_modified(|current| match current.with_behavior(path, behavior) {
                Ok((next, previous)) => {
                    *current = Arc::new(next.with_load_ticket(ticket));
                    outcome = Ok(previous);
                    true
                }
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            });
        outcome
    }
}
