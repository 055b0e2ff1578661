//! Poll scheduler for the metrics view
//!
//! Entering a view fetches historical and live metrics once, in parallel,
//! then refreshes the live values on a fixed period until the view changes
//! or is left. Every session has a generation number and every fetch a
//! sequence number; a result is published only if its session is still the
//! current one and nothing newer of the same kind was published before it.

use super::view::MetricsView;
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::metrics::{build_snapshot, ingest_historical};
use crate::models::DiscoverySummary;
use crate::observability::{ConsoleMetrics, StructuredLogger};
use crate::registry::RegistryStore;
use crate::sync::ControlPlane;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the poll scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Live metrics refresh period (default: 30 seconds)
    pub live_interval: Duration,
    /// Wait between triggering discovery and reloading the registry
    /// (default: 5 seconds)
    pub discovery_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            live_interval: Duration::from_secs(30),
            discovery_delay: Duration::from_secs(5),
        }
    }
}

impl SchedulerConfig {
    pub fn from_console(config: &ConsoleConfig) -> Self {
        Self {
            live_interval: config.live_poll_interval(),
            discovery_delay: config.discovery_delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionKey {
    service: String,
    minutes: u32,
    generation: u64,
}

#[derive(Clone, Copy)]
enum FetchKind {
    Historical,
    Live,
}

/// Clears the in-flight flag when the fetch completes or is dropped
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Fetch-and-publish logic shared by the session task and manual refreshes
#[derive(Clone)]
struct Fetcher {
    client: Arc<dyn ControlPlane>,
    view: Arc<watch::Sender<Arc<MetricsView>>>,
    sequence: Arc<AtomicU64>,
    metrics: ConsoleMetrics,
}

impl Fetcher {
    async fn fetch_all(&self, key: &SessionKey, live_in_flight: &AtomicBool) {
        tokio::join!(
            self.fetch_historical(key),
            self.fetch_live(key, live_in_flight)
        );
    }

    async fn fetch_historical(&self, key: &SessionKey) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self
            .client
            .fetch_historical_metrics(&key.service, key.minutes)
            .await;

        self.publish(key, FetchKind::Historical, seq, |view| {
            match result {
                Ok(payload) => {
                    view.metrics = ingest_historical(&payload);
                    view.historical_error = None;
                }
                Err(err) => view.historical_error = Some(err.to_string()),
            }
            view.loading = false;
        });
    }

    async fn fetch_live(&self, key: &SessionKey, in_flight: &AtomicBool) {
        let Some(_guard) = InFlight::acquire(in_flight) else {
            debug!(service = %key.service, "Live fetch still in flight, skipping");
            return;
        };

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.client.fetch_live_metrics(&key.service).await;

        self.publish(key, FetchKind::Live, seq, |view| match result {
            Ok(payload) => {
                view.live = build_snapshot(&payload);
                view.live_error = None;
            }
            Err(err) => view.live_error = Some(err.to_string()),
        });
    }

    fn publish(
        &self,
        key: &SessionKey,
        kind: FetchKind,
        seq: u64,
        apply: impl FnOnce(&mut MetricsView),
    ) {
        let published = self.view.send_if_modified(|current| {
            let last_seq = match kind {
                FetchKind::Historical => current.historical_seq,
                FetchKind::Live => current.live_seq,
            };
            if current.generation != key.generation || seq <= last_seq {
                return false;
            }

            let mut next = MetricsView::clone(current);
            match kind {
                FetchKind::Historical => next.historical_seq = seq,
                FetchKind::Live => next.live_seq = seq,
            }
            apply(&mut next);
            next.updated_at = Some(Utc::now());
            *current = Arc::new(next);
            true
        });

        if !published {
            self.metrics.inc_stale_results();
            debug!(
                service = %key.service,
                generation = key.generation,
                sequence = seq,
                "Discarded superseded metrics result"
            );
        }
    }
}

/// A running view session
struct Session {
    key: SessionKey,
    live_in_flight: Arc<AtomicBool>,
    shutdown: broadcast::Sender<()>,
    _handle: JoinHandle<()>,
}

impl Session {
    fn stop(self) {
        // A send error means the task is already gone
        let _ = self.shutdown.send(());
    }
}

pub struct PollScheduler {
    fetcher: Fetcher,
    config: SchedulerConfig,
    generation: AtomicU64,
    session: Mutex<Option<Session>>,
    logger: StructuredLogger,
}

impl PollScheduler {
    pub fn new(
        client: Arc<dyn ControlPlane>,
        config: SchedulerConfig,
        logger: StructuredLogger,
    ) -> Self {
        let (view, _) = watch::channel(Arc::new(MetricsView::default()));
        Self {
            fetcher: Fetcher {
                client,
                view: Arc::new(view),
                sequence: Arc::new(AtomicU64::new(0)),
                metrics: ConsoleMetrics::new(),
            },
            config,
            generation: AtomicU64::new(0),
            session: Mutex::new(None),
            logger,
        }
    }

    /// Latest published view
    pub fn current(&self) -> Arc<MetricsView> {
        self.fetcher.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<MetricsView>> {
        self.fetcher.view.subscribe()
    }

    /// Show `service` over the last `minutes`
    ///
    /// Stops the polling of any previous view and starts a new session.
    /// Re-entering the view already shown is a no-op. Must be called from
    /// within a tokio runtime.
    pub fn view(&self, service: &str, minutes: u32) -> Result<()> {
        if service.trim().is_empty() {
            return Err(ConsoleError::InvalidArgument(
                "service must not be empty".to_string(),
            ));
        }
        if minutes == 0 {
            return Err(ConsoleError::InvalidArgument(
                "minutes must be a positive integer".to_string(),
            ));
        }

        let mut slot = self.lock_session();
        if let Some(active) = slot.as_ref() {
            if active.key.service == service && active.key.minutes == minutes {
                return Ok(());
            }
        }
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.fetcher
            .view
            .send_replace(Arc::new(MetricsView::loading(service, minutes, generation)));

        let key = SessionKey {
            service: service.to_string(),
            minutes,
            generation,
        };
        let live_in_flight = Arc::new(AtomicBool::new(false));
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_session(
            self.fetcher.clone(),
            key.clone(),
            live_in_flight.clone(),
            self.config.live_interval,
            shutdown_rx,
        ));

        *slot = Some(Session {
            key,
            live_in_flight,
            shutdown,
            _handle: handle,
        });
        self.logger
            .log_view_change(Some(service), Some(minutes), generation);
        Ok(())
    }

    /// Stop polling and clear the view
    pub fn leave(&self) {
        let mut slot = self.lock_session();
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.fetcher
            .view
            .send_replace(Arc::new(MetricsView::idle(generation)));
        self.logger.log_view_change(None, None, generation);
    }

    /// Re-fetch historical and live metrics of the current view
    ///
    /// The live part is skipped if a live fetch is already outstanding.
    pub async fn refresh(&self) {
        let active = self
            .lock_session()
            .as_ref()
            .map(|s| (s.key.clone(), s.live_in_flight.clone()));

        match active {
            Some((key, live_in_flight)) => self.fetcher.fetch_all(&key, &live_in_flight).await,
            None => debug!("No metrics view to refresh"),
        }
    }

    /// Trigger discovery, wait the configured delay, then reload the
    /// registry once
    pub async fn full_discovery(
        &self,
        store: &RegistryStore,
        full_refresh: bool,
    ) -> Result<DiscoverySummary> {
        let summary = self.fetcher.client.trigger_discovery(full_refresh).await?;
        self.logger.log_discovery(full_refresh, &summary.message);

        tokio::time::sleep(self.config.discovery_delay).await;
        store.load().await?;
        Ok(summary)
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(session) = self.lock_session().take() {
            session.stop();
        }
    }
}

async fn run_session(
    fetcher: Fetcher,
    key: SessionKey,
    live_in_flight: Arc<AtomicBool>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(
        service = %key.service,
        minutes = key.minutes,
        generation = key.generation,
        interval_secs = period.as_secs(),
        "Starting metrics polling"
    );

    tokio::select! {
        biased;
        _ = shutdown.recv() => {
            debug!(service = %key.service, "View left before initial fetch completed");
            return;
        }
        _ = fetcher.fetch_all(&key, &live_in_flight) => {}
    }

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                fetcher.metrics.inc_poll_ticks();
                let stopped = tokio::select! {
                    biased;
                    _ = shutdown.recv() => true,
                    _ = fetcher.fetch_live(&key, &live_in_flight) => false,
                };
                if stopped {
                    break;
                }
            }
        }
    }

    info!(
        service = %key.service,
        generation = key.generation,
        "Stopped metrics polling"
    );
}
