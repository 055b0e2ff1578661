//! HTTP client for the control-panel backend
//!
//! This module provides:
//! - The [`ControlPlane`] seam used by the registry store and scheduler
//! - [`RemoteSyncClient`], its reqwest implementation
//! - Argument validation before anything reaches the network
//! - Per-operation request metrics and tracing

use super::payload::{decode_registry, decode_service_detail};
use crate::config::{BehaviorEncoding, ConsoleConfig};
use crate::error::{ConsoleError, Result};
use crate::models::{BehaviorId, ConfigRegistry, DiscoverySummary, MethodPath, ServiceDetail};
use crate::observability::ConsoleMetrics;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Remote operations the console performs against the backend
///
/// Metrics payloads are returned undecoded: their shape varies between
/// backend versions and is handled by the metrics pipeline, which never
/// fails.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch the whole registry. `refresh` asks the backend to re-query
    /// the services before answering.
    async fn fetch_registry(&self, refresh: bool) -> Result<ConfigRegistry>;

    async fn trigger_discovery(&self, full_refresh: bool) -> Result<DiscoverySummary>;

    /// Ask the backend to restore a service's template configuration
    async fn reset_service(&self, service: &str) -> Result<()>;

    async fn change_behavior(&self, path: &MethodPath, behavior: &BehaviorId) -> Result<()>;

    async fn fetch_historical_metrics(&self, service: &str, minutes: u32) -> Result<Value>;

    async fn fetch_live_metrics(&self, service: &str) -> Result<Value>;

    async fn fetch_service_detail(&self, service: &str) -> Result<ServiceDetail>;

    async fn fetch_method_metrics(&self, service: &str, method: &str, minutes: u32)
        -> Result<Value>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Resolved backend endpoint, e.g. `http://localhost:8080/api`
    pub base_url: Url,
    pub behavior_encoding: BehaviorEncoding,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            behavior_encoding: BehaviorEncoding::default(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Derive the client configuration, resolving the base URL once
    pub fn from_console(config: &ConsoleConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.resolve_base_url()?,
            behavior_encoding: config.behavior_encoding,
            request_timeout: config.request_timeout(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeBehaviorBody<'a> {
    class_name: &'a str,
    method_name: &'a str,
    behaviour_id: &'a str,
    new_behaviour_id: &'a str,
}

/// reqwest-backed [`ControlPlane`]
pub struct RemoteSyncClient {
    client: Client,
    config: ClientConfig,
    metrics: ConsoleMetrics,
}

impl RemoteSyncClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.base_url.cannot_be_a_base() {
            return Err(ConsoleError::Config(format!(
                "base url {} cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            metrics: ConsoleMetrics::new(),
        })
    }

    /// Build `{base}/{segments...}`, percent-encoding every segment
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConsoleError::Config(format!(
                    "base url {} cannot carry a path",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request, recording its outcome and mapping failures
    async fn execute(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let started = Instant::now();
        let result = request.send().await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Err(source) => {
                self.metrics.observe_sync(operation, false, elapsed);
                warn!(operation = operation, error = %source, "Backend request failed");
                Err(ConsoleError::Transport { operation, source })
            }
            Ok(response) if !response.status().is_success() => {
                let status = response.status().as_u16();
                self.metrics.observe_sync(operation, false, elapsed);
                warn!(operation = operation, status = status, "Backend returned an error status");
                Err(ConsoleError::Network { operation, status })
            }
            Ok(response) => {
                self.metrics.observe_sync(operation, true, elapsed);
                debug!(
                    operation = operation,
                    status = response.status().as_u16(),
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Backend request succeeded"
                );
                Ok(response)
            }
        }
    }

    async fn read_json(operation: &'static str, response: Response) -> Result<Value> {
        let body = response
            .bytes()
            .await
            .map_err(|source| ConsoleError::Transport { operation, source })?;

        serde_json::from_slice(&body).map_err(|e| ConsoleError::MalformedPayload {
            operation,
            reason: e.to_string(),
        })
    }

    async fn get_json(&self, operation: &'static str, request: RequestBuilder) -> Result<Value> {
        let response = self.execute(operation, request).await?;
        Self::read_json(operation, response).await
    }
}

#[async_trait]
impl ControlPlane for RemoteSyncClient {
    async fn fetch_registry(&self, refresh: bool) -> Result<ConfigRegistry> {
        const OP: &str = "fetch_registry";
        let url = self.endpoint(&["services"])?;
        let mut request = self.client.get(url);
        if refresh {
            request = request.query(&[("refresh", "true")]);
        }

        let payload = self.get_json(OP, request).await?;
        decode_registry(payload).map_err(|reason| ConsoleError::MalformedPayload {
            operation: OP,
            reason,
        })
    }

    async fn trigger_discovery(&self, full_refresh: bool) -> Result<DiscoverySummary> {
        const OP: &str = "trigger_discovery";
        let url = self.endpoint(&["services", "discover"])?;
        let request = self
            .client
            .post(url)
            .query(&[("fullRefresh", full_refresh.to_string())]);

        let response = self.execute(OP, request).await?;
        let body = response
            .text()
            .await
            .map_err(|source| ConsoleError::Transport {
                operation: OP,
                source,
            })?;

        // Older backends answer with a plain-text acknowledgement
        let summary = serde_json::from_str::<DiscoverySummary>(&body).unwrap_or_else(|_| {
            DiscoverySummary {
                message: body.trim().to_string(),
                mode: if full_refresh { "full" } else { "quick" }.to_string(),
                timestamp: None,
            }
        });
        Ok(summary)
    }

    async fn reset_service(&self, service: &str) -> Result<()> {
        require_non_empty("service", service)?;
        let url = self.endpoint(&["services", service, "reset"])?;
        self.execute("reset_service", self.client.post(url)).await?;
        Ok(())
    }

    async fn change_behavior(&self, path: &MethodPath, behavior: &BehaviorId) -> Result<()> {
        require_non_empty("service", &path.service)?;
        require_non_empty("class", &path.class)?;
        require_non_empty("method", &path.method)?;
        require_non_empty("behavior", behavior.as_str())?;

        let url = self.endpoint(&["services", &path.service, "changeBehaviour"])?;
        let request = match self.config.behavior_encoding {
            BehaviorEncoding::Query => self.client.put(url).query(&[
                ("className", path.class.as_str()),
                ("methodName", path.method.as_str()),
                ("behaviourId", behavior.as_str()),
            ]),
            BehaviorEncoding::JsonBody => self.client.put(url).json(&ChangeBehaviorBody {
                class_name: &path.class,
                method_name: &path.method,
                behaviour_id: behavior.as_str(),
                new_behaviour_id: behavior.as_str(),
            }),
        };

        self.execute("change_behavior", request).await?;
        Ok(())
    }

    async fn fetch_historical_metrics(&self, service: &str, minutes: u32) -> Result<Value> {
        require_non_empty("service", service)?;
        require_minutes(minutes)?;
        let url = self.endpoint(&["metrics", service])?;
        let request = self.client.get(url).query(&[("minutes", minutes)]);
        self.get_json("fetch_historical_metrics", request).await
    }

    async fn fetch_live_metrics(&self, service: &str) -> Result<Value> {
        require_non_empty("service", service)?;
        let url = self.endpoint(&["metrics", service, "live"])?;
        self.get_json("fetch_live_metrics", self.client.get(url))
            .await
    }

    async fn fetch_service_detail(&self, service: &str) -> Result<ServiceDetail> {
        const OP: &str = "fetch_service_detail";
        require_non_empty("service", service)?;
        let url = self.endpoint(&["services", service])?;

        let payload = match self.get_json(OP, self.client.get(url)).await {
            Err(ConsoleError::Network { status: 404, .. }) => {
                return Err(ConsoleError::NotFound(format!("service {service}")));
            }
            other => other?,
        };

        decode_service_detail(service, payload).map_err(|reason| ConsoleError::MalformedPayload {
            operation: OP,
            reason,
        })
    }

    async fn fetch_method_metrics(
        &self,
        service: &str,
        method: &str,
        minutes: u32,
    ) -> Result<Value> {
        require_non_empty("service", service)?;
        require_non_empty("method", method)?;
        require_minutes(minutes)?;
        let url = self.endpoint(&["metrics", service, "method", method])?;
        let request = self.client.get(url).query(&[("minutes", minutes)]);
        self.get_json("fetch_method_metrics", request).await
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConsoleError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

fn require_minutes(minutes: u32) -> Result<()> {
    if minutes == 0 {
        return Err(ConsoleError::InvalidArgument(
            "minutes must be a positive integer".to_string(),
        ));
    }
    Ok(())
}
