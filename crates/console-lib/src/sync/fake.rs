//! Scripted in-memory [`ControlPlane`] for store and scheduler tests

use super::ControlPlane;
use crate::error::{ConsoleError, Result};
use crate::models::{
    BehaviorId, ClassConfig, ConfigRegistry, DiscoverySummary, MethodConfig, MethodPath,
    ServiceConfig, ServiceDetail,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One recorded call: operation name and the service it targeted
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub operation: &'static str,
    pub service: String,
}

#[derive(Default)]
struct Script {
    /// Served in order; the last entry is repeated once the queue drains
    registries: VecDeque<std::result::Result<ConfigRegistry, u16>>,
    last_registry: ConfigRegistry,
    registry_delays: VecDeque<Duration>,
    change_status: Option<u16>,
    reset_status: Option<u16>,
    historical: HashMap<String, Value>,
    live: HashMap<String, Value>,
    historical_delay: HashMap<String, Duration>,
    live_delay: HashMap<String, Duration>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub(crate) struct FakeControlPlane {
    script: Mutex<Script>,
    change_gate: Mutex<Option<Arc<Notify>>>,
    pub change_entered: Notify,
}

impl FakeControlPlane {
    pub fn new(registry: ConfigRegistry) -> Self {
        let fake = Self::default();
        fake.script.lock().unwrap().last_registry = registry;
        fake
    }

    /// Queue registry responses; `Err(status)` answers with that status
    pub fn push_registry(&self, response: std::result::Result<ConfigRegistry, u16>) {
        self.script.lock().unwrap().registries.push_back(response);
    }

    /// Delay the next registry fetches, one entry per fetch
    pub fn push_registry_delay(&self, delay: Duration) {
        self.script.lock().unwrap().registry_delays.push_back(delay);
    }

    pub fn fail_changes_with(&self, status: u16) {
        self.script.lock().unwrap().change_status = Some(status);
    }

    pub fn fail_resets_with(&self, status: u16) {
        self.script.lock().unwrap().reset_status = Some(status);
    }

    /// Hold every change request until the returned handle is notified
    pub fn gate_changes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.change_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_historical(&self, service: &str, payload: Value) {
        self.script
            .lock()
            .unwrap()
            .historical
            .insert(service.to_string(), payload);
    }

    pub fn set_live(&self, service: &str, payload: Value) {
        self.script
            .lock()
            .unwrap()
            .live
            .insert(service.to_string(), payload);
    }

    pub fn delay_historical(&self, service: &str, delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .historical_delay
            .insert(service.to_string(), delay);
    }

    pub fn delay_live(&self, service: &str, delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .live_delay
            .insert(service.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: &str, service: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.operation == operation && c.service == service)
            .count()
    }

    fn record(&self, operation: &'static str, service: &str) {
        self.script.lock().unwrap().calls.push(Call {
            operation,
            service: service.to_string(),
        });
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn fetch_registry(&self, _refresh: bool) -> Result<ConfigRegistry> {
        self.record("fetch_registry", "");
        let (delay, response) = {
            let mut script = self.script.lock().unwrap();
            let delay = script.registry_delays.pop_front();
            let response = match script.registries.pop_front() {
                Some(Ok(registry)) => {
                    script.last_registry = registry.clone();
                    Ok(registry)
                }
                Some(Err(status)) => Err(status),
                None => Ok(script.last_registry.clone()),
            };
            (delay, response)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response.map_err(|status| ConsoleError::Network {
            operation: "fetch_registry",
            status,
        })
    }

    async fn trigger_discovery(&self, full_refresh: bool) -> Result<DiscoverySummary> {
        self.record("trigger_discovery", "");
        Ok(DiscoverySummary {
            message: "Discovery started".to_string(),
            mode: if full_refresh { "full" } else { "quick" }.to_string(),
            timestamp: None,
        })
    }

    async fn reset_service(&self, service: &str) -> Result<()> {
        self.record("reset_service", service);
        match self.script.lock().unwrap().reset_status {
            Some(status) => Err(ConsoleError::Network {
                operation: "reset_service",
                status,
            }),
            None => Ok(()),
        }
    }

    async fn change_behavior(&self, path: &MethodPath, _behavior: &BehaviorId) -> Result<()> {
        self.record("change_behavior", &path.service);
        self.change_entered.notify_one();

        let gate = self.change_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.script.lock().unwrap().change_status {
            Some(status) => Err(ConsoleError::Network {
                operation: "change_behavior",
                status,
            }),
            None => Ok(()),
        }
    }

    async fn fetch_historical_metrics(&self, service: &str, _minutes: u32) -> Result<Value> {
        self.record("fetch_historical_metrics", service);
        let (delay, payload) = {
            let script = self.script.lock().unwrap();
            (
                script.historical_delay.get(service).copied(),
                script.historical.get(service).cloned(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        payload.ok_or(ConsoleError::Network {
            operation: "fetch_historical_metrics",
            status: 404,
        })
    }

    async fn fetch_live_metrics(&self, service: &str) -> Result<Value> {
        self.record("fetch_live_metrics", service);
        let (delay, payload) = {
            let script = self.script.lock().unwrap();
            (
                script.live_delay.get(service).copied(),
                script.live.get(service).cloned(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        payload.ok_or(ConsoleError::Network {
            operation: "fetch_live_metrics",
            status: 404,
        })
    }

    async fn fetch_service_detail(&self, service: &str) -> Result<ServiceDetail> {
        self.record("fetch_service_detail", service);
        let script = self.script.lock().unwrap();
        let runtime = script
            .last_registry
            .services
            .get(service)
            .cloned()
            .ok_or_else(|| ConsoleError::NotFound(format!("service {service}")))?;
        Ok(ServiceDetail {
            modified: runtime.overridden_count() > 0,
            runtime_config: runtime,
            template_config: None,
            status: "AVAILABLE".to_string(),
            last_seen: None,
        })
    }

    async fn fetch_method_metrics(
        &self,
        service: &str,
        _method: &str,
        _minutes: u32,
    ) -> Result<Value> {
        self.record("fetch_method_metrics", service);
        Ok(Value::Object(Default::default()))
    }
}

/// Registry with one service holding one method
pub(crate) fn registry_with(
    service: &str,
    class: &str,
    method: &str,
    current: &str,
    available: &[&str],
) -> ConfigRegistry {
    let config = MethodConfig::new(
        method,
        BehaviorId::from(current),
        BehaviorId::from(available[0]),
        available.iter().map(|id| BehaviorId::from(*id)).collect(),
    )
    .unwrap();

    let mut methods = BTreeMap::new();
    methods.insert(method.to_string(), config);
    let mut classes = BTreeMap::new();
    classes.insert(
        class.to_string(),
        ClassConfig {
            class_name: class.to_string(),
            methods,
        },
    );
    let mut services = BTreeMap::new();
    services.insert(
        service.to_string(),
        ServiceConfig {
            service_name: service.to_string(),
            classes,
        },
    );

    ConfigRegistry {
        services,
        total_services: 1,
        unavailable_services: 0,
        last_discovery: None,
    }
}

/// The `orders/OrderController/placeOrder` registry used across tests
pub(crate) fn orders_registry(current: &str) -> ConfigRegistry {
    registry_with(
        "orders",
        "OrderController",
        "placeOrder",
        current,
        &["NORMAL", "SLOW", "ERROR", "TIMEOUT"],
    )
}
