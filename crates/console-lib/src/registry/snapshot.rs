//! Immutable registry snapshots
//!
//! A snapshot stores every method in a flat arena and keeps the
//! service/class/method hierarchy as name-to-index maps. Mutating one
//! method produces a new snapshot that shares the hierarchy and every other
//! method entry with its predecessor.

use crate::error::{ConsoleError, Result};
use crate::models::{
    BehaviorId, ClassConfig, ConfigRegistry, MethodConfig, MethodPath, ServiceConfig,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Layout {
    /// service -> class -> method -> arena index
    services: BTreeMap<String, BTreeMap<String, BTreeMap<String, usize>>>,
    /// Display names of classes, keyed by (service, class key)
    class_names: HashMap<(String, String), String>,
    index: HashMap<MethodPath, usize>,
    total_services: usize,
    unavailable_services: usize,
    last_discovery: Option<DateTime<Utc>>,
}

/// Point-in-time view of the behavior registry
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    revision: u64,
    load_ticket: u64,
    layout: Arc<Layout>,
    methods: Arc<Vec<Arc<MethodConfig>>>,
}

impl RegistrySnapshot {
    pub(crate) fn build(registry: ConfigRegistry, revision: u64, load_ticket: u64) -> Self {
        let mut layout = Layout {
            total_services: registry.services.len(),
            unavailable_services: registry.unavailable_services,
            last_discovery: registry.last_discovery,
            ..Default::default()
        };
        let mut methods = Vec::new();

        for (service_name, service) in registry.services {
            let mut classes = BTreeMap::new();
            for (class_key, class) in service.classes {
                let mut entries = BTreeMap::new();
                for (method_name, method) in class.methods {
                    let slot = methods.len();
                    methods.push(Arc::new(method));
                    layout.index.insert(
                        MethodPath::new(&service_name, &class_key, &method_name),
                        slot,
                    );
                    entries.insert(method_name, slot);
                }
                layout
                    .class_names
                    .insert((service_name.clone(), class_key.clone()), class.class_name);
                classes.insert(class_key, entries);
            }
            layout.services.insert(service_name, classes);
        }

        Self {
            revision,
            load_ticket,
            layout: Arc::new(layout),
            methods: Arc::new(methods),
        }
    }

    /// Monotonic counter, bumped by every published change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn load_ticket(&self) -> u64 {
        self.load_ticket
    }

    pub fn is_empty(&self) -> bool {
        self.layout.services.is_empty()
    }

    pub fn total_services(&self) -> usize {
        self.layout.total_services
    }

    pub fn unavailable_services(&self) -> usize {
        self.layout.unavailable_services
    }

    pub fn last_discovery(&self) -> Option<DateTime<Utc>> {
        self.layout.last_discovery
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.layout.services.keys().map(String::as_str)
    }

    pub fn contains_service(&self, service: &str) -> bool {
        self.layout.services.contains_key(service)
    }

    pub fn method(&self, path: &MethodPath) -> Option<&MethodConfig> {
        self.layout
            .index
            .get(path)
            .map(|slot| self.methods[*slot].as_ref())
    }

    /// Resolve a path to its arena slot, naming the first missing level
    fn locate(&self, path: &MethodPath) -> Result<usize> {
        let classes = self
            .layout
            .services
            .get(&path.service)
            .ok_or_else(|| ConsoleError::NotFound(format!("service {}", path.service)))?;
        let methods = classes.get(&path.class).ok_or_else(|| {
            ConsoleError::NotFound(format!("class {}/{}", path.service, path.class))
        })?;
        methods
            .get(&path.method)
            .copied()
            .ok_or_else(|| ConsoleError::NotFound(format!("method {path}")))
    }

    /// New snapshot with `behavior` as the current behavior of `path`
    ///
    /// Returns the snapshot and the behavior it replaced. Only the touched
    /// arena entry is reallocated.
    pub(crate) fn with_behavior(
        &self,
        path: &MethodPath,
        behavior: &BehaviorId,
    ) -> Result<(Self, BehaviorId)> {
        let slot = self.locate(path)?;
        let mut updated = MethodConfig::clone(&self.methods[slot]);
        let previous = updated.set_current(behavior.clone()).ok_or_else(|| {
            ConsoleError::InvalidBehavior {
                path: path.clone(),
                behavior: behavior.to_string(),
            }
        })?;

        let mut methods = Vec::clone(&self.methods);
        methods[slot] = Arc::new(updated);

        Ok((
            Self {
                revision: self.revision + 1,
                load_ticket: self.load_ticket,
                layout: self.layout.clone(),
                methods: Arc::new(methods),
            },
            previous,
        ))
    }

    /// Same snapshot, stamped with the ticket of the change that produced it
    pub(crate) fn with_load_ticket(mut self, load_ticket: u64) -> Self {
        self.load_ticket = load_ticket;
        self
    }

    /// Materialize one service as a nested config
    pub fn service(&self, service: &str) -> Option<ServiceConfig> {
        let classes = self.layout.services.get(service)?;
        Some(ServiceConfig {
            service_name: service.to_string(),
            classes: classes
                .iter()
                .map(|(class_key, methods)| {
                    let class_name = self
                        .layout
                        .class_names
                        .get(&(service.to_string(), class_key.clone()))
                        .cloned()
                        .unwrap_or_else(|| class_key.clone());
                    let methods = methods
                        .iter()
                        .map(|(name, slot)| (name.clone(), MethodConfig::clone(&self.methods[*slot])))
                        .collect();
                    (
                        class_key.clone(),
                        ClassConfig {
                            class_name,
                            methods,
                        },
                    )
                })
                .collect(),
        })
    }

    /// Materialize the whole registry
    pub fn to_registry(&self) -> ConfigRegistry {
        ConfigRegistry {
            services: self
                .service_names()
                .filter_map(|name| self.service(name).map(|s| (name.to_string(), s)))
                .collect(),
            total_services: self.layout.total_services,
            unavailable_services: self.layout.unavailable_services,
            last_discovery: self.layout.last_discovery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fake::orders_registry;

    fn place_order() -> MethodPath {
        MethodPath::new("orders", "OrderController", "placeOrder")
    }

    #[test]
    fn test_build_indexes_every_method() {
        let snapshot = RegistrySnapshot::build(orders_registry("SLOW"), 1, 1);
        assert_eq!(snapshot.total_services(), 1);
        assert!(snapshot.contains_service("orders"));
        assert_eq!(snapshot.method(&place_order()).unwrap().current().as_str(), "SLOW");
    }

    #[test]
    fn test_with_behavior_shares_untouched_state() {
        let snapshot = RegistrySnapshot::build(orders_registry("NORMAL"), 1, 1);
        let (next, previous) = snapshot
            .with_behavior(&place_order(), &BehaviorId::from("ERROR"))
            .unwrap();

        assert_eq!(previous.as_str(), "NORMAL");
        assert_eq!(next.revision(), 2);
        assert!(Arc::ptr_eq(&snapshot.layout, &next.layout));
        assert_eq!(snapshot.method(&place_order()).unwrap().current().as_str(), "NORMAL");
        assert_eq!(next.method(&place_order()).unwrap().current().as_str(), "ERROR");
    }

    #[test]
    fn test_locate_names_missing_level() {
        let snapshot = RegistrySnapshot::build(orders_registry("NORMAL"), 1, 1);
        let err = snapshot
            .with_behavior(
                &MethodPath::new("orders", "PaymentController", "pay"),
                &BehaviorId::from("SLOW"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("class orders/PaymentController"));
    }

    #[test]
    fn test_materialized_registry_matches_input() {
        let registry = orders_registry("TIMEOUT");
        let snapshot = RegistrySnapshot::build(registry.clone(), 3, 2);
        assert_eq!(snapshot.to_registry(), registry);
    }
}
