//! Core data models for the behavior registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a runtime behavior mode (NORMAL, SLOW, ERROR, TIMEOUT, ...)
///
/// The set is open: the backend may introduce new identifiers at any time,
/// so this is a string newtype rather than an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorId(String);

impl BehaviorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BehaviorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BehaviorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Stable key of a method entity: (service, class, method)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodPath {
    pub service: String,
    pub class: String,
    pub method: String,
}

impl MethodPath {
    pub fn new(
        service: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            class: class.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.class, self.method)
    }
}

/// Behavior configuration of a single method
///
/// Both the current and the default behavior are always members of
/// `available`. The fields are private so that the only way to change the
/// current behavior is [`MethodConfig::set_current`], which refuses
/// identifiers outside the available set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodConfig {
    method_name: String,
    #[serde(rename = "currentBehaviourId")]
    current: BehaviorId,
    #[serde(rename = "defaultBehaviourId")]
    default: BehaviorId,
    #[serde(rename = "availableBehaviourIds")]
    available: Vec<BehaviorId>,
}

impl MethodConfig {
    /// Build a method config, rejecting it if the membership invariant does
    /// not hold. Duplicate entries in `available` are collapsed, keeping the
    /// first occurrence.
    pub fn new(
        method_name: impl Into<String>,
        current: BehaviorId,
        default: BehaviorId,
        available: Vec<BehaviorId>,
    ) -> Result<Self, String> {
        let method_name = method_name.into();
        let mut unique: Vec<BehaviorId> = Vec::with_capacity(available.len());
        for id in available {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        if !unique.contains(&current) {
            return Err(format!(
                "method {method_name}: current behavior {current} is not in the available set"
            ));
        }
        if !unique.contains(&default) {
            return Err(format!(
                "method {method_name}: default behavior {default} is not in the available set"
            ));
        }

        Ok(Self {
            method_name,
            current,
            default,
            available: unique,
        })
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn current(&self) -> &BehaviorId {
        &self.current
    }

    pub fn default_behavior(&self) -> &BehaviorId {
        &self.default
    }

    pub fn available(&self) -> &[BehaviorId] {
        &self.available
    }

    pub fn supports(&self, behavior: &BehaviorId) -> bool {
        self.available.contains(behavior)
    }

    /// True when the method runs something other than its default behavior
    pub fn is_overridden(&self) -> bool {
        self.current != self.default
    }

    /// Switch the current behavior. Returns the previous value, or `None`
    /// (leaving the config untouched) if `behavior` is not available.
    pub fn set_current(&mut self, behavior: BehaviorId) -> Option<BehaviorId> {
        if !self.supports(&behavior) {
            return None;
        }
        Some(std::mem::replace(&mut self.current, behavior))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassConfig {
    pub class_name: String,
    pub methods: BTreeMap<String, MethodConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub service_name: String,
    pub classes: BTreeMap<String, ClassConfig>,
}

impl ServiceConfig {
    /// Iterate over every method of the service with its class name
    pub fn methods(&self) -> impl Iterator<Item = (&str, &MethodConfig)> {
        self.classes.values().flat_map(|class| {
            class
                .methods
                .values()
                .map(move |method| (class.class_name.as_str(), method))
        })
    }

    pub fn method_count(&self) -> usize {
        self.classes.values().map(|c| c.methods.len()).sum()
    }

    pub fn overridden_count(&self) -> usize {
        self.methods().filter(|(_, m)| m.is_overridden()).count()
    }
}

/// Full tree of services -> classes -> methods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRegistry {
    pub services: BTreeMap<String, ServiceConfig>,
    pub total_services: usize,
    pub unavailable_services: usize,
    pub last_discovery: Option<DateTime<Utc>>,
}

impl ConfigRegistry {
    pub fn method(&self, path: &MethodPath) -> Option<&MethodConfig> {
        self.services
            .get(&path.service)?
            .classes
            .get(&path.class)?
            .methods
            .get(&path.method)
    }
}

/// Acknowledgement of a discovery request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySummary {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default, deserialize_with = "flexible_instant")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Runtime and template configuration of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    pub runtime_config: ServiceConfig,
    pub template_config: Option<ServiceConfig>,
    pub modified: bool,
    pub status: String,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Deserialize an instant sent either as an RFC 3339 string or as epoch
/// seconds (fractional part allowed). Unparseable values become `None`.
pub(crate) fn flexible_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_instant))
}

pub(crate) fn parse_instant(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => {
            let secs = n.as_f64()?;
            if !secs.is_finite() {
                return None;
            }
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
            DateTime::from_timestamp(whole, nanos.min(999_999_999))
        }
        _ => None,
    }
}
