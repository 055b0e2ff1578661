//! Wire shapes of the registry endpoints and their conversion into the
//! validated domain model
//!
//! Three registry shapes have been served by the backend over time:
//! an envelope with discovery metadata, a list of service configs, and a
//! bare service map. All of them decode into the same [`ConfigRegistry`].

use crate::models::{
    parse_instant, BehaviorId, ClassConfig, ConfigRegistry, MethodConfig, ServiceConfig,
    ServiceDetail,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MethodDto {
    #[serde(default)]
    method_name: Option<String>,
    default_behaviour_id: String,
    current_behaviour_id: String,
    #[serde(default)]
    available_behaviour_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassMapDto {
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    methods: BTreeMap<String, MethodDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceMapDto {
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    classes: BTreeMap<String, ClassMapDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDto {
    services: BTreeMap<String, ServiceMapDto>,
    #[serde(default)]
    last_discovery: Option<Value>,
    #[serde(default)]
    total_services: Option<usize>,
    #[serde(default)]
    unavailable_services: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceListDto {
    service_name: String,
    #[serde(default)]
    class_configs: Vec<ClassListDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassListDto {
    class_name: String,
    #[serde(default)]
    method_configs: Vec<MethodDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDto {
    service_configs: Vec<ServiceListDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceDetailDto {
    runtime_config: ServiceMapDto,
    #[serde(default)]
    template_config: Option<ServiceMapDto>,
    #[serde(default, alias = "isModified")]
    modified: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    last_seen: Option<Value>,
}

/// Decode a registry payload of any known shape
pub(crate) fn decode_registry(payload: Value) -> Result<ConfigRegistry, String> {
    let Value::Object(map) = &payload else {
        return Err(format!("expected a JSON object, got {}", kind_of(&payload)));
    };

    if map.contains_key("services") {
        let envelope: EnvelopeDto =
            serde_json::from_value(payload).map_err(|e| format!("services envelope: {e}"))?;
        let services = convert_service_map(envelope.services)?;
        if let Some(reported) = envelope.total_services {
            if reported != services.len() {
                warn!(
                    reported = reported,
                    decoded = services.len(),
                    "Backend service count disagrees with the decoded registry"
                );
            }
        }
        return Ok(ConfigRegistry {
            total_services: services.len(),
            services,
            unavailable_services: envelope.unavailable_services.unwrap_or(0),
            last_discovery: envelope.last_discovery.as_ref().and_then(parse_instant),
        });
    }

    if map.contains_key("serviceConfigs") {
        let list: ListDto =
            serde_json::from_value(payload).map_err(|e| format!("service config list: {e}"))?;
        let mut services = BTreeMap::new();
        for service in list.service_configs {
            let mut classes = BTreeMap::new();
            for class in service.class_configs {
                let mut methods = BTreeMap::new();
                for dto in class.method_configs {
                    let name = dto
                        .method_name
                        .clone()
                        .ok_or_else(|| format!("{}/{}: method without name", service.service_name, class.class_name))?;
                    methods.insert(name.clone(), convert_method(&name, dto)?);
                }
                classes.insert(
                    class.class_name.clone(),
                    ClassConfig {
                        class_name: class.class_name,
                        methods,
                    },
                );
            }
            services.insert(
                service.service_name.clone(),
                ServiceConfig {
                    service_name: service.service_name,
                    classes,
                },
            );
        }
        return Ok(ConfigRegistry {
            total_services: services.len(),
            services,
            unavailable_services: 0,
            last_discovery: None,
        });
    }

    let bare: BTreeMap<String, ServiceMapDto> =
        serde_json::from_value(payload).map_err(|e| format!("service map: {e}"))?;
    let services = convert_service_map(bare)?;
    Ok(ConfigRegistry {
        total_services: services.len(),
        services,
        unavailable_services: 0,
        last_discovery: None,
    })
}

/// Decode the single-service detail payload
pub(crate) fn decode_service_detail(name: &str, payload: Value) -> Result<ServiceDetail, String> {
    let dto: ServiceDetailDto =
        serde_json::from_value(payload).map_err(|e| format!("service detail: {e}"))?;

    Ok(ServiceDetail {
        runtime_config: convert_service(name, dto.runtime_config)?,
        template_config: dto
            .template_config
            .map(|template| convert_service(name, template))
            .transpose()?,
        modified: dto.modified,
        status: dto.status.unwrap_or_else(|| "UNKNOWN".to_string()),
        last_seen: dto.last_seen.as_ref().and_then(parse_instant),
    })
}

fn convert_service_map(
    services: BTreeMap<String, ServiceMapDto>,
) -> Result<BTreeMap<String, ServiceConfig>, String> {
    services
        .into_iter()
        .map(|(name, dto)| {
            let service = convert_service(&name, dto)?;
            Ok((name, service))
        })
        .collect()
}

// Map keys are the identity; embedded names are informational only.
fn convert_service(name: &str, dto: ServiceMapDto) -> Result<ServiceConfig, String> {
    if let Some(embedded) = dto.service_name.as_deref() {
        if embedded != name {
            warn!(key = %name, embedded = %embedded, "Service name differs from its map key");
        }
    }

    let mut classes = BTreeMap::new();
    for (class_name, class) in dto.classes {
        let mut methods = BTreeMap::new();
        for (method_name, method) in class.methods {
            let config = convert_method(&method_name, method)
                .map_err(|e| format!("{name}/{class_name}: {e}"))?;
            methods.insert(method_name, config);
        }
        classes.insert(
            class_name.clone(),
            ClassConfig {
                class_name: class.class_name.unwrap_or(class_name),
                methods,
            },
        );
    }

    Ok(ServiceConfig {
        service_name: name.to_string(),
        classes,
    })
}

fn convert_method(name: &str, dto: MethodDto) -> Result<MethodConfig, String> {
    MethodConfig::new(
        name,
        BehaviorId::from(dto.current_behaviour_id),
        BehaviorId::from(dto.default_behaviour_id),
        dto.available_behaviour_ids
            .into_iter()
            .map(BehaviorId::from)
            .collect(),
    )
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MethodPath;
    use serde_json::json;

    fn method_json(current: &str) -> Value {
        json!({
            "methodName": "placeOrder",
            "defaultBehaviourId": "NORMAL",
            "currentBehaviourId": current,
            "availableBehaviourIds": ["NORMAL", "SLOW", "ERROR", "TIMEOUT"]
        })
    }

    fn path() -> MethodPath {
        MethodPath::new("orders", "OrderController", "placeOrder")
    }

    #[test]
    fn test_decode_envelope_shape() {
        let payload = json!({
            "services": {
                "orders": {
                    "serviceName": "orders",
                    "classes": {
                        "OrderController": {
                            "className": "OrderController",
                            "methods": { "placeOrder": method_json("SLOW") }
                        }
                    }
                }
            },
            "lastDiscovery": "2024-05-01T10:00:00Z",
            "totalServices": 1,
            "unavailableServices": 2
        });

        let registry = decode_registry(payload).unwrap();
        assert_eq!(registry.total_services, 1);
        assert_eq!(registry.unavailable_services, 2);
        assert!(registry.last_discovery.is_some());
        assert_eq!(registry.method(&path()).unwrap().current().as_str(), "SLOW");
    }

    #[test]
    fn test_decode_list_shape() {
        let payload = json!({
            "serviceConfigs": [{
                "serviceName": "orders",
                "classConfigs": [{
                    "className": "OrderController",
                    "methodConfigs": [method_json("NORMAL")]
                }]
            }]
        });

        let registry = decode_registry(payload).unwrap();
        assert_eq!(registry.total_services, 1);
        assert_eq!(registry.method(&path()).unwrap().current().as_str(), "NORMAL");
    }

    #[test]
    fn test_decode_bare_map_shape() {
        let payload = json!({
            "orders": {
                "classes": {
                    "OrderController": { "methods": { "placeOrder": method_json("TIMEOUT") } }
                }
            },
            "billing": { "classes": {} }
        });

        let registry = decode_registry(payload).unwrap();
        assert_eq!(registry.total_services, 2);
        assert_eq!(registry.method(&path()).unwrap().current().as_str(), "TIMEOUT");
        assert_eq!(
            registry.services["orders"].classes["OrderController"].class_name,
            "OrderController"
        );
    }

    #[test]
    fn test_total_services_follows_decoded_count() {
        let payload = json!({ "services": {}, "totalServices": 7 });
        let registry = decode_registry(payload).unwrap();
        assert_eq!(registry.total_services, 0);
        assert!(registry.services.is_empty());
    }

    #[test]
    fn test_invariant_violation_rejects_payload() {
        let payload = json!({
            "services": {
                "orders": {
                    "classes": {
                        "OrderController": {
                            "methods": {
                                "placeOrder": {
                                    "defaultBehaviourId": "NORMAL",
                                    "currentBehaviourId": "EXPLODE",
                                    "availableBehaviourIds": ["NORMAL"]
                                }
                            }
                        }
                    }
                }
            }
        });

        let err = decode_registry(payload).unwrap_err();
        assert!(err.contains("orders/OrderController"));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        assert!(decode_registry(json!([1, 2, 3])).is_err());
        assert!(decode_registry(json!({ "error": "boom" })).is_err());
    }

    #[test]
    fn test_decode_service_detail() {
        let payload = json!({
            "runtimeConfig": {
                "serviceName": "orders",
                "classes": {
                    "OrderController": { "methods": { "placeOrder": method_json("ERROR") } }
                }
            },
            "templateConfig": null,
            "modified": true,
            "status": "AVAILABLE",
            "lastSeen": 1714557600
        });

        let detail = decode_service_detail("orders", payload).unwrap();
        assert!(detail.modified);
        assert!(detail.template_config.is_none());
        assert_eq!(detail.status, "AVAILABLE");
        assert_eq!(detail.runtime_config.overridden_count(), 1);
        assert_eq!(detail.last_seen.unwrap().timestamp(), 1_714_557_600);
    }
}
