use chia_api::ServiceConfig;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::metadata::ResourceMeta;
use super::Child;

pub fn port(name: &str, port: i32, protocol: &str) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        protocol: Some(protocol.to_string()),
        ..Default::default()
    }
}

pub fn tcp(name: &str, number: i32) -> ServicePort {
    port(name, number, "TCP")
}

/// The Service `<name>[-suffix]`, or its removal when `config` disables it.
pub fn service(
    meta: &ResourceMeta,
    suffix: Option<&str>,
    config: Option<&ServiceConfig>,
    ports: Vec<ServicePort>,
) -> Child {
    let name = meta.child_name(suffix);
    if !config.map(ServiceConfig::is_enabled).unwrap_or(true) {
        return Child::AbsentService(name);
    }
    let defaults = ServiceConfig::default();
    let config = config.unwrap_or(&defaults);
    Child::Service(Service {
        metadata: meta.object_meta(name, Some(&config.additional_metadata)),
        spec: Some(ServiceSpec {
            type_: Some(
                config
                    .service_type
                    .clone()
                    .unwrap_or_else(|| "ClusterIP".into()),
            ),
            external_traffic_policy: config.external_traffic_policy.clone(),
            session_affinity: config.session_affinity.clone(),
            ip_family_policy: config.ip_family_policy.clone(),
            ip_families: config.ip_families.clone(),
            selector: Some(meta.selector()),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chia_api::AdditionalMetadata;
    use std::collections::BTreeMap;

    fn meta() -> ResourceMeta {
        ResourceMeta {
            kind: "ChiaNode".into(),
            name: "node".into(),
            namespace: "chia".into(),
            labels: BTreeMap::from([
                ("app.kubernetes.io/instance".to_string(), "node".to_string()),
                ("app.kubernetes.io/name".to_string(), "node".to_string()),
            ]),
            annotations: BTreeMap::new(),
        }
    }

    #[test]
    fn defaults_to_cluster_ip() {
        let Child::Service(svc) = service(&meta(), Some("rpc"), None, vec![tcp("rpc", 8555)]) else {
            panic!("expected a service");
        };
        assert_eq!(svc.metadata.name.as_deref(), Some("node-rpc"));
        let spec = svc.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        assert_eq!(spec.selector.unwrap().len(), 2);
        assert_eq!(spec.ports.unwrap()[0].target_port, Some(IntOrString::Int(8555)));
    }

    #[test]
    fn disabled_service_is_absent() {
        let config = ServiceConfig {
            enabled: Some(false),
            ..Default::default()
        };
        let child = service(&meta(), Some("daemon"), Some(&config), vec![]);
        assert!(matches!(child, Child::AbsentService(name) if name == "node-daemon"));
    }

    #[test]
    fn per_service_metadata_overrides_resource_labels() {
        let config = ServiceConfig {
            service_type: Some("LoadBalancer".into()),
            external_traffic_policy: Some("Local".into()),
            additional_metadata: AdditionalMetadata {
                labels: BTreeMap::from([(
                    "app.kubernetes.io/name".to_string(),
                    "peer-lb".to_string(),
                )]),
                annotations: BTreeMap::from([("lb".to_string(), "internal".to_string())]),
            },
            ..Default::default()
        };
        let Child::Service(svc) = service(&meta(), None, Some(&config), vec![tcp("peers", 8444)]) else {
            panic!("expected a service");
        };
        let labels = svc.metadata.labels.unwrap();
        assert_eq!(labels["app.kubernetes.io/name"], "peer-lb");
        assert_eq!(svc.metadata.annotations.unwrap()["lb"], "internal");
        let spec = svc.spec.unwrap();
        // Selector stays on the resource-level labels so it still matches the pods.
        assert_eq!(spec.selector.unwrap()["app.kubernetes.io/name"], "node");
        assert_eq!(spec.type_.as_deref(), Some("LoadBalancer"));
        assert_eq!(spec.external_traffic_policy.as_deref(), Some("Local"));
    }
}
