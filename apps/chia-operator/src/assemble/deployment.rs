use std::collections::BTreeMap;

use chia_api::CommonSpec;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, Volume};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;

use super::metadata::ResourceMeta;

/// Containers and volumes the workload assembler computed for the pod.
#[derive(Debug, Default)]
pub struct PodContents {
    pub containers: Vec<Container>,
    pub init_containers: Vec<Container>,
    pub volumes: Vec<Volume>,
    pub annotations: BTreeMap<String, String>,
}

/// Single-replica Deployment `<name>`; user sidecars are appended after the
/// operator's containers and volumes.
pub fn deployment(meta: &ResourceMeta, common: &CommonSpec, pod: PodContents) -> Deployment {
    let mut containers = pod.containers;
    let mut volumes = pod.volumes;
    if let Some(sidecars) = common.sidecars.as_ref() {
        containers.extend(sidecars.containers.iter().cloned());
        volumes.extend(sidecars.volumes.iter().cloned());
    }
    let mut annotations = meta.annotations.clone();
    annotations.extend(pod.annotations);

    let strategy = common.strategy.clone().unwrap_or_else(|| DeploymentStrategy {
        type_: Some("Recreate".into()),
        rolling_update: None,
    });

    Deployment {
        metadata: meta.object_meta(meta.child_name(None), None),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            strategy: Some(strategy),
            selector: LabelSelector {
                match_labels: Some(meta.selector()),
                match_expressions: None,
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(meta.labels.clone()),
                    annotations: (!annotations.is_empty()).then_some(annotations),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers,
                    init_containers: (!pod.init_containers.is_empty())
                        .then_some(pod.init_containers),
                    volumes: (!volumes.is_empty()).then_some(volumes),
                    image_pull_secrets: (!common.image_pull_secrets.is_empty())
                        .then(|| common.image_pull_secrets.clone()),
                    node_selector: (!common.node_selector.is_empty())
                        .then(|| common.node_selector.clone()),
                    affinity: common.affinity.clone(),
                    tolerations: (!common.tolerations.is_empty())
                        .then(|| common.tolerations.clone()),
                    topology_spread_constraints: (!common.topology_spread_constraints.is_empty())
                        .then(|| common.topology_spread_constraints.clone()),
                    security_context: common.pod_security_context.clone(),
                    service_account_name: common.service_account_name.clone(),
                    priority_class_name: common.priority_class_name.clone(),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
