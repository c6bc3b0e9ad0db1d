//! [`Controlled`](crate::reconciler::Controlled) implementations, one per kind.

use chia_api::consts::KEY_NETWORK_PORT;
use chia_api::CommonSpecChia;
use chia_core::Result;
use serde::Serialize;

use crate::assemble::Inputs;

mod ca;
mod crawler;
mod farmer;
mod harvester;
mod introducer;
mod network;
mod node;
mod seeder;
mod timelord;
mod wallet;

/// Peer port: `spec.chia.networkPort`, then the network's port, then the
/// testnet or mainnet default.
fn peer_port(chia: &CommonSpecChia, inputs: &Inputs, mainnet: i32, testnet: Option<i32>) -> i32 {
    if let Some(port) = chia.network_port {
        return i32::from(port);
    }
    if let Some(port) = inputs
        .network
        .get(KEY_NETWORK_PORT)
        .and_then(|p| p.parse::<u16>().ok())
    {
        return i32::from(port);
    }
    match testnet {
        Some(port) if chia.testnet == Some(true) => port,
        _ => mainnet,
    }
}

/// JSON array for list-valued env vars; `None` when the list is empty.
fn json_env<T: Serialize>(items: &[T]) -> Result<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(items)?))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{Container, Service};
    use kube::Resource;

    use crate::assemble::Child;

    /// Give a freshly built resource the identity the apiserver would.
    pub fn placed<K: Resource>(mut resource: K, namespace: &str) -> K {
        let meta = resource.meta_mut();
        meta.namespace = Some(namespace.to_string());
        meta.uid = Some("uid-fixture".to_string());
        resource
    }

    pub fn services(children: &[Child]) -> Vec<&Service> {
        children
            .iter()
            .filter_map(|c| match c {
                Child::Service(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn service<'a>(children: &'a [Child], name: &str) -> &'a Service {
        services(children)
            .into_iter()
            .find(|s| s.metadata.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("service {name} not assembled"))
    }

    pub fn absent(children: &[Child]) -> Vec<&str> {
        children
            .iter()
            .filter_map(|c| match c {
                Child::AbsentService(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn deployment(children: &[Child]) -> &Deployment {
        children
            .iter()
            .find_map(|c| match c {
                Child::Deployment(d) => Some(d),
                _ => None,
            })
            .expect("deployment assembled")
    }

    pub fn container<'a>(deployment: &'a Deployment, name: &str) -> &'a Container {
        deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|p| p.containers.iter().find(|c| c.name == name))
            .unwrap_or_else(|| panic!("container {name} missing"))
    }

    pub fn env(container: &Container, name: &str) -> Option<String> {
        container
            .env
            .iter()
            .flatten()
            .find(|v| v.name == name)
            .and_then(|v| v.value.clone())
    }

    pub fn port_numbers(service: &Service) -> Vec<i32> {
        service
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_ref())
            .map(|ports| ports.iter().map(|p| p.port).collect())
            .unwrap_or_default()
    }
}
