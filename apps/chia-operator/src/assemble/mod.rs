//! Pure construction of child objects from a custom resource.
//!
//! Nothing here talks to the cluster; the reconciler resolves [`Inputs`]
//! first and converges whatever these functions return.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use sha2::{Digest, Sha256};

use crate::config::ImageDefaults;

pub mod container;
pub mod deployment;
pub mod metadata;
pub mod service;
pub mod storage;
pub mod workload;

/// One desired child object, or a Service that must not exist.
#[derive(Debug, Clone)]
pub enum Child {
    Service(Service),
    AbsentService(String),
    PersistentVolumeClaim(PersistentVolumeClaim),
    Deployment(Deployment),
    ConfigMap(ConfigMap),
    ServiceAccount(ServiceAccount),
    Role(Role),
    RoleBinding(RoleBinding),
    Job(Job),
}

impl Child {
    /// Name of the object this child converges.
    pub fn name(&self) -> &str {
        let meta = match self {
            Child::AbsentService(name) => return name,
            Child::Service(o) => &o.metadata,
            Child::PersistentVolumeClaim(o) => &o.metadata,
            Child::Deployment(o) => &o.metadata,
            Child::ConfigMap(o) => &o.metadata,
            Child::ServiceAccount(o) => &o.metadata,
            Child::Role(o) => &o.metadata,
            Child::RoleBinding(o) => &o.metadata,
            Child::Job(o) => &o.metadata,
        };
        meta.name.as_deref().unwrap_or_default()
    }
}

/// Everything an assembler may read besides the resource itself.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Data of the referenced ChiaNetwork ConfigMap; empty when none is referenced.
    pub network: BTreeMap<String, String>,
    pub images: ImageDefaults,
}

/// Hex SHA-256 over the sorted `key=value` lines of the network map.
pub fn network_hash(network: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in network {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
