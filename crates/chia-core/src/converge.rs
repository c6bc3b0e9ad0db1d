//! Create-or-update of a single child object.
//!
//! A live object is left alone when every field the desired object sets is
//! already present with the same value and its applied-hash annotation
//! matches the desired object. Fields the cluster fills in on its own
//! (defaults, allocated IPs, bound volumes) never count as drift; fields the
//! operator stops setting change the hash and force a replace.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::cluster::{Cluster, ClusterObject};
use crate::error::{Error, Result};
use crate::ownership::is_controlled_by;

/// Digest of the desired object as last written by the operator.
pub const ANNOTATION_APPLIED_HASH: &str = "k8s.chia.net/applied-hash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    Deleted,
    Absent,
}

impl Outcome {
    /// True when a write reached the cluster.
    pub fn changed(self) -> bool {
        matches!(self, Outcome::Created | Outcome::Updated | Outcome::Deleted)
    }
}

/// Per-kind knowledge the convergence step needs.
pub trait ChildObject: ClusterObject {
    /// Kinds whose spec is immutable after creation are never replaced.
    const UPDATABLE: bool = true;

    /// Copy cluster-assigned fields from `live` before replacing.
    fn carry_forward(&mut self, _live: &Self) {}
}

impl ChildObject for Service {
    fn carry_forward(&mut self, live: &Self) {
        let (Some(desired), Some(live)) = (self.spec.as_mut(), live.spec.as_ref()) else {
            return;
        };
        if desired.cluster_ip.is_none() {
            desired.cluster_ip = live.cluster_ip.clone();
        }
        if desired.cluster_ips.is_none() {
            desired.cluster_ips = live.cluster_ips.clone();
        }
        if desired.health_check_node_port.is_none() {
            desired.health_check_node_port = live.health_check_node_port;
        }
        if let (Some(ports), Some(live_ports)) = (desired.ports.as_mut(), live.ports.as_ref()) {
            for port in ports.iter_mut().filter(|p| p.node_port.is_none()) {
                port.node_port = live_ports
                    .iter()
                    .find(|l| l.name == port.name && l.protocol == port.protocol)
                    .and_then(|l| l.node_port);
            }
        }
    }
}

impl ChildObject for PersistentVolumeClaim {
    fn carry_forward(&mut self, live: &Self) {
        let (Some(desired), Some(live)) = (self.spec.as_mut(), live.spec.as_ref()) else {
            return;
        };
        if desired.volume_name.is_none() {
            desired.volume_name = live.volume_name.clone();
        }
        if desired.storage_class_name.is_none() {
            desired.storage_class_name = live.storage_class_name.clone();
        }
        if desired.volume_mode.is_none() {
            desired.volume_mode = live.volume_mode.clone();
        }
    }
}

impl ChildObject for Deployment {}
impl ChildObject for ConfigMap {}
impl ChildObject for ServiceAccount {}
impl ChildObject for Role {}
impl ChildObject for RoleBinding {}

impl ChildObject for Job {
    const UPDATABLE: bool = false;
}

/// True when every value set in `desired` matches `live`.
///
/// Nulls and empty collections in `desired` match anything; arrays must have
/// the same length and match element-wise.
pub fn is_subset(desired: &Value, live: &Value) -> bool {
    match (desired, live) {
        (Value::Null, _) => true,
        (Value::Object(d), Value::Object(l)) => d.iter().all(|(key, value)| match l.get(key) {
            Some(live_value) => is_subset(value, live_value),
            None => is_empty(value),
        }),
        (Value::Object(d), Value::Null) => d.values().all(is_empty),
        (Value::Array(d), Value::Array(l)) => {
            d.len() == l.len() && d.iter().zip(l).all(|(a, b)| is_subset(a, b))
        }
        (Value::Array(d), Value::Null) => d.is_empty(),
        (d, l) => d == l,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.values().all(is_empty),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Hex SHA-256 of `desired` with any previous applied-hash annotation removed.
pub fn applied_hash<K: ClusterObject>(desired: &K) -> Result<String> {
    let mut value = serde_json::to_value(desired)?;
    if let Some(annotations) = value
        .pointer_mut("/metadata/annotations")
        .and_then(Value::as_object_mut)
    {
        annotations.remove(ANNOTATION_APPLIED_HASH);
    }
    Ok(hex::encode(Sha256::digest(serde_json::to_vec(&value)?)))
}

fn stamp_hash<K: ClusterObject>(desired: &mut K) -> Result<()> {
    let hash = applied_hash(desired)?;
    desired
        .meta_mut()
        .annotations
        .get_or_insert_with(Default::default)
        .insert(ANNOTATION_APPLIED_HASH.to_string(), hash);
    Ok(())
}

fn identity<K: ClusterObject>(obj: &K) -> Result<(String, String)> {
    let meta = obj.meta();
    let namespace = meta
        .namespace
        .clone()
        .ok_or(Error::MissingField("metadata.namespace"))?;
    let name = meta.name.clone().ok_or(Error::MissingField("metadata.name"))?;
    Ok((namespace, name))
}

/// Create `desired` if missing, replace it if it drifted, otherwise do nothing.
///
/// A stale-version replace surfaces as [`Error::Conflict`] and is not retried here.
pub async fn converge<C, K>(cluster: &C, mut desired: K) -> Result<Outcome>
where
    C: Cluster,
    K: ChildObject,
{
    let (namespace, name) = identity(&desired)?;
    let kind = K::kind(&());
    stamp_hash(&mut desired)?;
    let Some(live) = cluster.get::<K>(&namespace, &name).await? else {
        cluster.create(&namespace, &desired).await?;
        info!(%kind, %namespace, %name, "created");
        return Ok(Outcome::Created);
    };
    if !K::UPDATABLE {
        return Ok(Outcome::Unchanged);
    }
    if is_subset(&serde_json::to_value(&desired)?, &serde_json::to_value(&live)?) {
        debug!(%kind, %namespace, %name, "unchanged");
        return Ok(Outcome::Unchanged);
    }
    desired.carry_forward(&live);
    desired.meta_mut().resource_version = live.meta().resource_version.clone();
    cluster.replace(&namespace, &name, &desired).await?;
    info!(%kind, %namespace, %name, "updated");
    Ok(Outcome::Updated)
}

/// Delete `name` if it exists and is controlled by `owner_uid`.
///
/// Objects of the same name owned by someone else are left in place.
pub async fn ensure_absent<C, K>(
    cluster: &C,
    namespace: &str,
    name: &str,
    owner_uid: &str,
) -> Result<Outcome>
where
    C: Cluster,
    K: ChildObject,
{
    let kind = K::kind(&());
    match cluster.get::<K>(namespace, name).await? {
        Some(live) if is_controlled_by(&live, owner_uid) => {
            cluster.delete::<K>(namespace, name).await?;
            info!(%kind, %namespace, %name, "deleted");
            Ok(Outcome::Deleted)
        }
        Some(_) => {
            debug!(%kind, %namespace, %name, "left in place, not owned");
            Ok(Outcome::Absent)
        }
        None => Ok(Outcome::Absent),
    }
}
