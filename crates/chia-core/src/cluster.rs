//! Namespaced object store seam between the reconcilers and the apiserver.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

pub const FIELD_MANAGER: &str = "chia-operator";

/// Any namespaced object the operator reads or writes.
pub trait ClusterObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> ClusterObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[async_trait]
pub trait Cluster: Send + Sync + 'static {
    /// Fetch an object; `None` when it does not exist.
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>>;
    async fn create<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K>;
    /// Replace an object; fails with [`Error::Conflict`] on a stale resourceVersion.
    async fn replace<K: ClusterObject>(&self, namespace: &str, name: &str, obj: &K) -> Result<K>;
    /// Delete an object; deleting a missing object succeeds.
    async fn delete<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<()>;
    /// Write only the status subresource.
    async fn replace_status<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K>;
}

/// [`Cluster`] backed by a live apiserver.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api<K: ClusterObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn create<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K> {
        Ok(self.api::<K>(namespace).create(&post_params(), obj).await?)
    }

    async fn replace<K: ClusterObject>(&self, namespace: &str, name: &str, obj: &K) -> Result<K> {
        Ok(self
            .api::<K>(namespace)
            .replace(name, &post_params(), obj)
            .await?)
    }

    async fn delete<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map_err(Error::from)
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn replace_status<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K> {
        let body = serde_json::to_vec(obj)?;
        Ok(self
            .api::<K>(namespace)
            .replace_status(name, &post_params(), body)
            .await?)
    }
}
