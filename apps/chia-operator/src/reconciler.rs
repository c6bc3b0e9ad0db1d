//! Generic reconcile loop shared by every kind.
//!
//! Per pass: fetch the resource, track it, resolve inputs, assemble the
//! children, converge them in order, then record readiness in status.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chia_api::{ChiaNetwork, ChiaResource};
use chia_core::events::{ACTION_RECONCILE, REASON_CREATED, REASON_FAILED};
use chia_core::ownership::{attach_owner, owner_reference};
use chia_core::{
    converge, ensure_absent, Cluster, ClusterObject, Error, KubeCluster, Outcome, Result,
};
use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::events::EventType;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, info, warn};

use crate::assemble::{Child, Inputs};
use crate::context::Context;

/// A custom resource kind driven by the generic loop.
#[async_trait]
pub trait Controlled: ClusterObject + ChiaResource {
    /// ChiaNetwork in the same namespace whose parameters feed the chia env.
    fn network_ref(&self) -> Option<&str> {
        None
    }

    /// Desired children in convergence order. Must not perform I/O.
    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>>;

    /// Evaluated after every child converged.
    async fn is_ready<C: Cluster>(&self, _cluster: &C) -> Result<bool> {
        Ok(true)
    }

    /// Register watches on owned child kinds so their changes trigger a reconcile.
    fn watch_children(
        controller: Controller<Self>,
        client: &Client,
        namespace: Option<&str>,
    ) -> Controller<Self>
    where
        Self: Sized,
    {
        controller
            .owns(scoped_api::<Deployment>(client, namespace), watcher::Config::default())
            .owns(scoped_api::<Service>(client, namespace), watcher::Config::default())
            .owns(
                scoped_api::<PersistentVolumeClaim>(client, namespace),
                watcher::Config::default(),
            )
    }
}

pub fn scoped_api<T>(client: &Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn backoff_key(kind: &str, namespace: &str, name: &str) -> String {
    format!("{kind}/{namespace}/{name}")
}

/// One reconcile pass for `namespace/name`.
pub async fn reconcile_identity<K, C>(ctx: &Context<C>, namespace: &str, name: &str) -> Result<Action>
where
    K: Controlled,
    C: Cluster,
{
    let kind = K::kind(&()).into_owned();
    let identity = format!("{namespace}/{name}");
    ctx.metrics.record_reconcile(&kind);

    let live = match ctx.cluster.get::<K>(namespace, name).await {
        Ok(live) => live,
        Err(err) => {
            ctx.metrics.record_error(&kind);
            warn!(%kind, %identity, error = %err, "fetching resource failed");
            return Err(err);
        }
    };
    let Some(resource) = live.filter(|r| r.meta().deletion_timestamp.is_none()) else {
        if ctx.ledger.untrack(&kind, &identity) {
            info!(%kind, %identity, "resource removed, no longer tracked");
        }
        ctx.backoff.reset(&backoff_key(&kind, namespace, name));
        return Ok(Action::await_change());
    };
    if ctx.ledger.track(&kind, &identity) {
        info!(%kind, %identity, "tracking resource");
    }

    match apply(&resource, ctx, namespace, name).await {
        Ok(action) => {
            ctx.backoff.reset(&backoff_key(&kind, namespace, name));
            Ok(action)
        }
        Err(err) => {
            record_failure(ctx, &resource, &kind, &err).await;
            Err(err)
        }
    }
}

async fn apply<K, C>(resource: &K, ctx: &Context<C>, namespace: &str, name: &str) -> Result<Action>
where
    K: Controlled,
    C: Cluster,
{
    let inputs = resolve_inputs(resource, ctx, namespace).await?;
    let children = resource.assemble(&inputs)?;
    let owner = owner_reference(resource)?;
    for child in children {
        let child_name = child.name().to_string();
        let outcome = converge_child(&ctx.cluster, namespace, child, &owner).await?;
        if outcome.changed() {
            debug!(parent = %name, child = %child_name, ?outcome, "child converged");
        }
    }
    let ready = resource.is_ready(&ctx.cluster).await?;
    update_status(resource, ready, ctx, namespace, name).await
}

async fn resolve_inputs<K, C>(resource: &K, ctx: &Context<C>, namespace: &str) -> Result<Inputs>
where
    K: Controlled,
    C: Cluster,
{
    let mut inputs = Inputs {
        network: BTreeMap::new(),
        images: ctx.settings.images.clone(),
    };
    let Some(network) = resource.network_ref() else {
        return Ok(inputs);
    };
    let not_found = || Error::NetworkNotFound {
        namespace: namespace.to_string(),
        name: network.to_string(),
    };
    ctx.cluster
        .get::<ChiaNetwork>(namespace, network)
        .await?
        .ok_or_else(not_found)?;
    let config_map = ctx
        .cluster
        .get::<ConfigMap>(namespace, network)
        .await?
        .ok_or_else(|| {
            Error::MissingConfig(format!(
                "ConfigMap for ChiaNetwork {namespace}/{network} does not exist yet"
            ))
        })?;
    inputs.network = config_map.data.unwrap_or_default();
    Ok(inputs)
}

fn owned<K: Resource>(mut obj: K, owner: &OwnerReference) -> K {
    attach_owner(&mut obj, owner);
    obj
}

async fn converge_child<C: Cluster>(
    cluster: &C,
    namespace: &str,
    child: Child,
    owner: &OwnerReference,
) -> Result<Outcome> {
    match child {
        Child::AbsentService(name) => {
            ensure_absent::<C, Service>(cluster, namespace, &name, &owner.uid).await
        }
        Child::Service(o) => converge(cluster, owned(o, owner)).await,
        Child::PersistentVolumeClaim(o) => converge(cluster, owned(o, owner)).await,
        Child::Deployment(o) => converge(cluster, owned(o, owner)).await,
        Child::ConfigMap(o) => converge(cluster, owned(o, owner)).await,
        Child::ServiceAccount(o) => converge(cluster, owned(o, owner)).await,
        Child::Role(o) => converge(cluster, owned(o, owner)).await,
        Child::RoleBinding(o) => converge(cluster, owned(o, owner)).await,
        Child::Job(o) => converge(cluster, owned(o, owner)).await,
    }
}

async fn update_status<K, C>(
    resource: &K,
    ready: bool,
    ctx: &Context<C>,
    namespace: &str,
    name: &str,
) -> Result<Action>
where
    K: Controlled,
    C: Cluster,
{
    let next = if ready {
        ctx.settings.resync
    } else {
        ctx.settings.not_ready_requeue
    };
    if resource.ready() == ready {
        return Ok(Action::requeue(next));
    }
    let kind = K::kind(&());
    let mut updated = resource.clone();
    updated.set_ready(ready);
    match ctx.cluster.replace_status(namespace, name, &updated).await {
        Ok(_) => {}
        Err(err) if err.is_conflict() => {
            ctx.metrics.record_status_conflict(&kind);
            debug!(%kind, %namespace, %name, "status write conflicted, requeueing");
            return Ok(Action::requeue(ctx.settings.status_conflict_requeue));
        }
        Err(err) => return Err(err),
    }
    if ready {
        ctx.events
            .publish(
                &resource.object_ref(&()),
                EventType::Normal,
                REASON_CREATED,
                ACTION_RECONCILE,
                Some(format!("Successfully created {kind} {namespace}/{name}")),
            )
            .await;
    }
    Ok(Action::requeue(next))
}

async fn record_failure<K, C>(ctx: &Context<C>, resource: &K, kind: &str, err: &Error)
where
    K: Controlled,
    C: Cluster,
{
    ctx.metrics.record_error(kind);
    warn!(%kind, name = %resource.name_any(), error = %err, "reconcile failed");
    ctx.events
        .publish(
            &resource.object_ref(&()),
            EventType::Warning,
            REASON_FAILED,
            ACTION_RECONCILE,
            Some(err.to_string()),
        )
        .await;
}

async fn reconcile<K, C>(resource: Arc<K>, ctx: Arc<Context<C>>) -> Result<Action>
where
    K: Controlled,
    C: Cluster,
{
    let namespace = resource
        .namespace()
        .ok_or(Error::MissingField("metadata.namespace"))?;
    reconcile_identity::<K, C>(&ctx, &namespace, &resource.name_any()).await
}

fn error_policy<K, C>(resource: Arc<K>, err: &Error, ctx: Arc<Context<C>>) -> Action
where
    K: Controlled,
    C: Cluster,
{
    let kind = K::kind(&());
    let namespace = resource.namespace().unwrap_or_default();
    let delay = ctx
        .backoff
        .next_delay(&backoff_key(&kind, &namespace, &resource.name_any()));
    debug!(%kind, name = %resource.name_any(), error = %err, ?delay, "requeue after failure");
    Action::requeue(delay)
}

/// Keeps the ledger in step with watch events for one kind.
///
/// The controller never sees deletions, so they are applied here. A watch
/// restart re-lists without `Delete` events; identities missing from the
/// re-list are dropped when it completes.
pub struct DeletionTracker<C: Cluster> {
    ctx: Arc<Context<C>>,
    kind: String,
    relisted: Option<BTreeSet<String>>,
}

impl<C: Cluster> DeletionTracker<C> {
    pub fn new(ctx: Arc<Context<C>>, kind: impl Into<String>) -> Self {
        Self {
            ctx,
            kind: kind.into(),
            relisted: None,
        }
    }

    pub fn handle<K: Controlled>(&mut self, event: watcher::Event<K>) {
        match event {
            watcher::Event::Delete(obj) => {
                let namespace = obj.namespace().unwrap_or_default();
                self.forget(&namespace, &obj.name_any());
            }
            watcher::Event::Init => self.relisted = Some(BTreeSet::new()),
            watcher::Event::InitApply(obj) => {
                if let Some(seen) = self.relisted.as_mut() {
                    let namespace = obj.namespace().unwrap_or_default();
                    seen.insert(format!("{namespace}/{}", obj.name_any()));
                }
            }
            watcher::Event::InitDone => {
                let Some(seen) = self.relisted.take() else {
                    return;
                };
                for identity in self.ctx.ledger.identities(&self.kind) {
                    if seen.contains(&identity) {
                        continue;
                    }
                    if let Some((namespace, name)) = identity.split_once('/') {
                        self.forget(namespace, name);
                    }
                }
            }
            _ => {}
        }
    }

    fn forget(&self, namespace: &str, name: &str) {
        let identity = format!("{namespace}/{name}");
        if self.ctx.ledger.untrack(&self.kind, &identity) {
            info!(kind = %self.kind, %identity, "resource removed, no longer tracked");
        }
        self.ctx
            .backoff
            .reset(&backoff_key(&self.kind, namespace, name));
    }
}

async fn watch_deletions<K>(api: Api<K>, ctx: Arc<Context<KubeCluster>>)
where
    K: Controlled,
{
    let mut tracker = DeletionTracker::new(ctx, K::kind(&()));
    let mut events = watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed();
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => tracker.handle::<K>(event),
            Err(err) => warn!(kind = %K::kind(&()), error = %err, "deletion watch error"),
        }
    }
}

/// Run the controller for `K` until SIGINT/SIGTERM.
pub async fn run_controller<K>(ctx: Arc<Context<KubeCluster>>, namespace: Option<String>, concurrency: u16)
where
    K: Controlled,
{
    let client = ctx.cluster.client().clone();
    let api = scoped_api::<K>(&client, namespace.as_deref());
    let kind = K::kind(&()).into_owned();
    ctx.metrics.register_kind(&kind);
    info!(%kind, namespace = namespace.as_deref().unwrap_or("<all>"), "starting controller");

    let deletions = tokio::spawn(watch_deletions::<K>(api.clone(), ctx.clone()));
    let controller = Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency));
    K::watch_children(controller, &client, namespace.as_deref())
        .shutdown_on_signal()
        .run(reconcile::<K, KubeCluster>, error_policy::<K, KubeCluster>, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!(object = %obj, "reconciled"),
                Err(controller::Error::ObjectNotFound(obj)) => {
                    debug!(object = %obj, "object gone before reconcile")
                }
                Err(err) => warn!(error = %err, "controller error"),
            }
        })
        .await;
    deletions.abort();
    info!(%kind, "controller stopped");
}
