//! In-memory [`Cluster`] and event sink for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use serde_json::Value;

use crate::cluster::{Cluster, ClusterObject};
use crate::error::{api_error, Error, Result, CONFLICT_MESSAGE};
use crate::events::EventPublisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Replace,
    Delete,
    ReplaceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub op: WriteOp,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

type ObjectKey = (String, String, String);

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<ObjectKey, Value>,
    writes: Vec<WriteRecord>,
    version: u64,
    conflict_next_status: bool,
    fail_next_write: Option<(u16, String, String)>,
}

impl MemoryState {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn take_failure(&mut self) -> Result<()> {
        match self.fail_next_write.take() {
            Some((code, reason, message)) => Err(api_error(code, &reason, message).into()),
            None => Ok(()),
        }
    }

    fn check_version(&self, stored: &Value, incoming: &Value) -> Result<()> {
        let stored_rv = stored.pointer("/metadata/resourceVersion");
        match incoming.pointer("/metadata/resourceVersion") {
            Some(rv) if Some(rv) != stored_rv => {
                Err(api_error(409, "Conflict", conflict_message()).into())
            }
            _ => Ok(()),
        }
    }

    fn record(&mut self, op: WriteOp, key: &ObjectKey) {
        self.writes.push(WriteRecord {
            op,
            kind: key.0.clone(),
            namespace: key.1.clone(),
            name: key.2.clone(),
        });
    }
}

fn conflict_message() -> String {
    format!("Operation cannot be fulfilled: {CONFLICT_MESSAGE}")
}

fn key<K: ClusterObject>(namespace: &str, name: &str) -> ObjectKey {
    (K::kind(&()).into_owned(), namespace.to_string(), name.to_string())
}

fn set_meta(value: &mut Value, field: &str, v: Value) {
    if let Some(meta) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        meta.insert(field.to_string(), v);
    }
}

/// Stores objects as JSON and behaves like the apiserver where the
/// reconcilers can tell the difference: resourceVersions, uids, optimistic
/// concurrency, and cluster IP allocation for Services.
#[derive(Default)]
pub struct MemoryCluster {
    state: Mutex<MemoryState>,
    normalize: Option<fn(&mut Value)>,
    fail_gets: Mutex<Option<(u16, String, String)>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite every created or replaced object before storing it, the way
    /// the apiserver applies defaults and canonical forms.
    pub fn with_normalizer(normalize: fn(&mut Value)) -> Self {
        Self {
            normalize: Some(normalize),
            ..Self::default()
        }
    }

    fn normalized(&self, mut value: Value) -> Value {
        if let Some(normalize) = self.normalize {
            normalize(&mut value);
        }
        value
    }

    /// Every `get` fails with the given api error until cleared.
    pub fn fail_gets(&self, code: u16, reason: &str, message: &str) {
        *self.fail_gets.lock().unwrap_or_else(|e| e.into_inner()) =
            Some((code, reason.to_string(), message.to_string()));
    }

    pub fn clear_get_failures(&self) {
        *self.fail_gets.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an object as if another client created it; fills namespace, uid and resourceVersion.
    pub fn insert<K: ClusterObject>(&self, namespace: &str, obj: &K) -> K {
        let name = obj.meta().name.clone().unwrap_or_default();
        let mut value = serde_json::to_value(obj).expect("serialize seeded object");
        let mut state = self.state();
        let version = state.next_version();
        set_meta(&mut value, "namespace", Value::String(namespace.to_string()));
        set_meta(&mut value, "resourceVersion", Value::String(version.clone()));
        if value.pointer("/metadata/uid").is_none() {
            set_meta(&mut value, "uid", Value::String(format!("uid-{version}")));
        }
        state
            .objects
            .insert(key::<K>(namespace, &name), value.clone());
        serde_json::from_value(value).expect("deserialize seeded object")
    }

    pub fn object<K: ClusterObject>(&self, namespace: &str, name: &str) -> Option<K> {
        self.state()
            .objects
            .get(&key::<K>(namespace, name))
            .map(|v| serde_json::from_value(v.clone()).expect("deserialize stored object"))
    }

    /// Remove an object without recording a write, as if deleted out of band.
    pub fn remove<K: ClusterObject>(&self, namespace: &str, name: &str) -> bool {
        self.state()
            .objects
            .remove(&key::<K>(namespace, name))
            .is_some()
    }

    /// Names of stored objects of kind `K` in `namespace`.
    pub fn names<K: ClusterObject>(&self, namespace: &str) -> Vec<String> {
        let kind = K::kind(&());
        self.state()
            .objects
            .keys()
            .filter(|(k, ns, _)| *k == kind && ns == namespace)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// The next status write fails with a resourceVersion conflict.
    pub fn conflict_next_status_write(&self) {
        self.state().conflict_next_status = true;
    }

    /// The next create, replace or delete fails with the given api error.
    pub fn fail_next_write(&self, code: u16, reason: &str, message: &str) {
        self.state().fail_next_write = Some((code, reason.to_string(), message.to_string()));
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        if let Some((code, reason, message)) = self
            .fail_gets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(api_error(code, &reason, message).into());
        }
        let state = self.state();
        match state.objects.get(&key::<K>(namespace, name)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn create<K: ClusterObject>(&self, namespace: &str, obj: &K) -> Result<K> {
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or(Error::MissingField("metadata.name"))?;
        let k = key::<K>(namespace, &name);
        let mut state = self.state();
        state.take_failure()?;
        if state.objects.contains_key(&k) {
            let message = format!("{} \"{name}\" already exists", k.0);
            return Err(api_error(409, "AlreadyExists", message).into());
        }
        let mut value = self.normalized(serde_json::to_value(obj)?);
        let version = state.next_version();
        set_meta(&mut value, "namespace", Value::String(namespace.to_string()));
        set_meta(&mut value, "resourceVersion", Value::String(version.clone()));
        set_meta(&mut value, "uid", Value::String(format!("uid-{version}")));
        if k.0 == "Service" {
            if let Some(spec) = value.get_mut("spec").and_then(Value::as_object_mut) {
                spec.entry("clusterIP")
                    .or_insert_with(|| Value::String(format!("10.96.0.{version}")));
            }
        }
        state.record(WriteOp::Create, &k);
        state.objects.insert(k, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn replace<K: ClusterObject>(&self, namespace: &str, name: &str, obj: &K) -> Result<K> {
        let k = key::<K>(namespace, name);
        let mut state = self.state();
        state.take_failure()?;
        let Some(stored) = state.objects.get(&k).cloned() else {
            return Err(api_error(404, "NotFound", format!("{} \"{name}\" not found", k.0)).into());
        };
        let mut value = self.normalized(serde_json::to_value(obj)?);
        state.check_version(&stored, &value)?;
        if let Some(status) = stored.get("status") {
            if let Some(map) = value.as_object_mut() {
                map.insert("status".into(), status.clone());
            }
        }
        for field in ["uid", "namespace"] {
            if let Some(v) = stored.pointer(&format!("/metadata/{field}")) {
                set_meta(&mut value, field, v.clone());
            }
        }
        let version = state.next_version();
        set_meta(&mut value, "resourceVersion", Value::String(version));
        state.record(WriteOp::Replace, &k);
        state.objects.insert(k, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn delete<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<()> {
        let k = key::<K>(namespace, name);
        let mut state = self.state();
        state.take_failure()?;
        if state.objects.remove(&k).is_some() {
            state.record(WriteOp::Delete, &k);
        }
        Ok(())
    }

    async fn replace_status<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K> {
        let k = key::<K>(namespace, name);
        let mut state = self.state();
        if std::mem::take(&mut state.conflict_next_status) {
            return Err(api_error(409, "Conflict", conflict_message()).into());
        }
        let Some(mut stored) = state.objects.get(&k).cloned() else {
            return Err(api_error(404, "NotFound", format!("{} \"{name}\" not found", k.0)).into());
        };
        let incoming = serde_json::to_value(obj)?;
        state.check_version(&stored, &incoming)?;
        if let Some(map) = stored.as_object_mut() {
            match incoming.get("status") {
                Some(status) => map.insert("status".into(), status.clone()),
                None => map.remove("status"),
            };
        }
        let version = state.next_version();
        set_meta(&mut stored, "resourceVersion", Value::String(version));
        state.record(WriteOp::ReplaceStatus, &k);
        state.objects.insert(k, stored.clone());
        Ok(serde_json::from_value(stored)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object: String,
    pub warning: bool,
    pub reason: String,
    pub note: Option<String>,
}

/// Keeps every published event in memory.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.reason).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        reference: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedEvent {
                object: format!(
                    "{}/{}",
                    reference.namespace.as_deref().unwrap_or_default(),
                    reference.name.as_deref().unwrap_or_default()
                ),
                warning: matches!(type_, EventType::Warning),
                reason: reason.to_string(),
                note,
            });
    }
}
