//! Child objects of the node-like kinds: one Deployment running chia and
//! its sidecars, the Services in front of it, and optionally a claim.

use chia_api::consts::{
    ANNOTATION_NETWORK_HASH, CA_PATH, CA_VOLUME, CHIA_EXPORTER_PORT, CHIA_HEALTHCHECK_PORT,
    DAEMON_PORT, KEY_PATH, KEY_VOLUME,
};
use chia_api::{CommonSpec, CommonSpecChia, SecretKeyRef};
use chia_core::{Error, Result};
use k8s_openapi::api::core::v1::{SecretVolumeSource, ServicePort, Volume, VolumeMount};
use kube::Resource;

use super::container::{
    chia_env, container_ports, exporter_container, healthcheck_container, init_containers,
    ChiaContainer,
};
use super::deployment::{deployment, PodContents};
use super::metadata::ResourceMeta;
use super::service::{service, tcp};
use super::storage::{chia_root_mount, ChiaRootVolume, PlotVolumes};
use super::{network_hash, Child, Inputs};

/// What distinguishes one node-like kind from another.
pub struct Workload<'a> {
    /// Value of the chia `service` env var.
    pub service: &'static str,
    pub common: &'a CommonSpec,
    pub chia: &'a CommonSpecChia,
    pub require_ca: bool,
    /// Ports on the peer Service and the chia container.
    pub peer_ports: Vec<ServicePort>,
    pub rpc_port: i32,
    /// Healthcheck endpoint path when the kind supports the healthcheck sidecar.
    pub healthcheck_path: Option<&'static str>,
    /// Mnemonic secret and whether the kind refuses to run without one.
    pub secret_key: Option<&'a SecretKeyRef>,
    pub require_secret_key: bool,
    pub plots: PlotVolumes,
    pub env: Vec<(String, String)>,
}

impl<'a> Workload<'a> {
    pub fn new(
        service: &'static str,
        common: &'a CommonSpec,
        chia: &'a CommonSpecChia,
        peer_ports: Vec<ServicePort>,
        rpc_port: i32,
    ) -> Self {
        Self {
            service,
            common,
            chia,
            require_ca: false,
            peer_ports,
            rpc_port,
            healthcheck_path: None,
            secret_key: None,
            require_secret_key: false,
            plots: PlotVolumes::default(),
            env: Vec::new(),
        }
    }

    pub fn require_ca(mut self) -> Self {
        self.require_ca = true;
        self
    }

    pub fn healthcheck(mut self, path: &'static str) -> Self {
        self.healthcheck_path = Some(path);
        self
    }

    pub fn secret_key(mut self, key: Option<&'a SecretKeyRef>, required: bool) -> Self {
        self.secret_key = key;
        self.require_secret_key = required;
        self
    }

    pub fn plots(mut self, plots: PlotVolumes) -> Self {
        self.plots = plots;
        self
    }

    pub fn env(mut self, name: &str, value: impl ToString) -> Self {
        self.env.push((name.to_string(), value.to_string()));
        self
    }

    pub fn env_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.env(name, value),
            None => self,
        }
    }

    /// Services first, then the claim, then the Deployment.
    pub fn assemble<K>(self, resource: &K, inputs: &Inputs) -> Result<Vec<Child>>
    where
        K: Resource<DynamicType = ()>,
    {
        let meta = ResourceMeta::new(resource, &self.common.additional_metadata)?;
        let identity = format!("{} {}/{}", meta.kind, meta.namespace, meta.name);
        if self.require_ca && self.chia.ca_secret_name.is_none() {
            return Err(Error::MissingConfig(format!(
                "{identity}: spec.chia.caSecretName is required"
            )));
        }
        if self.require_secret_key && self.secret_key.is_none() {
            return Err(Error::MissingConfig(format!(
                "{identity}: spec.chia.secretKey is required"
            )));
        }
        let root = ChiaRootVolume::resolve(&meta.name, self.common.storage.as_ref())?;

        let exporter = self
            .common
            .chia_exporter
            .clone()
            .unwrap_or_default();
        let exporter_enabled = exporter.enabled.unwrap_or(true);
        let healthcheck = self.common.chia_healthcheck.clone().unwrap_or_default();
        let healthcheck_path = self
            .healthcheck_path
            .filter(|_| healthcheck.enabled == Some(true));

        let daemon = tcp("daemon", DAEMON_PORT);
        let rpc = tcp("rpc", self.rpc_port);
        let metrics = tcp("metrics", CHIA_EXPORTER_PORT);
        let health = tcp("health", CHIA_HEALTHCHECK_PORT);

        let mut children = Vec::new();
        children.push(service(
            &meta,
            None,
            self.common.peer_service.as_ref(),
            self.peer_ports.clone(),
        ));
        let mut all_ports = self.peer_ports.clone();
        all_ports.extend([daemon.clone(), rpc.clone()]);
        if exporter_enabled {
            all_ports.push(metrics.clone());
        }
        if healthcheck_path.is_some() {
            all_ports.push(health.clone());
        }
        children.push(service(
            &meta,
            Some("all"),
            self.common.all_service.as_ref(),
            all_ports,
        ));
        children.push(service(
            &meta,
            Some("daemon"),
            self.common.daemon_service.as_ref(),
            vec![daemon.clone()],
        ));
        children.push(service(
            &meta,
            Some("rpc"),
            self.common.rpc_service.as_ref(),
            vec![rpc.clone()],
        ));
        children.push(if exporter_enabled {
            service(&meta, Some("metrics"), exporter.service.as_ref(), vec![metrics])
        } else {
            Child::AbsentService(meta.child_name(Some("metrics")))
        });
        if self.healthcheck_path.is_some() {
            children.push(if healthcheck_path.is_some() {
                service(
                    &meta,
                    Some("healthcheck"),
                    healthcheck.service.as_ref(),
                    vec![health],
                )
            } else {
                Child::AbsentService(meta.child_name(Some("healthcheck")))
            });
        }
        if let Some(claim) = root.claim(&meta) {
            children.push(Child::PersistentVolumeClaim(claim));
        }

        let mut volumes = vec![root.volume()];
        let mut mounts = vec![chia_root_mount()];
        if let Some(ca) = self.chia.ca_secret_name.as_ref() {
            volumes.push(secret_volume(CA_VOLUME, ca));
            mounts.push(read_only_mount(CA_VOLUME, CA_PATH));
        }
        if let Some(key) = self.secret_key {
            volumes.push(secret_volume(KEY_VOLUME, &key.name));
            mounts.push(read_only_mount(KEY_VOLUME, KEY_PATH));
        }
        volumes.extend(self.plots.volumes.iter().cloned());
        mounts.extend(self.plots.mounts.iter().cloned());

        let mut kind_env = self.env.clone();
        if let Some(dir) = self.plots.plots_dir() {
            kind_env.push(("plots_dir".into(), dir));
        }
        let env = chia_env(
            self.service,
            self.chia,
            &inputs.network,
            self.secret_key.map(|k| k.key.as_str()),
            &kind_env,
        );
        let mut ports = container_ports(&self.peer_ports);
        ports.extend(container_ports(&[daemon, rpc]));

        let pull_policy = self.common.image_pull_policy.clone();
        let chia = ChiaContainer {
            image: self
                .chia
                .image
                .clone()
                .unwrap_or_else(|| inputs.images.chia.clone()),
            image_pull_policy: pull_policy.clone(),
            chia: self.chia,
            env,
            ports,
            volume_mounts: mounts,
            healthcheck_path,
        }
        .build();

        let mut pod = PodContents {
            init_containers: init_containers(&self.common.init_containers, &chia),
            containers: vec![chia],
            volumes,
            ..Default::default()
        };
        if exporter_enabled {
            pod.containers.push(exporter_container(
                &exporter,
                &inputs.images.chia_exporter,
                pull_policy.clone(),
            ));
        }
        if healthcheck_path.is_some() {
            pod.containers.push(healthcheck_container(
                &healthcheck,
                &inputs.images.chia_healthcheck,
                pull_policy,
            ));
        }
        if !inputs.network.is_empty() {
            pod.annotations.insert(
                ANNOTATION_NETWORK_HASH.to_string(),
                network_hash(&inputs.network),
            );
        }
        children.push(Child::Deployment(deployment(&meta, self.common, pod)));
        Ok(children)
    }
}

fn secret_volume(name: &str, secret: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn read_only_mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}
