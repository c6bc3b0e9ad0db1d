use std::collections::BTreeMap;

use chia_api::consts::{
    CA_PATH, CHIA_CONTAINER, CHIA_EXPORTER_CONTAINER, CHIA_EXPORTER_PORT,
    CHIA_HEALTHCHECK_CONTAINER, CHIA_HEALTHCHECK_PORT, CHIA_ROOT_PATH, KEY_PATH,
};
use chia_api::{ChiaExporterConfig, ChiaHealthcheckConfig, CommonSpecChia, InitContainer};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvFromSource, EnvVar, HTTPGetAction, Probe, SecretEnvSource,
    ServicePort, VolumeMount,
};
use chia_core::quantity::canonical_resources;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::storage::chia_root_mount;

/// Ordered env list where a later `set` replaces an earlier value in place.
///
/// Empty values are stored without a `value` field, as the apiserver does.
#[derive(Debug, Default)]
pub struct EnvBuilder {
    vars: Vec<EnvVar>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(&mut self, mut var: EnvVar) -> &mut Self {
        if var.value.as_deref() == Some("") {
            var.value = None;
        }
        match self.vars.iter_mut().find(|v| v.name == var.name) {
            Some(existing) => *existing = var,
            None => self.vars.push(var),
        }
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.var(EnvVar {
            name: name.into(),
            value: Some(value.into()),
            value_from: None,
        })
    }

    pub fn set_opt<V: ToString>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(name, value.to_string());
        }
        self
    }

    pub fn build(self) -> Vec<EnvVar> {
        self.vars
    }
}

/// Env for the chia container.
///
/// Layering, later wins: the network map, operator-computed values,
/// explicit `spec.chia` fields, kind-specific values, `additionalEnv`.
pub fn chia_env(
    service: &str,
    chia: &CommonSpecChia,
    network: &BTreeMap<String, String>,
    key_file: Option<&str>,
    kind_env: &[(String, String)],
) -> Vec<EnvVar> {
    let mut env = EnvBuilder::new();
    for (key, value) in network {
        env.set(key.clone(), value.clone());
    }
    env.set("CHIA_ROOT", CHIA_ROOT_PATH)
        .set("service", service)
        .set("self_hostname", "0.0.0.0")
        .set(
            "keys",
            key_file
                .map(|key| format!("{KEY_PATH}/{key}"))
                .unwrap_or_else(|| "none".into()),
        );
    if chia.ca_secret_name.is_some() {
        env.set("ca", CA_PATH);
    }
    if chia.testnet == Some(true) {
        env.set("testnet", "true");
    }
    env.set_opt("network", chia.network.as_ref())
        .set_opt("network_port", chia.network_port)
        .set_opt("introducer_address", chia.introducer_address.as_ref())
        .set_opt("dns_introducer_address", chia.dns_introducer_address.as_ref())
        .set_opt("TZ", chia.timezone.as_ref())
        .set_opt("log_level", chia.log_level.as_ref());
    for (key, value) in kind_env {
        env.set(key.clone(), value.clone());
    }
    for var in &chia.additional_env {
        env.var(var.clone());
    }
    env.build()
}

pub fn container_ports(ports: &[ServicePort]) -> Vec<ContainerPort> {
    ports
        .iter()
        .map(|p| ContainerPort {
            name: p.name.clone(),
            container_port: p.port,
            protocol: p.protocol.clone(),
            ..Default::default()
        })
        .collect()
}

pub fn healthcheck_probe(path: &str, failure_threshold: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(CHIA_HEALTHCHECK_PORT),
            ..Default::default()
        }),
        period_seconds: Some(10),
        failure_threshold: Some(failure_threshold),
        ..Default::default()
    }
}

pub struct ChiaContainer<'a> {
    pub image: String,
    pub image_pull_policy: Option<String>,
    pub chia: &'a CommonSpecChia,
    pub env: Vec<EnvVar>,
    pub ports: Vec<ContainerPort>,
    pub volume_mounts: Vec<VolumeMount>,
    /// Path on the healthcheck sidecar backing default probes, when it runs.
    pub healthcheck_path: Option<&'a str>,
}

impl ChiaContainer<'_> {
    pub fn build(self) -> Container {
        let chia = self.chia;
        let default_probe =
            |threshold: i32| self.healthcheck_path.map(|p| healthcheck_probe(p, threshold));
        Container {
            name: CHIA_CONTAINER.to_string(),
            image: Some(self.image.clone()),
            image_pull_policy: self.image_pull_policy.clone(),
            env: Some(self.env.clone()),
            ports: Some(self.ports.clone()),
            volume_mounts: Some(self.volume_mounts.clone()),
            liveness_probe: chia.liveness_probe.clone().or_else(|| default_probe(3)),
            readiness_probe: chia.readiness_probe.clone().or_else(|| default_probe(3)),
            startup_probe: chia.startup_probe.clone().or_else(|| default_probe(30)),
            resources: chia.resources.clone().map(canonical_resources),
            security_context: chia.security_context.clone(),
            ..Default::default()
        }
    }
}

pub fn exporter_container(
    config: &ChiaExporterConfig,
    default_image: &str,
    image_pull_policy: Option<String>,
) -> Container {
    Container {
        name: CHIA_EXPORTER_CONTAINER.to_string(),
        image: Some(config.image.clone().unwrap_or_else(|| default_image.into())),
        image_pull_policy,
        env: Some(vec![EnvVar {
            name: "CHIA_ROOT".into(),
            value: Some(CHIA_ROOT_PATH.into()),
            value_from: None,
        }]),
        env_from: config.config_secret_name.as_ref().map(|name| {
            vec![EnvFromSource {
                secret_ref: Some(SecretEnvSource {
                    name: name.clone(),
                    optional: None,
                }),
                ..Default::default()
            }]
        }),
        ports: Some(vec![ContainerPort {
            name: Some("metrics".into()),
            container_port: CHIA_EXPORTER_PORT,
            protocol: Some("TCP".into()),
            ..Default::default()
        }]),
        volume_mounts: Some(vec![chia_root_mount()]),
        resources: config.resources.clone().map(canonical_resources),
        ..Default::default()
    }
}

pub fn healthcheck_container(
    config: &ChiaHealthcheckConfig,
    default_image: &str,
    image_pull_policy: Option<String>,
) -> Container {
    let mut env = EnvBuilder::new();
    env.set("CHIA_ROOT", CHIA_ROOT_PATH)
        .set_opt("CHIA_HEALTHCHECK_DNS_HOSTNAME", config.dns_hostname.as_ref());
    Container {
        name: CHIA_HEALTHCHECK_CONTAINER.to_string(),
        image: Some(config.image.clone().unwrap_or_else(|| default_image.into())),
        image_pull_policy,
        env: Some(env.build()),
        ports: Some(vec![ContainerPort {
            name: Some("health".into()),
            container_port: CHIA_HEALTHCHECK_PORT,
            protocol: Some("TCP".into()),
            ..Default::default()
        }]),
        volume_mounts: Some(vec![chia_root_mount()]),
        resources: config.resources.clone().map(canonical_resources),
        ..Default::default()
    }
}

/// User init containers, optionally sharing the chia container's mounts and env.
pub fn init_containers(specs: &[InitContainer], chia: &Container) -> Vec<Container> {
    specs
        .iter()
        .map(|spec| {
            let mut container = spec.container.clone();
            if spec.share_volume_mounts == Some(true) {
                container
                    .volume_mounts
                    .get_or_insert_with(Vec::new)
                    .extend(chia.volume_mounts.iter().flatten().cloned());
            }
            if spec.share_env == Some(true) {
                container
                    .env
                    .get_or_insert_with(Vec::new)
                    .extend(chia.env.iter().flatten().cloned());
            }
            container
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(env: &[EnvVar], name: &str) -> Option<String> {
        env.iter()
            .find(|v| v.name == name)
            .and_then(|v| v.value.clone())
    }

    #[test]
    fn explicit_fields_override_network_map() {
        let network = BTreeMap::from([
            ("network".to_string(), "testnet11".to_string()),
            ("network_port".to_string(), "58444".to_string()),
            ("introducer_address".to_string(), "intro.example".to_string()),
        ]);
        let chia = CommonSpecChia {
            network_port: Some(8444),
            ca_secret_name: Some("ca".into()),
            ..Default::default()
        };
        let env = chia_env("node", &chia, &network, None, &[]);
        assert_eq!(value(&env, "network").as_deref(), Some("testnet11"));
        assert_eq!(value(&env, "network_port").as_deref(), Some("8444"));
        assert_eq!(value(&env, "introducer_address").as_deref(), Some("intro.example"));
        assert_eq!(value(&env, "ca").as_deref(), Some("/chia-ca"));
        assert_eq!(value(&env, "keys").as_deref(), Some("none"));
        assert_eq!(env.iter().filter(|v| v.name == "network_port").count(), 1);
    }

    #[test]
    fn additional_env_wins_last() {
        let chia = CommonSpecChia {
            log_level: Some("INFO".into()),
            additional_env: vec![EnvVar {
                name: "log_level".into(),
                value: Some("DEBUG".into()),
                value_from: None,
            }],
            ..Default::default()
        };
        let kind_env = vec![("log_level".to_string(), "WARNING".to_string())];
        let env = chia_env("farmer-only", &chia, &BTreeMap::new(), Some("mnemonic"), &kind_env);
        assert_eq!(value(&env, "log_level").as_deref(), Some("DEBUG"));
        assert_eq!(value(&env, "keys").as_deref(), Some("/key/mnemonic"));
        assert_eq!(value(&env, "service").as_deref(), Some("farmer-only"));
        assert!(value(&env, "ca").is_none());
    }

    #[test]
    fn healthcheck_fills_only_unset_probes() {
        let chia = CommonSpecChia {
            liveness_probe: Some(Probe {
                period_seconds: Some(99),
                ..Default::default()
            }),
            ..Default::default()
        };
        let container = ChiaContainer {
            image: "chia".into(),
            image_pull_policy: None,
            chia: &chia,
            env: vec![],
            ports: vec![],
            volume_mounts: vec![],
            healthcheck_path: Some("/full_node"),
        }
        .build();
        assert_eq!(container.liveness_probe.unwrap().period_seconds, Some(99));
        let startup = container.startup_probe.unwrap();
        assert_eq!(startup.failure_threshold, Some(30));
        let get = startup.http_get.unwrap();
        assert_eq!(get.path.as_deref(), Some("/full_node"));
        assert_eq!(get.port, IntOrString::Int(9950));
    }

    #[test]
    fn empty_values_drop_the_value_field() {
        let kind_env = vec![("seeder_domain_name".to_string(), String::new())];
        let env = chia_env("seeder", &CommonSpecChia::default(), &BTreeMap::new(), None, &kind_env);
        let var = env.iter().find(|v| v.name == "seeder_domain_name").unwrap();
        assert_eq!(var.value, None);
    }

    #[test]
    fn resources_use_stored_quantity_form() {
        use k8s_openapi::api::core::v1::ResourceRequirements;
        use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

        let chia = CommonSpecChia {
            resources: Some(ResourceRequirements {
                requests: Some(BTreeMap::from([("cpu".to_string(), Quantity("0.5".into()))])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let container = ChiaContainer {
            image: "chia".into(),
            image_pull_policy: None,
            chia: &chia,
            env: vec![],
            ports: vec![],
            volume_mounts: vec![],
            healthcheck_path: None,
        }
        .build();
        assert_eq!(container.resources.unwrap().requests.unwrap()["cpu"].0, "500m");
    }

    #[test]
    fn no_probes_without_healthcheck() {
        let chia = CommonSpecChia::default();
        let container = ChiaContainer {
            image: "chia".into(),
            image_pull_policy: None,
            chia: &chia,
            env: vec![],
            ports: vec![],
            volume_mounts: vec![],
            healthcheck_path: None,
        }
        .build();
        assert!(container.liveness_probe.is_none());
        assert!(container.readiness_probe.is_none());
        assert!(container.startup_probe.is_none());
    }

    #[test]
    fn init_containers_share_on_request() {
        let chia = Container {
            env: Some(vec![EnvVar {
                name: "CHIA_ROOT".into(),
                value: Some("/chia-data".into()),
                value_from: None,
            }]),
            volume_mounts: Some(vec![chia_root_mount()]),
            ..Default::default()
        };
        let specs = vec![
            InitContainer {
                container: Container {
                    name: "fetch".into(),
                    ..Default::default()
                },
                share_volume_mounts: Some(true),
                share_env: None,
            },
            InitContainer {
                container: Container {
                    name: "plain".into(),
                    ..Default::default()
                },
                share_volume_mounts: None,
                share_env: Some(true),
            },
        ];
        let built = init_containers(&specs, &chia);
        assert_eq!(built[0].volume_mounts.as_ref().map(Vec::len), Some(1));
        assert!(built[0].env.is_none());
        assert!(built[1].volume_mounts.is_none());
        assert_eq!(built[1].env.as_ref().map(Vec::len), Some(1));
    }
}
