use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::DeploymentStrategy;
use k8s_openapi::api::core::v1::{
    Affinity, Container, EnvVar, LocalObjectReference, PodSecurityContext, Probe,
    ResourceRequirements, SecurityContext, Toleration, TopologySpreadConstraint, Volume,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Extra labels and annotations applied to every object generated for a resource.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct AdditionalMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Observed state shared by every kind.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ChiaStatus {
    #[serde(default)]
    pub ready: bool,
}

/// Pod-level settings shared by every Deployment-backed kind.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonSpec {
    #[serde(default)]
    pub additional_metadata: AdditionalMetadata,
    pub image_pull_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
    pub chia_exporter: Option<ChiaExporterConfig>,
    pub chia_healthcheck: Option<ChiaHealthcheckConfig>,
    pub storage: Option<StorageConfig>,
    pub peer_service: Option<ServiceConfig>,
    pub all_service: Option<ServiceConfig>,
    pub daemon_service: Option<ServiceConfig>,
    pub rpc_service: Option<ServiceConfig>,
    pub sidecars: Option<Sidecars>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<InitContainer>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    pub affinity: Option<Affinity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topology_spread_constraints: Vec<TopologySpreadConstraint>,
    pub pod_security_context: Option<PodSecurityContext>,
    pub service_account_name: Option<String>,
    pub priority_class_name: Option<String>,
    /// Defaults to `Recreate`: two pods must never share one CHIA_ROOT.
    pub strategy: Option<DeploymentStrategy>,
}

/// Settings for the main chia container.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonSpecChia {
    pub image: Option<String>,
    /// Secret holding the private CA (`private_ca.crt`/`private_ca.key`).
    pub ca_secret_name: Option<String>,
    pub testnet: Option<bool>,
    pub network: Option<String>,
    pub network_port: Option<u16>,
    pub introducer_address: Option<String>,
    pub dns_introducer_address: Option<String>,
    /// Name of a ChiaNetwork in the same namespace whose ConfigMap seeds the container env.
    pub chia_network: Option<String>,
    pub timezone: Option<String>,
    pub log_level: Option<String>,
    pub liveness_probe: Option<Probe>,
    pub readiness_probe: Option<Probe>,
    pub startup_probe: Option<Probe>,
    pub resources: Option<ResourceRequirements>,
    pub security_context: Option<SecurityContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_env: Vec<EnvVar>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub enabled: Option<bool>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub external_traffic_policy: Option<String>,
    pub session_affinity: Option<String>,
    pub ip_family_policy: Option<String>,
    pub ip_families: Option<Vec<String>>,
    #[serde(default)]
    pub additional_metadata: AdditionalMetadata,
}

impl ServiceConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub chia_root: Option<ChiaRootConfig>,
    /// Plot directories; only read by ChiaHarvester.
    pub plots: Option<PlotsConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaRootConfig {
    pub persistent_volume_claim: Option<PersistentVolumeClaimConfig>,
    pub host_path_volume: Option<HostPathVolumeConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimConfig {
    /// Generate a claim named after the resource instead of mounting `claimName`.
    #[serde(default)]
    pub generate_volume_claims: bool,
    pub claim_name: Option<String>,
    pub storage_class: Option<String>,
    /// Quantity string, e.g. `300Gi`.
    pub resource_request: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct HostPathVolumeConfig {
    pub path: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlotsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persistent_volume_claim: Vec<PlotClaim>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_path_volume: Vec<HostPathVolumeConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlotClaim {
    pub claim_name: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaExporterConfig {
    pub enabled: Option<bool>,
    pub image: Option<String>,
    /// Secret mounted as env for chia-exporter (e.g. MaxMind credentials).
    pub config_secret_name: Option<String>,
    pub service: Option<ServiceConfig>,
    pub resources: Option<ResourceRequirements>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaHealthcheckConfig {
    pub enabled: Option<bool>,
    pub image: Option<String>,
    /// Hostname probed by the seeder DNS check.
    pub dns_hostname: Option<String>,
    pub service: Option<ServiceConfig>,
    pub resources: Option<ResourceRequirements>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct Sidecars {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitContainer {
    pub container: Container,
    /// Mount the chia container's volumes into this init container.
    pub share_volume_mounts: Option<bool>,
    /// Copy the chia container's env into this init container.
    pub share_env: Option<bool>,
}

/// A full_node peer, rendered into the `full_node_peers` env var as JSON.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Peer {
    pub host: String,
    pub port: u16,
}

/// Reference to a key inside a Secret holding a mnemonic.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}
