use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{ChiaStatus, CommonSpec, CommonSpecChia, Peer, SecretKeyRef};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaFarmer",
    namespaced,
    status = "ChiaStatus",
    shortname = "cf",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaFarmerSpec {
    #[serde(flatten)]
    pub common: CommonSpec,
    #[serde(default)]
    pub chia: ChiaFarmerConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaFarmerConfig {
    #[serde(flatten)]
    pub common: CommonSpecChia,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub full_node_peers: Vec<Peer>,
    pub secret_key: Option<SecretKeyRef>,
}
