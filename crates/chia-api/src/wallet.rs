use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{ChiaStatus, CommonSpec, CommonSpecChia, Peer, SecretKeyRef};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaWallet",
    namespaced,
    status = "ChiaStatus",
    shortname = "cw",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaWalletSpec {
    #[serde(flatten)]
    pub common: CommonSpec,
    #[serde(default)]
    pub chia: ChiaWalletConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaWalletConfig {
    #[serde(flatten)]
    pub common: CommonSpecChia,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub full_node_peers: Vec<Peer>,
    pub secret_key: Option<SecretKeyRef>,
}
