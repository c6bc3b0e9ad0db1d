use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{ChiaStatus, CommonSpec, CommonSpecChia, Peer};

/// A chia full_node.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaNode",
    namespaced,
    status = "ChiaStatus",
    shortname = "cn",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaNodeSpec {
    #[serde(flatten)]
    pub common: CommonSpec,
    #[serde(default)]
    pub chia: ChiaNodeConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaNodeConfig {
    #[serde(flatten)]
    pub common: CommonSpecChia,
    /// CIDRs allowed to skip peer rate limiting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_cidrs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub full_node_peers: Vec<Peer>,
}
