use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{ChiaStatus, CommonSpec, CommonSpecChia};

/// A DNS introducer: crawler plus an authoritative DNS server for the seed domain.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaSeeder",
    namespaced,
    status = "ChiaStatus",
    shortname = "cs",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaSeederSpec {
    #[serde(flatten)]
    pub common: CommonSpec,
    #[serde(default)]
    pub chia: ChiaSeederConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaSeederConfig {
    #[serde(flatten)]
    pub common: CommonSpecChia,
    pub bootstrap_peer: Option<String>,
    pub minimum_height: Option<u64>,
    pub domain_name: String,
    pub nameserver: String,
    pub rname: String,
    pub ttl: Option<u32>,
}
