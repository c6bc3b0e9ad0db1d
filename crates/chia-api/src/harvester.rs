use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{ChiaStatus, CommonSpec, CommonSpecChia};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaHarvester",
    namespaced,
    status = "ChiaStatus",
    shortname = "ch",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaHarvesterSpec {
    #[serde(flatten)]
    pub common: CommonSpec,
    #[serde(default)]
    pub chia: ChiaHarvesterConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChiaHarvesterConfig {
    #[serde(flatten)]
    pub common: CommonSpecChia,
    pub farmer_address: Option<String>,
    pub farmer_port: Option<u16>,
    pub recursive_plot_scan: Option<bool>,
}
