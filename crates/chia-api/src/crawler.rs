use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{ChiaStatus, CommonSpec, CommonSpecChia};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaCrawler",
    namespaced,
    status = "ChiaStatus",
    shortname = "ccr",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaCrawlerSpec {
    #[serde(flatten)]
    pub common: CommonSpec,
    #[serde(default)]
    pub chia: CommonSpecChia,
}
