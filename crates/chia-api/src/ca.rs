use k8s_openapi::api::core::v1::LocalObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{AdditionalMetadata, ChiaStatus};

/// A private chia CA, minted once by a ca-gen Job into `secret`.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaCA",
    namespaced,
    status = "ChiaStatus",
    shortname = "cca",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaCASpec {
    #[serde(default)]
    pub additional_metadata: AdditionalMetadata,
    pub image: Option<String>,
    pub image_pull_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
    /// Name of the Secret the CA is written to.
    pub secret: String,
}
