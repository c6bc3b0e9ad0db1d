use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{AdditionalMetadata, ChiaStatus};

/// Network-wide parameters published as a ConfigMap for other kinds to consume.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "k8s.chia.net",
    version = "v1",
    kind = "ChiaNetwork",
    namespaced,
    status = "ChiaStatus",
    shortname = "cnet",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ChiaNetworkSpec {
    #[serde(default)]
    pub additional_metadata: AdditionalMetadata,
    /// Name the chia config knows the network by. Defaults to the resource name.
    pub network_name: Option<String>,
    pub network_port: Option<u16>,
    pub introducer_address: Option<String>,
    pub dns_introducer_address: Option<String>,
    pub network_constants: Option<NetworkConstants>,
    pub network_config: Option<NetworkConfig>,
}

/// Consensus constant overrides. Field names match chia's `constants` section verbatim.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NetworkConstants {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agg_sig_me_additional_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_constant_factor: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_starting: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch_blocks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis_challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis_pre_farm_farmer_puzzle_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis_pre_farm_pool_puzzle_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_fork_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mempool_block_buffer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_plot_size: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_filter_128_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_filter_64_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_filter_32_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_slot_iters_starting: Option<u64>,
}

/// Network-level config overrides (`network_overrides.config`).
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct NetworkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_full_node_port: Option<u16>,
}

impl ChiaNetwork {
    /// The key chia uses for this network in its config.
    pub fn network_name(&self) -> String {
        self.spec
            .network_name
            .clone()
            .unwrap_or_else(|| kube::ResourceExt::name_any(self))
    }
}
