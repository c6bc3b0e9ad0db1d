//! Well-known ports, label keys, and default images shared by every kind.
//!
//! Port numbers mirror the defaults shipped in the chia-blockchain `config.yaml`.

pub const API_GROUP: &str = "k8s.chia.net";
pub const API_VERSION: &str = "v1";

// Ports
pub const DAEMON_PORT: i32 = 55400;
pub const NODE_PORT: i32 = 8444;
pub const NODE_TESTNET_PORT: i32 = 58444;
pub const NODE_RPC_PORT: i32 = 8555;
pub const FARMER_PORT: i32 = 8447;
pub const FARMER_RPC_PORT: i32 = 8559;
pub const HARVESTER_PORT: i32 = 8448;
pub const HARVESTER_RPC_PORT: i32 = 8560;
pub const TIMELORD_PORT: i32 = 8446;
pub const TIMELORD_RPC_PORT: i32 = 8557;
pub const INTRODUCER_PORT: i32 = 8445;
pub const INTRODUCER_RPC_PORT: i32 = 8555;
pub const CRAWLER_RPC_PORT: i32 = 8561;
pub const SEEDER_DNS_PORT: i32 = 53;
pub const WALLET_PORT: i32 = 8449;
pub const WALLET_RPC_PORT: i32 = 9256;
pub const CHIA_EXPORTER_PORT: i32 = 9914;
pub const CHIA_HEALTHCHECK_PORT: i32 = 9950;

// Labels
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_PROVENANCE_KIND: &str = "k8s.chia.net/provenance-kind";
pub const LABEL_PROVENANCE_NAME: &str = "k8s.chia.net/provenance-name";
pub const MANAGED_BY: &str = "chia-operator";

/// Pod template annotation carrying a digest of the resolved network parameters.
pub const ANNOTATION_NETWORK_HASH: &str = "k8s.chia.net/network-config-hash";

// Volumes
pub const CHIA_ROOT_VOLUME: &str = "chiaroot";
pub const CHIA_ROOT_PATH: &str = "/chia-data";
pub const CA_VOLUME: &str = "secret-ca";
pub const CA_PATH: &str = "/chia-ca";
pub const KEY_VOLUME: &str = "key";
pub const KEY_PATH: &str = "/key";
pub const PLOTS_PATH: &str = "/plots";

// Container names
pub const CHIA_CONTAINER: &str = "chia";
pub const CHIA_EXPORTER_CONTAINER: &str = "chia-exporter";
pub const CHIA_HEALTHCHECK_CONTAINER: &str = "chia-healthcheck";

// Default images
pub const DEFAULT_CHIA_IMAGE: &str = "ghcr.io/chia-network/chia:latest";
pub const DEFAULT_CHIA_EXPORTER_IMAGE: &str = "ghcr.io/chia-network/chia-exporter:latest";
pub const DEFAULT_CHIA_HEALTHCHECK_IMAGE: &str = "ghcr.io/chia-network/chia-healthcheck:latest";
pub const DEFAULT_CA_GEN_IMAGE: &str = "ghcr.io/chia-network/chia-operator/ca-gen:latest";

// ChiaNetwork ConfigMap keys. Consumed verbatim by the chia container entrypoint.
pub const KEY_NETWORK: &str = "network";
pub const KEY_NETWORK_PORT: &str = "network_port";
pub const KEY_INTRODUCER_ADDRESS: &str = "introducer_address";
pub const KEY_DNS_INTRODUCER_ADDRESS: &str = "dns_introducer_address";
pub const KEY_NETWORK_CONSTANTS: &str = "chia.network_overrides.constants";
pub const KEY_NETWORK_CONFIG: &str = "chia.network_overrides.config";
