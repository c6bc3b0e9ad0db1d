use chia_api::consts::{NODE_PORT, NODE_RPC_PORT, NODE_TESTNET_PORT};
use chia_api::ChiaNode;
use chia_core::Result;

use super::{json_env, peer_port};
use crate::assemble::service::tcp;
use crate::assemble::workload::Workload;
use crate::assemble::{Child, Inputs};
use crate::reconciler::Controlled;

impl Controlled for ChiaNode {
    fn network_ref(&self) -> Option<&str> {
        self.spec.chia.common.chia_network.as_deref()
    }

    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let chia = &self.spec.chia;
        let peers = peer_port(&chia.common, inputs, NODE_PORT, Some(NODE_TESTNET_PORT));
        Workload::new(
            "node",
            &self.spec.common,
            &chia.common,
            vec![tcp("peers", peers)],
            NODE_RPC_PORT,
        )
        .require_ca()
        .healthcheck("/full_node")
        .env_opt("trusted_cidrs", json_env(&chia.trusted_cidrs)?)
        .env_opt("full_node_peers", json_env(&chia.full_node_peers)?)
        .assemble(self, inputs)
    }
}
