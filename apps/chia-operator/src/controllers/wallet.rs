use chia_api::consts::{WALLET_PORT, WALLET_RPC_PORT};
use chia_api::ChiaWallet;
use chia_core::Result;

use super::{json_env, peer_port};
use crate::assemble::service::tcp;
use crate::assemble::workload::Workload;
use crate::assemble::{Child, Inputs};
use crate::reconciler::Controlled;

impl Controlled for ChiaWallet {
    fn network_ref(&self) -> Option<&str> {
        self.spec.chia.common.chia_network.as_deref()
    }

    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let chia = &self.spec.chia;
        Workload::new(
            "wallet",
            &self.spec.common,
            &chia.common,
            vec![tcp("peers", peer_port(&chia.common, inputs, WALLET_PORT, None))],
            WALLET_RPC_PORT,
        )
        .require_ca()
        .secret_key(chia.secret_key.as_ref(), true)
        .env_opt("full_node_peers", json_env(&chia.full_node_peers)?)
        .assemble(self, inputs)
    }
}
