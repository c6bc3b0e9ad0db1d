use chia_api::consts::{FARMER_PORT, FARMER_RPC_PORT};
use chia_api::ChiaFarmer;
use chia_core::Result;

use super::{json_env, peer_port};
use crate::assemble::service::tcp;
use crate::assemble::workload::Workload;
use crate::assemble::{Child, Inputs};
use crate::reconciler::Controlled;

impl Controlled for ChiaFarmer {
    fn network_ref(&self) -> Option<&str> {
        self.spec.chia.common.chia_network.as_deref()
    }

    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let chia = &self.spec.chia;
        Workload::new(
            "farmer-only",
            &self.spec.common,
            &chia.common,
            vec![tcp("peers", peer_port(&chia.common, inputs, FARMER_PORT, None))],
            FARMER_RPC_PORT,
        )
        .require_ca()
        .secret_key(chia.secret_key.as_ref(), true)
        .env_opt("full_node_peers", json_env(&chia.full_node_peers)?)
        .assemble(self, inputs)
    }
}
