use chia_api::consts::{INTRODUCER_PORT, INTRODUCER_RPC_PORT};
use chia_api::ChiaIntroducer;
use chia_core::Result;

use super::peer_port;
use crate::assemble::service::tcp;
use crate::assemble::workload::Workload;
use crate::assemble::{Child, Inputs};
use crate::reconciler::Controlled;

impl Controlled for ChiaIntroducer {
    fn network_ref(&self) -> Option<&str> {
        self.spec.chia.chia_network.as_deref()
    }

    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let chia = &self.spec.chia;
        Workload::new(
            "introducer",
            &self.spec.common,
            chia,
            vec![tcp("peers", peer_port(chia, inputs, INTRODUCER_PORT, None))],
            INTRODUCER_RPC_PORT,
        )
        .assemble(self, inputs)
    }
}
