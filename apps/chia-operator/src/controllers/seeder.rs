use chia_api::consts::{CRAWLER_RPC_PORT, NODE_PORT, NODE_TESTNET_PORT, SEEDER_DNS_PORT};
use chia_api::ChiaSeeder;
use chia_core::Result;

use super::peer_port;
use crate::assemble::service::{port, tcp};
use crate::assemble::workload::Workload;
use crate::assemble::{Child, Inputs};
use crate::reconciler::Controlled;

impl Controlled for ChiaSeeder {
    fn network_ref(&self) -> Option<&str> {
        self.spec.chia.common.chia_network.as_deref()
    }

    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let chia = &self.spec.chia;
        let peers = peer_port(&chia.common, inputs, NODE_PORT, Some(NODE_TESTNET_PORT));
        Workload::new(
            "seeder",
            &self.spec.common,
            &chia.common,
            vec![
                tcp("peers", peers),
                port("dns", SEEDER_DNS_PORT, "TCP"),
                port("dns-udp", SEEDER_DNS_PORT, "UDP"),
            ],
            CRAWLER_RPC_PORT,
        )
        .healthcheck("/seeder")
        .env_opt("seeder_bootstrap_peers", chia.bootstrap_peer.as_ref())
        .env_opt("seeder_minimum_height", chia.minimum_height)
        .env("seeder_domain_name", &chia.domain_name)
        .env("seeder_nameserver", &chia.nameserver)
        .env("seeder_rname", &chia.rname)
        .env_opt("seeder_ttl", chia.ttl)
        .assemble(self, inputs)
    }
}
