use chia_api::consts::{HARVESTER_PORT, HARVESTER_RPC_PORT};
use chia_api::ChiaHarvester;
use chia_core::Result;

use super::peer_port;
use crate::assemble::service::tcp;
use crate::assemble::storage::PlotVolumes;
use crate::assemble::workload::Workload;
use crate::assemble::{Child, Inputs};
use crate::reconciler::Controlled;

impl Controlled for ChiaHarvester {
    fn network_ref(&self) -> Option<&str> {
        self.spec.chia.common.chia_network.as_deref()
    }

    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let chia = &self.spec.chia;
        let plots = self.spec.common.storage.as_ref().and_then(|s| s.plots.as_ref());
        Workload::new(
            "harvester",
            &self.spec.common,
            &chia.common,
            vec![tcp("peers", peer_port(&chia.common, inputs, HARVESTER_PORT, None))],
            HARVESTER_RPC_PORT,
        )
        .require_ca()
        .plots(PlotVolumes::from_config(plots))
        .env_opt("farmer_address", chia.farmer_address.as_ref())
        .env_opt("farmer_port", chia.farmer_port)
        .env_opt("recursive_plot_scan", chia.recursive_plot_scan)
        .assemble(self, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::fixtures::{container, deployment, env, placed};
    use chia_api::ChiaHarvesterSpec;

    #[test]
    fn plot_volumes_and_farmer_env() {
        let spec: ChiaHarvesterSpec = serde_json::from_value(serde_json::json!({
            "storage": {
                "plots": {
                    "persistentVolumeClaim": [{"claimName": "plots-a", "readOnly": true}],
                    "hostPathVolume": [{"path": "/mnt/plots"}]
                }
            },
            "chia": {
                "caSecretName": "ca",
                "farmerAddress": "farmer.chia.svc",
                "farmerPort": 8447,
                "recursivePlotScan": true
            }
        }))
        .unwrap();
        let harvester = placed(ChiaHarvester::new("harv", spec), "chia");
        let children = harvester.assemble(&Inputs::default()).unwrap();
        let deploy = deployment(&children);
        let chia = container(deploy, "chia");
        assert_eq!(env(chia, "service").as_deref(), Some("harvester"));
        assert_eq!(env(chia, "farmer_address").as_deref(), Some("farmer.chia.svc"));
        assert_eq!(env(chia, "farmer_port").as_deref(), Some("8447"));
        assert_eq!(env(chia, "recursive_plot_scan").as_deref(), Some("true"));
        assert_eq!(
            env(chia, "plots_dir").as_deref(),
            Some("/plots/pvc-0:/plots/hostpath-0")
        );
        let mounts: Vec<_> = chia
            .volume_mounts
            .iter()
            .flatten()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(
            mounts,
            vec!["chiaroot", "secret-ca", "plots-pvc-0", "plots-hostpath-0"]
        );
    }
}
