use chia_api::consts::{CRAWLER_RPC_PORT, NODE_PORT, NODE_TESTNET_PORT};
use chia_api::ChiaCrawler;
use chia_core::Result;

use super::peer_port;
use crate::assemble::service::tcp;
use crate::assemble::workload::Workload;
use crate::assemble::{Child, Inputs};
use crate::reconciler::Controlled;

impl Controlled for ChiaCrawler {
    fn network_ref(&self) -> Option<&str> {
        self.spec.chia.chia_network.as_deref()
    }

    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let chia = &self.spec.chia;
        let peers = peer_port(chia, inputs, NODE_PORT, Some(NODE_TESTNET_PORT));
        Workload::new(
            "crawler",
            &self.spec.common,
            chia,
            vec![tcp("peers", peers)],
            CRAWLER_RPC_PORT,
        )
        .assemble(self, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::fixtures::{container, deployment, placed};
    use chia_api::ChiaCrawlerSpec;
    use k8s_openapi::api::core::v1::{EmptyDirVolumeSource, Volume, VolumeMount};

    #[test]
    fn default_storage_is_an_empty_dir() {
        let crawler = placed(ChiaCrawler::new("foo", ChiaCrawlerSpec::default()), "ns");
        let children = crawler.assemble(&Inputs::default()).unwrap();
        assert!(!children
            .iter()
            .any(|c| matches!(c, Child::PersistentVolumeClaim(_))));

        let deploy = deployment(&children);
        assert_eq!(deploy.metadata.name.as_deref(), Some("foo"));
        assert_eq!(deploy.metadata.namespace.as_deref(), Some("ns"));
        let pod = deploy.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        assert_eq!(
            pod.volumes,
            Some(vec![Volume {
                name: "chiaroot".into(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            }])
        );
        assert_eq!(
            container(deploy, "chia").volume_mounts,
            Some(vec![VolumeMount {
                name: "chiaroot".into(),
                mount_path: "/chia-data".into(),
                ..Default::default()
            }])
        );
    }
}
