//! Custom resources of the `k8s.chia.net/v1` API group.
//!
//! Every kind shares the [`ChiaStatus`] subresource; node-like kinds embed
//! [`CommonSpec`] (pod settings) and [`CommonSpecChia`] (chia container settings).

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

mod ca;
pub mod common;
pub mod consts;
mod crawler;
mod farmer;
mod harvester;
mod introducer;
mod network;
mod node;
mod seeder;
mod timelord;
mod wallet;

pub use ca::{ChiaCA, ChiaCASpec};
pub use common::{
    AdditionalMetadata, ChiaExporterConfig, ChiaHealthcheckConfig, ChiaRootConfig, ChiaStatus,
    CommonSpec, CommonSpecChia, HostPathVolumeConfig, InitContainer, Peer,
    PersistentVolumeClaimConfig, PlotClaim, PlotsConfig, SecretKeyRef, ServiceConfig, Sidecars,
    StorageConfig,
};
pub use crawler::{ChiaCrawler, ChiaCrawlerSpec};
pub use farmer::{ChiaFarmer, ChiaFarmerConfig, ChiaFarmerSpec};
pub use harvester::{ChiaHarvester, ChiaHarvesterConfig, ChiaHarvesterSpec};
pub use introducer::{ChiaIntroducer, ChiaIntroducerSpec};
pub use network::{ChiaNetwork, ChiaNetworkSpec, NetworkConfig, NetworkConstants};
pub use node::{ChiaNode, ChiaNodeConfig, ChiaNodeSpec};
pub use seeder::{ChiaSeeder, ChiaSeederConfig, ChiaSeederSpec};
pub use timelord::{ChiaTimelord, ChiaTimelordConfig, ChiaTimelordSpec};
pub use wallet::{ChiaWallet, ChiaWalletConfig, ChiaWalletSpec};

/// Status access shared by every kind in the group.
pub trait ChiaResource {
    fn ready(&self) -> bool;
    fn set_ready(&mut self, ready: bool);
}

macro_rules! impl_chia_resource {
    ($($kind:ty),* $(,)?) => {
        $(
            impl ChiaResource for $kind {
                fn ready(&self) -> bool {
                    self.status.as_ref().map(|s| s.ready).unwrap_or(false)
                }

                fn set_ready(&mut self, ready: bool) {
                    self.status.get_or_insert_with(ChiaStatus::default).ready = ready;
                }
            }
        )*
    };
}

impl_chia_resource!(
    ChiaCA,
    ChiaCrawler,
    ChiaFarmer,
    ChiaHarvester,
    ChiaIntroducer,
    ChiaNetwork,
    ChiaNode,
    ChiaSeeder,
    ChiaTimelord,
    ChiaWallet,
);

/// Every CustomResourceDefinition served by the operator, ordered by kind.
pub fn crds() -> Vec<CustomResourceDefinition> {
    vec![
        ChiaCA::crd(),
        ChiaCrawler::crd(),
        ChiaFarmer::crd(),
        ChiaHarvester::crd(),
        ChiaIntroducer::crd(),
        ChiaNetwork::crd(),
        ChiaNode::crd(),
        ChiaSeeder::crd(),
        ChiaTimelord::crd(),
        ChiaWallet::crd(),
    ]
}
