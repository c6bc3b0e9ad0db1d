use std::collections::BTreeMap;

use chia_api::consts::{
    KEY_DNS_INTRODUCER_ADDRESS, KEY_INTRODUCER_ADDRESS, KEY_NETWORK, KEY_NETWORK_CONFIG,
    KEY_NETWORK_CONSTANTS, KEY_NETWORK_PORT,
};
use chia_api::ChiaNetwork;
use chia_core::overrides::marshal;
use chia_core::Result;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::{watcher, Controller};
use kube::Client;

use crate::assemble::metadata::ResourceMeta;
use crate::assemble::{Child, Inputs};
use crate::reconciler::{scoped_api, Controlled};

impl Controlled for ChiaNetwork {
    /// A single ConfigMap named after the network resource. Unset fields leave their key out.
    fn assemble(&self, _inputs: &Inputs) -> Result<Vec<Child>> {
        let meta = ResourceMeta::new(self, &self.spec.additional_metadata)?;
        let network_name = self.network_name();
        let spec = &self.spec;

        let mut data = BTreeMap::new();
        data.insert(KEY_NETWORK.to_string(), network_name.clone());
        if let Some(port) = spec.network_port {
            data.insert(KEY_NETWORK_PORT.to_string(), port.to_string());
        }
        if let Some(address) = &spec.introducer_address {
            data.insert(KEY_INTRODUCER_ADDRESS.to_string(), address.clone());
        }
        if let Some(address) = &spec.dns_introducer_address {
            data.insert(KEY_DNS_INTRODUCER_ADDRESS.to_string(), address.clone());
        }
        if let Some(constants) = &spec.network_constants {
            data.insert(
                KEY_NETWORK_CONSTANTS.to_string(),
                marshal(&network_name, constants)?,
            );
        }
        if let Some(config) = &spec.network_config {
            data.insert(KEY_NETWORK_CONFIG.to_string(), marshal(&network_name, config)?);
        }

        Ok(vec![Child::ConfigMap(ConfigMap {
            metadata: meta.object_meta(meta.child_name(None), None),
            data: Some(data),
            ..Default::default()
        })])
    }

    fn watch_children(
        controller: Controller<Self>,
        client: &Client,
        namespace: Option<&str>,
    ) -> Controller<Self> {
        controller.owns(scoped_api::<ConfigMap>(client, namespace), watcher::Config::default())
    }
}
