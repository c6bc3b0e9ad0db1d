//! CHIA_ROOT volume policy and harvester plot volumes.

use std::collections::BTreeMap;

use chia_api::consts::{CHIA_ROOT_PATH, CHIA_ROOT_VOLUME, PLOTS_PATH};
use chia_api::{PlotsConfig, StorageConfig};
use chia_core::quantity::parse_quantity;
use chia_core::{Error, Result};
use k8s_openapi::api::core::v1::{
    EmptyDirVolumeSource, HostPathVolumeSource, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Volume, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::metadata::ResourceMeta;

const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";

/// Where CHIA_ROOT lives. Exactly one source backs the `chiaroot` volume.
#[derive(Debug, Clone, PartialEq)]
pub enum ChiaRootVolume {
    EmptyDir,
    /// A claim named after the resource, created alongside it.
    GeneratedClaim {
        claim_name: String,
        storage_class: Option<String>,
        request: Quantity,
        access_modes: Vec<String>,
    },
    ExistingClaim(String),
    HostPath(String),
}

impl ChiaRootVolume {
    /// Precedence: generated claim, existing claim, host path, emptyDir.
    pub fn resolve(resource_name: &str, storage: Option<&StorageConfig>) -> Result<Self> {
        let Some(root) = storage.and_then(|s| s.chia_root.as_ref()) else {
            return Ok(ChiaRootVolume::EmptyDir);
        };
        if let Some(pvc) = root.persistent_volume_claim.as_ref() {
            if pvc.generate_volume_claims {
                let raw = pvc.resource_request.as_deref().ok_or_else(|| {
                    Error::MissingConfig(
                        "storage.chiaRoot.persistentVolumeClaim.resourceRequest is required when generateVolumeClaims is true".into(),
                    )
                })?;
                let request = parse_quantity(
                    "storage.chiaRoot.persistentVolumeClaim.resourceRequest",
                    raw,
                )?;
                let access_modes = if pvc.access_modes.is_empty() {
                    vec![DEFAULT_ACCESS_MODE.to_string()]
                } else {
                    pvc.access_modes.clone()
                };
                return Ok(ChiaRootVolume::GeneratedClaim {
                    claim_name: resource_name.to_string(),
                    storage_class: pvc.storage_class.clone(),
                    request,
                    access_modes,
                });
            }
            if let Some(claim) = pvc.claim_name.as_ref().filter(|c| !c.is_empty()) {
                return Ok(ChiaRootVolume::ExistingClaim(claim.clone()));
            }
            return Err(Error::MissingConfig(
                "storage.chiaRoot.persistentVolumeClaim needs claimName or generateVolumeClaims"
                    .into(),
            ));
        }
        match root.host_path_volume.as_ref() {
            Some(host) => Ok(ChiaRootVolume::HostPath(host.path.clone())),
            None => Ok(ChiaRootVolume::EmptyDir),
        }
    }

    pub fn volume(&self) -> Volume {
        let mut volume = Volume {
            name: CHIA_ROOT_VOLUME.to_string(),
            ..Default::default()
        };
        match self {
            ChiaRootVolume::EmptyDir => {
                volume.empty_dir = Some(EmptyDirVolumeSource::default());
            }
            ChiaRootVolume::GeneratedClaim { claim_name, .. }
            | ChiaRootVolume::ExistingClaim(claim_name) => {
                volume.persistent_volume_claim = Some(PersistentVolumeClaimVolumeSource {
                    claim_name: claim_name.clone(),
                    read_only: None,
                });
            }
            ChiaRootVolume::HostPath(path) => {
                volume.host_path = Some(HostPathVolumeSource {
                    path: path.clone(),
                    type_: Some("DirectoryOrCreate".into()),
                });
            }
        }
        volume
    }

    /// The claim to create; only generated claims produce one.
    pub fn claim(&self, meta: &ResourceMeta) -> Option<PersistentVolumeClaim> {
        let ChiaRootVolume::GeneratedClaim {
            claim_name,
            storage_class,
            request,
            access_modes,
        } = self
        else {
            return None;
        };
        Some(PersistentVolumeClaim {
            metadata: meta.object_meta(claim_name.clone(), None),
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(access_modes.clone()),
                storage_class_name: storage_class.clone(),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([("storage".to_string(), request.clone())])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

pub fn chia_root_mount() -> VolumeMount {
    VolumeMount {
        name: CHIA_ROOT_VOLUME.to_string(),
        mount_path: CHIA_ROOT_PATH.to_string(),
        ..Default::default()
    }
}

/// Plot directories mounted under `/plots`, with their mount paths in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotVolumes {
    pub volumes: Vec<Volume>,
    pub mounts: Vec<VolumeMount>,
}

impl PlotVolumes {
    pub fn from_config(plots: Option<&PlotsConfig>) -> Self {
        let mut out = PlotVolumes::default();
        let Some(plots) = plots else {
            return out;
        };
        for (i, claim) in plots.persistent_volume_claim.iter().enumerate() {
            let name = format!("plots-pvc-{i}");
            out.volumes.push(Volume {
                name: name.clone(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: claim.claim_name.clone(),
                    read_only: claim.read_only.then_some(true),
                }),
                ..Default::default()
            });
            out.mounts.push(VolumeMount {
                name,
                mount_path: format!("{PLOTS_PATH}/pvc-{i}"),
                read_only: claim.read_only.then_some(true),
                ..Default::default()
            });
        }
        for (i, host) in plots.host_path_volume.iter().enumerate() {
            let name = format!("plots-hostpath-{i}");
            out.volumes.push(Volume {
                name: name.clone(),
                host_path: Some(HostPathVolumeSource {
                    path: host.path.clone(),
                    type_: Some("Directory".into()),
                }),
                ..Default::default()
            });
            out.mounts.push(VolumeMount {
                name,
                mount_path: format!("{PLOTS_PATH}/hostpath-{i}"),
                ..Default::default()
            });
        }
        out
    }

    /// Colon-separated mount paths, the form chia reads from `plots_dir`.
    pub fn plots_dir(&self) -> Option<String> {
        (!self.mounts.is_empty()).then(|| {
            self.mounts
                .iter()
                .map(|m| m.mount_path.as_str())
                .collect::<Vec<_>>()
                .join(":")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chia_api::{ChiaRootConfig, HostPathVolumeConfig, PersistentVolumeClaimConfig, PlotClaim};

    fn storage(
        pvc: Option<PersistentVolumeClaimConfig>,
        host: Option<&str>,
    ) -> StorageConfig {
        StorageConfig {
            chia_root: Some(ChiaRootConfig {
                persistent_volume_claim: pvc,
                host_path_volume: host.map(|p| HostPathVolumeConfig { path: p.into() }),
            }),
            plots: None,
        }
    }

    fn generated(request: Option<&str>) -> PersistentVolumeClaimConfig {
        PersistentVolumeClaimConfig {
            generate_volume_claims: true,
            resource_request: request.map(Into::into),
            storage_class: Some("fast".into()),
            ..Default::default()
        }
    }

    fn existing(name: &str) -> PersistentVolumeClaimConfig {
        PersistentVolumeClaimConfig {
            claim_name: Some(name.into()),
            ..Default::default()
        }
    }

    #[test]
    fn nothing_configured_is_empty_dir() {
        assert_eq!(ChiaRootVolume::resolve("foo", None).unwrap(), ChiaRootVolume::EmptyDir);
        let empty = StorageConfig::default();
        assert_eq!(
            ChiaRootVolume::resolve("foo", Some(&empty)).unwrap(),
            ChiaRootVolume::EmptyDir
        );
        let volume = ChiaRootVolume::EmptyDir.volume();
        assert_eq!(volume.name, "chiaroot");
        assert!(volume.empty_dir.is_some());
    }

    #[test]
    fn generated_claim_wins_over_everything() {
        let mut pvc = generated(Some("300Gi"));
        pvc.claim_name = Some("ignored".into());
        let resolved = ChiaRootVolume::resolve("node", Some(&storage(Some(pvc), Some("/mnt")))).unwrap();
        assert!(matches!(
            &resolved,
            ChiaRootVolume::GeneratedClaim { claim_name, request, access_modes, .. }
                if claim_name == "node" && request.0 == "300Gi" && access_modes == &["ReadWriteOnce"]
        ));
        let volume = resolved.volume();
        assert_eq!(volume.persistent_volume_claim.unwrap().claim_name, "node");
        assert!(volume.host_path.is_none() && volume.empty_dir.is_none());
    }

    #[test]
    fn existing_claim_wins_over_host_path() {
        let resolved =
            ChiaRootVolume::resolve("node", Some(&storage(Some(existing("data")), Some("/mnt")))).unwrap();
        assert_eq!(resolved, ChiaRootVolume::ExistingClaim("data".into()));
        let meta = meta();
        assert!(resolved.claim(&meta).is_none());
    }

    #[test]
    fn host_path_alone() {
        let resolved = ChiaRootVolume::resolve("node", Some(&storage(None, Some("/mnt/chia")))).unwrap();
        assert_eq!(resolved, ChiaRootVolume::HostPath("/mnt/chia".into()));
        let volume = resolved.volume();
        assert_eq!(volume.host_path.unwrap().path, "/mnt/chia");
        assert!(volume.persistent_volume_claim.is_none());
    }

    #[test]
    fn generate_without_request_is_an_error() {
        let err = ChiaRootVolume::resolve("node", Some(&storage(Some(generated(None)), None)))
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfig(_)));
    }

    #[test]
    fn malformed_request_is_an_error() {
        let err = ChiaRootVolume::resolve("node", Some(&storage(Some(generated(Some("lots"))), None)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity { .. }));
    }

    #[test]
    fn claim_block_without_source_is_an_error() {
        let pvc = PersistentVolumeClaimConfig::default();
        let err = ChiaRootVolume::resolve("node", Some(&storage(Some(pvc), None))).unwrap_err();
        assert!(matches!(err, Error::MissingConfig(_)));
    }

    #[test]
    fn empty_claim_block_is_an_error_even_with_host_path() {
        let pvc = PersistentVolumeClaimConfig::default();
        assert!(ChiaRootVolume::resolve("node", Some(&storage(Some(pvc), Some("/mnt")))).is_err());
    }

    fn meta() -> ResourceMeta {
        ResourceMeta {
            kind: "ChiaNode".into(),
            name: "node".into(),
            namespace: "chia".into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    #[test]
    fn generated_claim_spec() {
        let resolved = ChiaRootVolume::resolve("node", Some(&storage(Some(generated(Some("1Ti"))), None))).unwrap();
        let claim = resolved.claim(&meta()).expect("claim");
        assert_eq!(claim.metadata.name.as_deref(), Some("node"));
        let spec = claim.spec.unwrap();
        assert_eq!(spec.storage_class_name.as_deref(), Some("fast"));
        let requests = spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests["storage"].0, "1Ti");
    }

    #[test]
    fn plots_are_mounted_in_order() {
        let plots = PlotsConfig {
            persistent_volume_claim: vec![PlotClaim {
                claim_name: "plots-a".into(),
                read_only: true,
            }],
            host_path_volume: vec![HostPathVolumeConfig {
                path: "/mnt/disk1".into(),
            }],
        };
        let volumes = PlotVolumes::from_config(Some(&plots));
        assert_eq!(volumes.volumes.len(), 2);
        assert_eq!(volumes.mounts[0].read_only, Some(true));
        assert_eq!(
            volumes.plots_dir().as_deref(),
            Some("/plots/pvc-0:/plots/hostpath-0")
        );
        assert_eq!(PlotVolumes::from_config(None).plots_dir(), None);
    }
}
