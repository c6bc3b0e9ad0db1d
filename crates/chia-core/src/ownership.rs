use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use crate::error::{Error, Result};

/// Controller reference to `parent`; children are garbage collected with it.
pub fn owner_reference<P>(parent: &P) -> Result<OwnerReference>
where
    P: Resource<DynamicType = ()>,
{
    let meta = parent.meta();
    Ok(OwnerReference {
        api_version: P::api_version(&()).into_owned(),
        kind: P::kind(&()).into_owned(),
        name: meta.name.clone().ok_or(Error::MissingField("metadata.name"))?,
        uid: meta.uid.clone().ok_or(Error::MissingField("metadata.uid"))?,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Set `owner` as the controller of `child`, replacing any earlier reference to the same uid.
pub fn attach_owner<K: Resource>(child: &mut K, owner: &OwnerReference) {
    let refs = child.meta_mut().owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.uid != owner.uid);
    refs.push(owner.clone());
}

pub fn is_controlled_by<K: Resource>(obj: &K, owner_uid: &str) -> bool {
    obj.meta()
        .owner_references
        .iter()
        .flatten()
        .any(|r| r.uid == owner_uid && r.controller == Some(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ConfigMap, Service};
    use kube::api::ObjectMeta;

    fn parent() -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("testnet".into()),
                namespace: Some("chia".into()),
                uid: Some("1234".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn reference_marks_controller() {
        let owner = owner_reference(&parent()).expect("owner");
        assert_eq!(owner.kind, "ConfigMap");
        assert_eq!(owner.api_version, "v1");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(owner.block_owner_deletion, Some(true));
    }

    #[test]
    fn reference_requires_uid() {
        let mut p = parent();
        p.metadata.uid = None;
        assert!(matches!(
            owner_reference(&p),
            Err(Error::MissingField("metadata.uid"))
        ));
    }

    #[test]
    fn attach_is_idempotent() {
        let owner = owner_reference(&parent()).expect("owner");
        let mut child = Service::default();
        attach_owner(&mut child, &owner);
        attach_owner(&mut child, &owner);
        assert_eq!(child.metadata.owner_references.as_ref().map(Vec::len), Some(1));
        assert!(is_controlled_by(&child, "1234"));
        assert!(!is_controlled_by(&child, "other"));
    }
}
