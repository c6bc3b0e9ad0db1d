use std::collections::BTreeMap;

use chia_api::consts::{
    LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME, LABEL_PROVENANCE_KIND, LABEL_PROVENANCE_NAME,
    MANAGED_BY,
};
use chia_api::AdditionalMetadata;
use chia_core::labels::merge_layers;
use chia_core::{Error, Result};
use kube::api::ObjectMeta;
use kube::Resource;

/// Labels every child of `kind`/`name` carries before user metadata is applied.
pub fn common_labels(kind: &str, name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_INSTANCE.to_string(), name.to_string()),
        (LABEL_NAME.to_string(), name.to_string()),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string()),
        (LABEL_PROVENANCE_KIND.to_string(), kind.to_string()),
        (LABEL_PROVENANCE_NAME.to_string(), name.to_string()),
    ])
}

/// Identity and resource-level metadata shared by every child of one resource.
#[derive(Debug, Clone)]
pub struct ResourceMeta {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    /// Common labels overlaid with `additionalMetadata.labels`.
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ResourceMeta {
    pub fn new<K>(resource: &K, additional: &AdditionalMetadata) -> Result<Self>
    where
        K: Resource<DynamicType = ()>,
    {
        let meta = resource.meta();
        let name = meta.name.clone().ok_or(Error::MissingField("metadata.name"))?;
        let namespace = meta
            .namespace
            .clone()
            .ok_or(Error::MissingField("metadata.namespace"))?;
        let kind = K::kind(&()).into_owned();
        let common = common_labels(&kind, &name);
        Ok(Self {
            labels: merge_layers([&common, &additional.labels]),
            annotations: additional.annotations.clone(),
            kind,
            name,
            namespace,
        })
    }

    /// Pod selector; read back from the merged labels so it always matches the pod template.
    pub fn selector(&self) -> BTreeMap<String, String> {
        [LABEL_INSTANCE, LABEL_NAME]
            .into_iter()
            .filter_map(|key| {
                self.labels
                    .get(key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect()
    }

    /// `<name>` or `<name>-<suffix>`.
    pub fn child_name(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{}-{suffix}", self.name),
            None => self.name.clone(),
        }
    }

    /// Child metadata with per-child metadata layered over the resource's.
    pub fn object_meta(&self, name: String, child: Option<&AdditionalMetadata>) -> ObjectMeta {
        let empty = AdditionalMetadata::default();
        let child = child.unwrap_or(&empty);
        let labels = merge_layers([&self.labels, &child.labels]);
        let annotations = merge_layers([&self.annotations, &child.annotations]);
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.namespace.clone()),
            labels: Some(labels),
            annotations: (!annotations.is_empty()).then_some(annotations),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chia_api::{ChiaCrawler, ChiaCrawlerSpec};

    fn crawler() -> ChiaCrawler {
        let mut crawler = ChiaCrawler::new("foo", ChiaCrawlerSpec::default());
        crawler.metadata.namespace = Some("ns".into());
        crawler
    }

    fn additional(labels: &[(&str, &str)]) -> AdditionalMetadata {
        AdditionalMetadata {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            annotations: BTreeMap::new(),
        }
    }

    #[test]
    fn common_labels_name_the_resource() {
        let meta = ResourceMeta::new(&crawler(), &AdditionalMetadata::default()).unwrap();
        assert_eq!(meta.labels[LABEL_MANAGED_BY], "chia-operator");
        assert_eq!(meta.labels[LABEL_PROVENANCE_KIND], "ChiaCrawler");
        assert_eq!(meta.labels[LABEL_PROVENANCE_NAME], "foo");
        assert_eq!(meta.labels[LABEL_INSTANCE], "foo");
    }

    #[test]
    fn label_layers_apply_in_order() {
        let resource_level = additional(&[(LABEL_MANAGED_BY, "someone"), ("team", "infra")]);
        let meta = ResourceMeta::new(&crawler(), &resource_level).unwrap();
        let per_child = additional(&[("team", "edge")]);
        let child = meta.object_meta("foo-rpc".into(), Some(&per_child));
        let labels = child.labels.unwrap();
        assert_eq!(labels[LABEL_MANAGED_BY], "someone");
        assert_eq!(labels["team"], "edge");
        assert_eq!(labels[LABEL_PROVENANCE_NAME], "foo");
        assert_eq!(child.namespace.as_deref(), Some("ns"));
        assert!(child.annotations.is_none());
    }

    #[test]
    fn selector_follows_merged_labels() {
        let resource_level = additional(&[(LABEL_INSTANCE, "renamed")]);
        let meta = ResourceMeta::new(&crawler(), &resource_level).unwrap();
        let selector = meta.selector();
        assert_eq!(selector.len(), 2);
        assert_eq!(selector[LABEL_INSTANCE], "renamed");
        assert_eq!(selector[LABEL_NAME], "foo");
    }

    #[test]
    fn missing_namespace_is_an_error() {
        let resource = ChiaCrawler::new("foo", ChiaCrawlerSpec::default());
        assert!(ResourceMeta::new(&resource, &AdditionalMetadata::default()).is_err());
    }
}
