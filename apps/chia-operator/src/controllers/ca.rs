//! ChiaCA: a one-shot ca-gen Job, and the RBAC it needs to write its Secret.

use async_trait::async_trait;
use chia_api::ChiaCA;
use chia_core::{Cluster, Error, Result};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PodSpec, PodTemplateSpec, Secret, ServiceAccount,
};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::api::ObjectMeta;
use kube::runtime::{watcher, Controller};
use kube::{Client, ResourceExt};

use crate::assemble::metadata::ResourceMeta;
use crate::assemble::{Child, Inputs};
use crate::reconciler::{scoped_api, Controlled};

const CA_GEN_CONTAINER: &str = "chia-ca-gen";

fn secret_writer_rules() -> Vec<PolicyRule> {
    vec![PolicyRule {
        api_groups: Some(vec![String::new()]),
        resources: Some(vec!["secrets".into()]),
        verbs: ["get", "create", "update", "patch"]
            .into_iter()
            .map(String::from)
            .collect(),
        ..Default::default()
    }]
}

#[async_trait]
impl Controlled for ChiaCA {
    fn assemble(&self, inputs: &Inputs) -> Result<Vec<Child>> {
        let meta = ResourceMeta::new(self, &self.spec.additional_metadata)?;
        let name = meta.child_name(None);
        let object_meta = || meta.object_meta(name.clone(), None);

        let account = ServiceAccount {
            metadata: object_meta(),
            ..Default::default()
        };
        let role = Role {
            metadata: object_meta(),
            rules: Some(secret_writer_rules()),
        };
        let binding = RoleBinding {
            metadata: object_meta(),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".into(),
                kind: "Role".into(),
                name: name.clone(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".into(),
                name: name.clone(),
                namespace: Some(meta.namespace.clone()),
                ..Default::default()
            }]),
        };
        let job = Job {
            metadata: object_meta(),
            spec: Some(JobSpec {
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(meta.labels.clone()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        service_account_name: Some(name.clone()),
                        restart_policy: Some("OnFailure".into()),
                        image_pull_secrets: (!self.spec.image_pull_secrets.is_empty())
                            .then(|| self.spec.image_pull_secrets.clone()),
                        containers: vec![Container {
                            name: CA_GEN_CONTAINER.into(),
                            image: Some(
                                self.spec
                                    .image
                                    .clone()
                                    .unwrap_or_else(|| inputs.images.ca_gen.clone()),
                            ),
                            image_pull_policy: self.spec.image_pull_policy.clone(),
                            env: Some(vec![
                                env_var("NAMESPACE", &meta.namespace),
                                env_var("SECRET_NAME", &self.spec.secret),
                            ]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok(vec![
            Child::ServiceAccount(account),
            Child::Role(role),
            Child::RoleBinding(binding),
            Child::Job(job),
        ])
    }

    /// Ready once the Job has written the CA Secret.
    async fn is_ready<C: Cluster>(&self, cluster: &C) -> Result<bool> {
        let namespace = self
            .namespace()
            .ok_or(Error::MissingField("metadata.namespace"))?;
        Ok(cluster
            .get::<Secret>(&namespace, &self.spec.secret)
            .await?
            .is_some())
    }

    fn watch_children(
        controller: Controller<Self>,
        client: &Client,
        namespace: Option<&str>,
    ) -> Controller<Self> {
        controller
            .owns(scoped_api::<Job>(client, namespace), watcher::Config::default())
            .owns(scoped_api::<ServiceAccount>(client, namespace), watcher::Config::default())
            .owns(scoped_api::<Role>(client, namespace), watcher::Config::default())
            .owns(scoped_api::<RoleBinding>(client, namespace), watcher::Config::default())
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::fixtures::placed;
    use chia_api::ChiaCASpec;
    use chia_core::test_support::MemoryCluster;

    fn ca() -> ChiaCA {
        placed(
            ChiaCA::new(
                "ca",
                ChiaCASpec {
                    secret: "chia-ca".into(),
                    ..Default::default()
                },
            ),
            "chia",
        )
    }

    #[test]
    fn children_share_the_resource_name() {
        let inputs = Inputs::default();
        let children = ca().assemble(&inputs).unwrap();
        let names: Vec<_> = children.iter().map(Child::name).collect();
        assert_eq!(names, vec!["ca", "ca", "ca", "ca"]);

        let Child::Job(job) = &children[3] else {
            panic!("job must converge last");
        };
        let pod = job.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        assert_eq!(pod.service_account_name.as_deref(), Some("ca"));
        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some(inputs.images.ca_gen.as_str()));
        let env: Vec<_> = container
            .env
            .iter()
            .flatten()
            .map(|v| (v.name.as_str(), v.value.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(env, vec![("NAMESPACE", "chia"), ("SECRET_NAME", "chia-ca")]);

        let Child::Role(role) = &children[1] else {
            panic!("role expected second");
        };
        let rules = role.rules.as_ref().unwrap();
        assert_eq!(rules[0].resources.as_deref(), Some(&["secrets".to_string()][..]));
    }

    #[tokio::test]
    async fn ready_only_once_secret_exists() {
        let cluster = MemoryCluster::new();
        let ca = ca();
        assert!(!ca.is_ready(&cluster).await.unwrap());
        let mut secret = Secret::default();
        secret.metadata.name = Some("chia-ca".into());
        cluster.insert("chia", &secret);
        assert!(ca.is_ready(&cluster).await.unwrap());
    }
}
