use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Resource;
use ksource::prelude::*;
use ksource::{ContainerSource, SinkBinding};

use crate::client::SourceClient;
use crate::error::{Error, Result};
use crate::resources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}

/// A child resource the controller drives towards a desired shape. Both
/// children go through the same sync: fetch by deterministic name,
/// create when absent, refuse to touch anything not owned by the
/// source, update only when the spec drifted.
#[async_trait]
pub trait SourceChild: Resource + Sized + Send + Sync {
    const KIND: &'static str;

    fn child_name(source: &ContainerSource) -> ksource::Result<String>;
    fn desired(source: &ContainerSource) -> ksource::Result<Self>;
    fn specs_match(&self, desired: &Self) -> bool;
    /// Grafts the desired spec onto the live object so the update keeps
    /// the server-managed metadata (resourceVersion, uid) and status.
    fn merge_desired(&self, desired: Self) -> Self;

    async fn get(
        kube: &dyn SourceClient,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<Self>>;
    async fn create(kube: &dyn SourceClient, child: &Self) -> ksource::Result<Self>;
    async fn update(kube: &dyn SourceClient, child: &Self) -> ksource::Result<Self>;
}

#[async_trait]
impl SourceChild for SinkBinding {
    const KIND: &'static str = "SinkBinding";

    fn child_name(source: &ContainerSource) -> ksource::Result<String> {
        Ok(resources::sink_binding_name(source.name()?))
    }

    fn desired(source: &ContainerSource) -> ksource::Result<Self> {
        resources::desired_sink_binding(source)
    }

    fn specs_match(&self, desired: &Self) -> bool {
        self.spec == desired.spec
    }

    fn merge_desired(&self, desired: Self) -> Self {
        let mut merged = self.clone();
        merged.spec = desired.spec;
        merged
    }

    async fn get(
        kube: &dyn SourceClient,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<Self>> {
        kube.get_sink_binding(namespace, name).await
    }

    async fn create(kube: &dyn SourceClient, child: &Self) -> ksource::Result<Self> {
        kube.create_sink_binding(child).await
    }

    async fn update(kube: &dyn SourceClient, child: &Self) -> ksource::Result<Self> {
        kube.update_sink_binding(child).await
    }
}

#[async_trait]
impl SourceChild for Deployment {
    const KIND: &'static str = "Deployment";

    fn child_name(source: &ContainerSource) -> ksource::Result<String> {
        Ok(resources::deployment_name(source.name()?))
    }

    fn desired(source: &ContainerSource) -> ksource::Result<Self> {
        resources::desired_deployment(source)
    }

    fn specs_match(&self, desired: &Self) -> bool {
        let live = self.spec.as_ref().map(|s| &s.template);
        let want = desired.spec.as_ref().map(|s| &s.template);
        match (want, live) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(want), Some(live)) => {
                match (serde_json::to_value(want), serde_json::to_value(live)) {
                    (Ok(want), Ok(live)) => is_derivative(&want, &live),
                    _ => false,
                }
            }
        }
    }

    fn merge_desired(&self, desired: Self) -> Self {
        let mut merged = self.clone();
        merged.spec = desired.spec;
        merged
    }

    async fn get(
        kube: &dyn SourceClient,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<Self>> {
        kube.get_deployment(namespace, name).await
    }

    async fn create(kube: &dyn SourceClient, child: &Self) -> ksource::Result<Self> {
        kube.create_deployment(child).await
    }

    async fn update(kube: &dyn SourceClient, child: &Self) -> ksource::Result<Self> {
        kube.update_deployment(child).await
    }
}

/// Subset comparison for pod templates: only fields set in the desired
/// value participate. A live object always carries server-defaulted
/// fields (restartPolicy, dnsPolicy, ...) the desired template leaves
/// unset; exact equality would flag those as drift and the resulting
/// update would wipe the default, re-triggering itself every pass.
fn is_derivative(desired: &serde_json::Value, live: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (desired, live) {
        (Value::Null, _) => true,
        (Value::Object(desired), Value::Object(live)) => desired.iter().all(|(key, want)| {
            live.get(key)
                .map_or(want.is_null(), |have| is_derivative(want, have))
        }),
        (Value::Array(desired), Value::Array(live)) => {
            desired.len() == live.len()
                && desired
                    .iter()
                    .zip(live)
                    .all(|(want, have)| is_derivative(want, have))
        }
        (desired, live) => desired == live,
    }
}

/// One pass over a single child: at most one write, never an overwrite
/// of a resource the source does not own.
pub async fn sync_child<C: SourceChild>(
    kube: &dyn SourceClient,
    source: &ContainerSource,
) -> Result<(C, SyncOutcome)> {
    let namespace = source.require_namespace()?;
    let name = C::child_name(source)?;
    let desired = C::desired(source)?;
    let existing = C::get(kube, namespace, &name)
        .await
        .map_err(|err| Error::GetChild {
            kind: C::KIND,
            source: err,
        })?;
    match existing {
        None => {
            let created = C::create(kube, &desired)
                .await
                .map_err(|err| Error::CreateChild {
                    kind: C::KIND,
                    source: err,
                })?;
            Ok((created, SyncOutcome::Created))
        }
        Some(existing) => {
            if !existing.controlled_by(source) {
                return Err(Error::ChildNotOwned {
                    kind: C::KIND,
                    name,
                    owner: source.name()?.to_string(),
                });
            }
            if existing.specs_match(&desired) {
                Ok((existing, SyncOutcome::Unchanged))
            } else {
                let merged = existing.merge_desired(desired);
                let updated = C::update(kube, &merged)
                    .await
                    .map_err(|err| Error::UpdateChild {
                        kind: C::KIND,
                        source: err,
                    })?;
                Ok((updated, SyncOutcome::Updated))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockSourceClient;
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use ksource::{ContainerSourceSpec, Destination, KReference};
    use mockall::predicate::eq;

    fn source() -> ContainerSource {
        let mut source = ContainerSource::new(
            "test-source",
            ContainerSourceSpec {
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "source".to_string(),
                            image: Some("image".to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                sink: Destination {
                    reference: Some(KReference {
                        kind: "Channel".to_string(),
                        name: "sink".to_string(),
                        api_version: Some("messaging.knative.dev/v1".to_string()),
                        namespace: None,
                    }),
                    uri: None,
                },
            },
        );
        source.metadata.namespace = Some("testnamespace".to_string());
        source.metadata.uid = Some("source-uid".to_string());
        source
    }

    fn owned_binding(source: &ContainerSource) -> SinkBinding {
        let mut binding = resources::desired_sink_binding(source).unwrap();
        binding.metadata.resource_version = Some("42".to_string());
        binding.metadata.uid = Some("binding-uid".to_string());
        binding
    }

    #[tokio::test]
    async fn absent_child_is_created() {
        let source = source();
        let desired = resources::desired_sink_binding(&source).unwrap();
        let mut kube = MockSourceClient::new();
        kube.expect_get_sink_binding()
            .with(eq("testnamespace"), eq("test-source-sinkbinding"))
            .times(1)
            .returning(|_, _| Ok(None));
        let expected = desired.clone();
        kube.expect_create_sink_binding()
            .withf(move |binding| *binding == expected)
            .times(1)
            .returning(|binding| Ok(binding.clone()));

        let (_, outcome) = sync_child::<SinkBinding>(&kube, &source).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Created);
    }

    #[tokio::test]
    async fn matching_child_is_left_alone() {
        let source = source();
        let existing = owned_binding(&source);
        let mut kube = MockSourceClient::new();
        kube.expect_get_sink_binding()
            .times(1)
            .returning(move |_, _| Ok(Some(existing.clone())));

        let (_, outcome) = sync_child::<SinkBinding>(&kube, &source).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn drifted_child_is_updated_in_place() {
        let source = source();
        let mut existing = owned_binding(&source);
        existing.spec.sink.uri = Some("http://stale.sink".to_string());
        let mut kube = MockSourceClient::new();
        kube.expect_get_sink_binding()
            .times(1)
            .returning(move |_, _| Ok(Some(existing.clone())));
        kube.expect_update_sink_binding()
            .withf(move |binding| {
                binding.spec.sink.uri.is_none()
                    && binding.metadata.resource_version.as_deref() == Some("42")
            })
            .times(1)
            .returning(|binding| Ok(binding.clone()));

        let (_, outcome) = sync_child::<SinkBinding>(&kube, &source).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Updated);
    }

    #[tokio::test]
    async fn foreign_child_is_never_touched() {
        let source = source();
        let mut existing = owned_binding(&source);
        if let Some(refs) = existing.metadata.owner_references.as_mut() {
            refs[0].uid = "someone-else".to_string();
        }
        let mut kube = MockSourceClient::new();
        kube.expect_get_sink_binding()
            .times(1)
            .returning(move |_, _| Ok(Some(existing.clone())));

        let err = sync_child::<SinkBinding>(&kube, &source)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "SinkBinding \"test-source-sinkbinding\" is not owned by ContainerSource \"test-source\""
        );
    }

    #[tokio::test]
    async fn server_defaulted_fields_are_not_drift() {
        let source = source();
        let mut existing = resources::desired_deployment(&source).unwrap();
        existing.metadata.resource_version = Some("7".to_string());
        if let Some(pod) = existing.spec.as_mut().and_then(|s| s.template.spec.as_mut()) {
            pod.restart_policy = Some("Always".to_string());
            pod.dns_policy = Some("ClusterFirst".to_string());
            pod.termination_grace_period_seconds = Some(30);
            pod.containers[0].image_pull_policy = Some("IfNotPresent".to_string());
        }
        let mut kube = MockSourceClient::new();
        kube.expect_get_deployment()
            .times(1)
            .returning(move |_, _| Ok(Some(existing.clone())));
        kube.expect_update_deployment().never();

        let (_, outcome) = sync_child::<Deployment>(&kube, &source).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn fields_set_in_the_desired_template_still_drift() {
        let source = source();
        let mut existing = resources::desired_deployment(&source).unwrap();
        existing.metadata.resource_version = Some("7".to_string());
        if let Some(pod) = existing.spec.as_mut().and_then(|s| s.template.spec.as_mut()) {
            pod.restart_policy = Some("Always".to_string());
            pod.containers[0].image = Some("stale-image".to_string());
        }
        let mut kube = MockSourceClient::new();
        kube.expect_get_deployment()
            .times(1)
            .returning(move |_, _| Ok(Some(existing.clone())));
        kube.expect_update_deployment()
            .times(1)
            .returning(|deployment| Ok(deployment.clone()));

        let (_, outcome) = sync_child::<Deployment>(&kube, &source).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Updated);
    }

    #[tokio::test]
    async fn deployment_template_drift_triggers_an_update() {
        let source = source();
        let mut existing = resources::desired_deployment(&source).unwrap();
        existing.metadata.resource_version = Some("7".to_string());
        if let Some(spec) = existing.spec.as_mut() {
            if let Some(pod) = spec.template.spec.as_mut() {
                pod.containers[0].image = Some("stale-image".to_string());
            }
        }
        let mut kube = MockSourceClient::new();
        kube.expect_get_deployment()
            .with(eq("testnamespace"), eq("test-source-deployment"))
            .times(1)
            .returning(move |_, _| Ok(Some(existing.clone())));
        kube.expect_update_deployment()
            .withf(|deployment| {
                let image = deployment
                    .spec
                    .as_ref()
                    .and_then(|s| s.template.spec.as_ref())
                    .map(|p| p.containers[0].image.clone());
                image == Some(Some("image".to_string()))
            })
            .times(1)
            .returning(|deployment| Ok(deployment.clone()));

        let (_, outcome) = sync_child::<Deployment>(&kube, &source).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Updated);
    }
}
