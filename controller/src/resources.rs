use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;
use ksource::prelude::*;
use ksource::{BindingSubject, ContainerSource, SinkBinding, SinkBindingSpec, source_labels};

/// Child names are pure functions of the parent name so repeated passes
/// can look children up by name instead of listing and filtering.
pub fn sink_binding_name(source_name: &str) -> String {
    format!("{source_name}-sinkbinding")
}

pub fn deployment_name(source_name: &str) -> String {
    format!("{source_name}-deployment")
}

pub fn oidc_service_account_name(source_name: &str) -> String {
    format!("oidc-containersource-{source_name}")
}

/// Desired SinkBinding: the parent's sink, bound to the source's
/// deployment as subject.
pub fn desired_sink_binding(source: &ContainerSource) -> ksource::Result<SinkBinding> {
    let name = source.name()?;
    let namespace = source.require_namespace()?;
    Ok(SinkBinding {
        metadata: ObjectMeta {
            name: Some(sink_binding_name(name)),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![source.static_controller_owner_ref()?]),
            ..Default::default()
        },
        spec: SinkBindingSpec {
            sink: source.spec.sink.clone(),
            subject: BindingSubject {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                namespace: Some(namespace.to_string()),
                name: deployment_name(name),
            },
        },
        status: None,
    })
}

/// Desired Deployment: the parent's pod template with the source's
/// selector labels injected, so the deployment selects the pods it
/// creates.
pub fn desired_deployment(source: &ContainerSource) -> ksource::Result<Deployment> {
    let name = source.name()?;
    let labels = source_labels(name);
    let mut template = source.spec.template.clone();
    template
        .metadata
        .get_or_insert_with(Default::default)
        .labels
        .get_or_insert_with(Default::default)
        .extend(labels.clone());
    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(deployment_name(name)),
            namespace: source.meta().namespace.clone(),
            owner_references: Some(vec![source.static_controller_owner_ref()?]),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(labels),
                ..Default::default()
            },
            template,
            ..Default::default()
        }),
        status: None,
    })
}

/// The OIDC identity for a source, owned by it so a same-named account
/// provisioned by anyone else is detectable as a conflict.
pub fn oidc_service_account(source: &ContainerSource) -> ksource::Result<ServiceAccount> {
    Ok(ServiceAccount {
        metadata: ObjectMeta {
            name: Some(oidc_service_account_name(source.name()?)),
            namespace: source.meta().namespace.clone(),
            owner_references: Some(vec![source.static_controller_owner_ref()?]),
            ..Default::default()
        },
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use ksource::{ContainerSourceSpec, Destination, KReference};

    fn source() -> ContainerSource {
        let mut source = ContainerSource::new(
            "test-container-source",
            ContainerSourceSpec {
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "source".to_string(),
                            image: Some("github.com/knative/test/image".to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                sink: Destination {
                    reference: Some(KReference {
                        kind: "Channel".to_string(),
                        name: "testsink".to_string(),
                        api_version: Some("messaging.knative.dev/v1".to_string()),
                        namespace: None,
                    }),
                    uri: None,
                },
            },
        );
        source.metadata.namespace = Some("testnamespace".to_string());
        source.metadata.uid = Some("1234-5678-90".to_string());
        source
    }

    #[test]
    fn names_are_derived_from_the_source_name() {
        assert_eq!(sink_binding_name("s"), "s-sinkbinding");
        assert_eq!(deployment_name("s"), "s-deployment");
        assert_eq!(oidc_service_account_name("s"), "oidc-containersource-s");
    }

    #[test]
    fn builder_is_deterministic() {
        let source = source();
        assert_eq!(
            desired_sink_binding(&source).unwrap(),
            desired_sink_binding(&source).unwrap()
        );
        assert_eq!(
            desired_deployment(&source).unwrap(),
            desired_deployment(&source).unwrap()
        );
    }

    #[test]
    fn binding_subject_points_at_the_deployment() {
        let binding = desired_sink_binding(&source()).unwrap();
        assert_eq!(binding.spec.subject.kind, "Deployment");
        assert_eq!(binding.spec.subject.name, "test-container-source-deployment");
        assert_eq!(
            binding.spec.subject.namespace.as_deref(),
            Some("testnamespace")
        );
        assert_eq!(binding.spec.sink, source().spec.sink);
    }

    #[test]
    fn deployment_selector_matches_injected_pod_labels() {
        let deployment = desired_deployment(&source()).unwrap();
        let spec = deployment.spec.as_ref().unwrap();
        let selector = spec.selector.match_labels.as_ref().unwrap();
        let pod_labels = spec
            .template
            .metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
            .unwrap();
        assert_eq!(
            selector.get("sources.knative.dev/containerSource"),
            Some(&"test-container-source".to_string())
        );
        for (key, value) in selector {
            assert_eq!(pod_labels.get(key), Some(value));
        }
    }

    #[test]
    fn children_carry_a_controller_owner_reference() {
        let source = source();
        for refs in [
            desired_sink_binding(&source)
                .unwrap()
                .metadata
                .owner_references,
            desired_deployment(&source).unwrap().metadata.owner_references,
            oidc_service_account(&source)
                .unwrap()
                .metadata
                .owner_references,
        ] {
            let owner = &refs.unwrap()[0];
            assert_eq!(owner.controller, Some(true));
            assert_eq!(owner.uid, "1234-5678-90");
            assert_eq!(owner.kind, "ContainerSource");
        }
    }
}
