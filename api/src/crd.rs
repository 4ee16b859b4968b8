use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::{Condition, ConditionManager, ConditionSet};
use crate::destination::{BindingSubject, Destination};

pub const CONDITION_SINK_BINDING_READY: &str = "SinkBindingReady";
pub const CONDITION_DEPLOYMENT_READY: &str = "DeploymentReady";
pub const CONDITION_OIDC_IDENTITY_CREATED: &str = "OIDCIdentityCreated";

static CONTAINER_SOURCE_CONDITIONS: ConditionSet = ConditionSet::new(&[
    CONDITION_SINK_BINDING_READY,
    CONDITION_DEPLOYMENT_READY,
    CONDITION_OIDC_IDENTITY_CREATED,
]);

/// A source that runs the user-provided pod template and binds its
/// events to a sink. The controller expresses it as a SinkBinding plus a
/// Deployment, both owned by the source.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "sources.knative.dev",
    version = "v1",
    kind = "ContainerSource",
    status = "ContainerSourceStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSourceSpec {
    pub template: PodTemplateSpec,
    pub sink: Destination,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSourceStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub service_account_name: String,
}

impl ContainerSourceStatus {
    fn manager(&mut self) -> ConditionManager<'_> {
        CONTAINER_SOURCE_CONDITIONS.manage(&mut self.conditions)
    }

    pub fn initialize_conditions(&mut self) {
        self.manager().initialize();
    }

    /// Flags that the current generation has not been fully processed
    /// yet. A completed aggregation pass recomputes Ready and clears it.
    pub fn mark_unobserved_generation(&mut self) {
        self.manager().mark_ready_unknown(
            "NewObservedGenFailure",
            "unsuccessfully observed a new generation",
        );
    }

    /// Copies the SinkBinding's Ready condition verbatim into the
    /// source's SinkBindingReady condition, along with its resolved sink
    /// URI. A binding without a Ready condition yet leaves the source
    /// condition untouched.
    pub fn propagate_sink_binding_status(&mut self, binding: &SinkBindingStatus) {
        if binding.sink_uri.is_some() {
            self.sink_uri = binding.sink_uri.clone();
        }
        if let Some(ready) = binding.ready_condition() {
            let mut condition = ready.clone();
            condition.type_ = CONDITION_SINK_BINDING_READY.to_string();
            condition.last_transition_time = None;
            self.manager().set(condition);
        }
    }

    /// DeploymentReady is true only when the Deployment reports an
    /// Available condition of True and at least one ready replica.
    pub fn propagate_deployment_status(&mut self, deployment: &Deployment) {
        let name = deployment.metadata.name.as_deref().unwrap_or_default();
        let available = deployment
            .status
            .as_ref()
            .map(|status| {
                let available = status
                    .conditions
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .any(|c| c.type_ == "Available" && c.status == "True");
                available && status.ready_replicas.unwrap_or(0) >= 1
            })
            .unwrap_or(false);
        if available {
            self.manager().mark_true(CONDITION_DEPLOYMENT_READY);
        } else {
            self.manager().mark_false(
                CONDITION_DEPLOYMENT_READY,
                "DeploymentUnavailable",
                format!("The Deployment {name:?} is unavailable."),
            );
        }
    }

    pub fn mark_oidc_identity_created(&mut self) {
        self.manager().mark_true(CONDITION_OIDC_IDENTITY_CREATED);
    }

    /// Distinct from the resolved case so status diffs can tell "no
    /// identity wanted" apart from "identity provisioned".
    pub fn mark_oidc_identity_created_skipped(&mut self) {
        self.manager().mark_true_with_reason(
            CONDITION_OIDC_IDENTITY_CREATED,
            "OIDCIdentityCreationSkipped",
            "In order to create the OIDC identity, the \"authentication-oidc\" feature must be enabled",
        );
    }

    pub fn mark_oidc_identity_created_failed(
        &mut self,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.manager()
            .mark_false(CONDITION_OIDC_IDENTITY_CREATED, reason, message);
    }

    pub fn set_oidc_service_account_name(&mut self, name: impl Into<String>) {
        self.auth = Some(AuthStatus {
            service_account_name: name.into(),
        });
    }

    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn is_ready(&self) -> bool {
        self.condition(crate::condition::CONDITION_READY)
            .is_some_and(Condition::is_true)
    }
}

/// A binding that injects sink connection details into the subject
/// workload. Reconciled by its own (external) controller; this crate
/// only creates it and reads its readiness back.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "sources.knative.dev",
    version = "v1",
    kind = "SinkBinding",
    status = "SinkBindingStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SinkBindingSpec {
    pub sink: Destination,
    pub subject: BindingSubject,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SinkBindingStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<String>,
}

impl SinkBindingStatus {
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.type_ == crate::condition::CONDITION_READY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionStatus, CONDITION_READY};
    use k8s_openapi::api::apps::v1::{DeploymentCondition, DeploymentStatus};

    fn deployment(available: bool, ready_replicas: i32) -> Deployment {
        Deployment {
            metadata: kube::api::ObjectMeta {
                name: Some("source-deployment".to_string()),
                ..Default::default()
            },
            status: Some(DeploymentStatus {
                conditions: Some(vec![DeploymentCondition {
                    type_: "Available".to_string(),
                    status: if available { "True" } else { "False" }.to_string(),
                    ..Default::default()
                }]),
                ready_replicas: Some(ready_replicas),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn available_deployment_with_replicas_is_ready() {
        let mut status = ContainerSourceStatus::default();
        status.initialize_conditions();
        status.propagate_deployment_status(&deployment(true, 1));
        assert!(status
            .condition(CONDITION_DEPLOYMENT_READY)
            .unwrap()
            .is_true());
    }

    #[test]
    fn available_deployment_without_replicas_is_not_ready() {
        let mut status = ContainerSourceStatus::default();
        status.initialize_conditions();
        status.propagate_deployment_status(&deployment(true, 0));
        let condition = status.condition(CONDITION_DEPLOYMENT_READY).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason.as_deref(), Some("DeploymentUnavailable"));
        assert_eq!(
            condition.message.as_deref(),
            Some("The Deployment \"source-deployment\" is unavailable.")
        );
    }

    #[test]
    fn binding_ready_condition_is_copied_verbatim() {
        let binding = SinkBindingStatus {
            conditions: vec![Condition::new(CONDITION_READY, ConditionStatus::False)
                .with_reason("SinkNotFound")
                .with_message("sink does not exist")],
            sink_uri: Some("http://sink.test".to_string()),
            ..Default::default()
        };
        let mut status = ContainerSourceStatus::default();
        status.initialize_conditions();
        status.propagate_sink_binding_status(&binding);
        let condition = status.condition(CONDITION_SINK_BINDING_READY).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason.as_deref(), Some("SinkNotFound"));
        assert_eq!(status.sink_uri.as_deref(), Some("http://sink.test"));
    }

    #[test]
    fn binding_without_ready_condition_leaves_status_untouched() {
        let mut status = ContainerSourceStatus::default();
        status.initialize_conditions();
        status.propagate_sink_binding_status(&SinkBindingStatus::default());
        let condition = status.condition(CONDITION_SINK_BINDING_READY).unwrap();
        assert_eq!(condition.status, ConditionStatus::Unknown);
    }

    #[test]
    fn ready_requires_all_dependents() {
        let mut status = ContainerSourceStatus::default();
        status.initialize_conditions();
        status.propagate_deployment_status(&deployment(true, 1));
        status.mark_oidc_identity_created_skipped();
        assert!(!status.is_ready());

        let binding = SinkBindingStatus {
            conditions: vec![Condition::new(CONDITION_READY, ConditionStatus::True)],
            ..Default::default()
        };
        status.propagate_sink_binding_status(&binding);
        assert!(status.is_ready());
    }

    #[test]
    fn unobserved_generation_marks_ready_unknown() {
        let mut status = ContainerSourceStatus::default();
        status.initialize_conditions();
        status.mark_unobserved_generation();
        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::Unknown);
        assert_eq!(ready.reason.as_deref(), Some("NewObservedGenFailure"));
    }
}
