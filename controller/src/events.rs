use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::chrono::Utc;
use kube::api::{Api, ObjectMeta, PostParams};
use ksource::ContainerSource;
use ksource::prelude::*;

#[cfg(test)]
use mockall::automock;

pub const SINK_BINDING_CREATED: &str = "SinkBindingCreated";
pub const DEPLOYMENT_CREATED: &str = "DeploymentCreated";
pub const SOURCE_RECONCILED: &str = "ContainerSourceReconciled";
pub const INTERNAL_ERROR: &str = "InternalError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

impl EventKind {
    fn as_str(&self) -> &'static str {
        match self {
            EventKind::Normal => "Normal",
            EventKind::Warning => "Warning",
        }
    }
}

/// Append-only sink for reconcile events. Recording is best-effort: a
/// failed publish is logged, never turned into a reconcile failure.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(
        &self,
        source: &ContainerSource,
        kind: EventKind,
        reason: &str,
        message: &str,
    );
}

pub struct EventRecorder {
    client: kube::Client,
    component: String,
}

impl EventRecorder {
    pub fn new(client: kube::Client, component: impl Into<String>) -> Self {
        Self {
            client,
            component: component.into(),
        }
    }

    fn make_event(
        &self,
        source: &ContainerSource,
        kind: EventKind,
        reason: &str,
        message: &str,
    ) -> Event {
        let name = source.name_any();
        let namespace = source.namespace().unwrap_or_default();
        let now = Time(Utc::now());
        Event {
            metadata: ObjectMeta {
                name: Some(format!(
                    "{}.{}.{}",
                    name,
                    self.component,
                    Utc::now().timestamp_millis()
                )),
                namespace: Some(namespace.clone()),
                ..Default::default()
            },
            involved_object: ObjectReference {
                api_version: Some(ContainerSource::api_version(&()).to_string()),
                kind: Some(ContainerSource::kind(&()).to_string()),
                name: Some(name),
                namespace: Some(namespace),
                uid: source.meta().uid.clone(),
                ..Default::default()
            },
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            type_: Some(kind.as_str().to_string()),
            first_timestamp: Some(now.clone()),
            last_timestamp: Some(now),
            count: Some(1),
            reporting_component: Some(self.component.clone()),
            reporting_instance: Some(self.component.clone()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl EventSink for EventRecorder {
    async fn publish(
        &self,
        source: &ContainerSource,
        kind: EventKind,
        reason: &str,
        message: &str,
    ) {
        let event = self.make_event(source, kind, reason, message);
        let namespace = source.namespace().unwrap_or_default();
        let events: Api<Event> = Api::namespaced(self.client.clone(), &namespace);
        if let Err(err) = events.create(&PostParams::default(), &event).await {
            tracing::warn!(%reason, %err, "failed to record event");
        }
    }
}
