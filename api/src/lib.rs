mod api;
mod client;
mod condition;
mod crd;
mod destination;
mod error;
mod label;
mod meta;

pub use k8s_openapi;
pub use kube;

pub use api::Api;
pub use client::{Client, ClientBuilder};
pub use condition::{
    CONDITION_READY, Condition, ConditionManager, ConditionSet, ConditionStatus,
};
pub use crd::{
    AuthStatus, CONDITION_DEPLOYMENT_READY, CONDITION_OIDC_IDENTITY_CREATED,
    CONDITION_SINK_BINDING_READY, ContainerSource, ContainerSourceSpec, ContainerSourceStatus,
    SinkBinding, SinkBindingSpec, SinkBindingStatus,
};
pub use destination::{BindingSubject, Destination, KReference};
pub use error::{ClientBuildError, Error, Result};
pub use label::{CONTAINER_SOURCE_LABEL, SourceLabel, source_labels};
pub use meta::{ResourceNameExt, ResourceOwnedExt, ResourceOwnerRefExt};

pub mod prelude {
    pub use super::{ResourceNameExt, ResourceOwnedExt, ResourceOwnerRefExt};
    pub use kube::{Resource, ResourceExt};
}
