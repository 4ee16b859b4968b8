use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use crate::{Error, Result};

pub trait ResourceNameExt: Resource {
    fn name(&self) -> Result<&str> {
        self.meta()
            .name
            .as_deref()
            .ok_or(Error::ObjectMetaMissing("name"))
    }

    fn require_namespace(&self) -> Result<&str> {
        self.meta()
            .namespace
            .as_deref()
            .ok_or(Error::ObjectMetaMissing("namespace"))
    }
}

impl<T> ResourceNameExt for T where T: Resource {}

pub trait ResourceOwnerRefExt: Resource<DynamicType = ()> {
    fn static_controller_owner_ref(&self) -> Result<OwnerReference> {
        self.controller_owner_ref(&())
            .ok_or(Error::ObjectMetaMissing("controller_owner_ref"))
    }
}

impl<T> ResourceOwnerRefExt for T where T: Resource<DynamicType = ()> {}

/// Ownership is a trust boundary: a resource is only trusted as a child of
/// `owner` if its controller owner reference carries the owner's UID. A
/// same-named resource with a missing or foreign owner reference is a
/// conflict, never something to adopt or overwrite.
pub trait ResourceOwnedExt: Resource {
    fn controlled_by<O: Resource>(&self, owner: &O) -> bool {
        let Some(uid) = owner.meta().uid.as_deref() else {
            return false;
        };
        self.meta()
            .owner_references
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|r| r.controller == Some(true) && r.uid == uid)
    }
}

impl<T> ResourceOwnedExt for T where T: Resource {}
