use std::fmt::Debug;

use kube::{
    Resource,
    api::{Patch, PatchParams, PostParams},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{ResourceNameExt, Result};

pub struct Api<T> {
    name: String,
    inner: kube::api::Api<T>,
}

impl<T> Api<T> {
    pub fn new(name: String, inner: kube::api::Api<T>) -> Self {
        Self { name, inner }
    }
}

impl<T> Api<T>
where
    T: Resource + Serialize + DeserializeOwned + Clone + Debug + Send + 'static,
{
    #[inline]
    pub fn kube(&self) -> &kube::Api<T> {
        &self.inner
    }

    #[inline]
    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.name.clone()),
            ..Default::default()
        }
    }

    #[inline]
    pub fn patch_params(&self) -> PatchParams {
        PatchParams::apply(&self.name)
    }

    #[tracing::instrument(level = "debug", skip(self), ret, err)]
    pub async fn get(&self, name: &str) -> Result<T> {
        Ok(self.inner.get(name).await?)
    }

    #[tracing::instrument(level = "debug", skip(self), ret, err)]
    pub async fn get_opt(&self, name: &str) -> Result<Option<T>> {
        Ok(self.inner.get_opt(name).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, resource), ret, err)]
    pub async fn create(&self, resource: &T) -> Result<T> {
        Ok(self.inner.create(&self.post_params(), resource).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, resource), ret, err)]
    pub async fn replace(&self, resource: &T) -> Result<T> {
        Ok(self
            .inner
            .replace(resource.name()?, &self.post_params(), resource)
            .await?)
    }

    #[tracing::instrument(level = "debug", skip(self, resource), ret, err)]
    pub async fn patch_status(&self, resource: &T) -> Result<T> {
        let mut json = serde_json::to_value(resource)?;
        let Some(object) = json.as_object_mut() else {
            return Err(crate::Error::Other(format!(
                "expected an object, got {json}"
            )));
        };
        object.remove("spec");
        object.remove("metadata");
        Ok(self
            .inner
            .patch_status(
                resource.name()?,
                &self.patch_params(),
                &Patch::Apply(&object),
            )
            .await?)
    }
}
