use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ServiceAccount;
use ksource::prelude::*;
use ksource::{Client, ContainerSource, SinkBinding};

#[cfg(test)]
use mockall::automock;

/// The read/write capabilities a reconcile pass runs against. Reads are
/// expected to be cheap (cache-backed in a real deployment); writes go
/// straight to the apiserver. Mocked in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn get_container_source(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<ContainerSource>>;

    async fn update_container_source_status(
        &self,
        source: &ContainerSource,
    ) -> ksource::Result<ContainerSource>;

    async fn get_sink_binding(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<SinkBinding>>;

    async fn create_sink_binding(&self, binding: &SinkBinding) -> ksource::Result<SinkBinding>;

    async fn update_sink_binding(&self, binding: &SinkBinding) -> ksource::Result<SinkBinding>;

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<Deployment>>;

    async fn create_deployment(&self, deployment: &Deployment) -> ksource::Result<Deployment>;

    async fn update_deployment(&self, deployment: &Deployment) -> ksource::Result<Deployment>;

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<ServiceAccount>>;

    async fn create_service_account(
        &self,
        account: &ServiceAccount,
    ) -> ksource::Result<ServiceAccount>;
}

pub struct KubeSourceClient {
    client: Client,
}

impl KubeSourceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceClient for KubeSourceClient {
    async fn get_container_source(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<ContainerSource>> {
        self.client
            .api_with_namespace::<ContainerSource>(namespace)
            .get_opt(name)
            .await
    }

    async fn update_container_source_status(
        &self,
        source: &ContainerSource,
    ) -> ksource::Result<ContainerSource> {
        self.client
            .api_with_namespace::<ContainerSource>(source.require_namespace()?)
            .patch_status(source)
            .await
    }

    async fn get_sink_binding(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<SinkBinding>> {
        self.client
            .api_with_namespace::<SinkBinding>(namespace)
            .get_opt(name)
            .await
    }

    async fn create_sink_binding(&self, binding: &SinkBinding) -> ksource::Result<SinkBinding> {
        self.client
            .api_with_namespace::<SinkBinding>(binding.require_namespace()?)
            .create(binding)
            .await
    }

    async fn update_sink_binding(&self, binding: &SinkBinding) -> ksource::Result<SinkBinding> {
        self.client
            .api_with_namespace::<SinkBinding>(binding.require_namespace()?)
            .replace(binding)
            .await
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<Deployment>> {
        self.client
            .api_with_namespace::<Deployment>(namespace)
            .get_opt(name)
            .await
    }

    async fn create_deployment(&self, deployment: &Deployment) -> ksource::Result<Deployment> {
        self.client
            .api_with_namespace::<Deployment>(deployment.require_namespace()?)
            .create(deployment)
            .await
    }

    async fn update_deployment(&self, deployment: &Deployment) -> ksource::Result<Deployment> {
        self.client
            .api_with_namespace::<Deployment>(deployment.require_namespace()?)
            .replace(deployment)
            .await
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> ksource::Result<Option<ServiceAccount>> {
        self.client
            .api_with_namespace::<ServiceAccount>(namespace)
            .get_opt(name)
            .await
    }

    async fn create_service_account(
        &self,
        account: &ServiceAccount,
    ) -> ksource::Result<ServiceAccount> {
        self.client
            .api_with_namespace::<ServiceAccount>(account.require_namespace()?)
            .create(account)
            .await
    }
}
