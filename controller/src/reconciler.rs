use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use ksource::prelude::*;
use ksource::{ContainerSource, ContainerSourceStatus, SinkBinding};
use tracing::instrument;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::events::{
    EventKind, DEPLOYMENT_CREATED, INTERNAL_ERROR, SINK_BINDING_CREATED, SOURCE_RECONCILED,
};
use crate::identity::ensure_oidc_identity;
use crate::sync::{sync_child, SourceChild, SyncOutcome};

/// A `namespace/name` pair identifying one source. Anything else is
/// unprocessable and dropped without retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileKey {
    pub namespace: String,
    pub name: String,
}

impl FromStr for ReconcileKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => Ok(Self {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            _ => Err(Error::MalformedKey(s.to_string())),
        }
    }
}

impl fmt::Display for ReconcileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub struct SourceReconciler {
    ctx: Arc<Context>,
}

impl SourceReconciler {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// One level-triggered pass. Always recomputes the full desired
    /// state from the parent; the observed key only says which parent
    /// to look at.
    #[instrument(skip(self))]
    pub async fn reconcile_key(&self, raw_key: &str) -> Result<()> {
        let key = match ReconcileKey::from_str(raw_key) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(%err, "dropping unprocessable work item");
                return Ok(());
            }
        };
        let Some(source) = self
            .ctx
            .kube
            .get_container_source(&key.namespace, &key.name)
            .await?
        else {
            tracing::debug!(%key, "source no longer exists, nothing to do");
            return Ok(());
        };
        self.reconcile(&source).await
    }

    pub async fn reconcile(&self, source: &ContainerSource) -> Result<()> {
        let mut status = source.status.clone().unwrap_or_default();
        status.initialize_conditions();
        if source.meta().generation != status.observed_generation {
            status.mark_unobserved_generation();
        }

        let applied = self.apply(source, &mut status).await;

        // The generation was fully looked at even when applying it
        // failed; convergence is what the Ready condition reports.
        status.observed_generation = source.meta().generation;
        let written = self.write_status_if_changed(source, &status).await;

        match applied.and(written) {
            Ok(()) => {
                let message = format!(
                    "ContainerSource reconciled: \"{}/{}\"",
                    source.require_namespace()?,
                    source.name()?
                );
                self.ctx
                    .events
                    .publish(source, EventKind::Normal, SOURCE_RECONCILED, &message)
                    .await;
                Ok(())
            }
            Err(err) => {
                self.ctx
                    .events
                    .publish(source, EventKind::Warning, INTERNAL_ERROR, &err.to_string())
                    .await;
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        source: &ContainerSource,
        status: &mut ContainerSourceStatus,
    ) -> Result<()> {
        let kube = self.ctx.kube.as_ref();

        let (binding, outcome) = sync_child::<SinkBinding>(kube, source).await?;
        self.report_child_sync(source, &binding, outcome, SINK_BINDING_CREATED)
            .await;
        if let Some(binding_status) = binding.status.as_ref() {
            status.propagate_sink_binding_status(binding_status);
        }

        let (deployment, outcome) = sync_child::<Deployment>(kube, source).await?;
        self.report_child_sync(source, &deployment, outcome, DEPLOYMENT_CREATED)
            .await;
        status.propagate_deployment_status(&deployment);

        ensure_oidc_identity(kube, &self.ctx.features, source, status).await?;
        Ok(())
    }

    async fn report_child_sync<C: SourceChild>(
        &self,
        source: &ContainerSource,
        child: &C,
        outcome: SyncOutcome,
        created_reason: &str,
    ) {
        let name = child.name_any();
        match outcome {
            SyncOutcome::Created => {
                self.ctx
                    .events
                    .publish(
                        source,
                        EventKind::Normal,
                        created_reason,
                        &format!("{} created {name:?}", C::KIND),
                    )
                    .await;
            }
            SyncOutcome::Updated => {
                tracing::info!(child = %name, "child updated to match desired state");
            }
            SyncOutcome::Unchanged => {}
        }
    }

    /// Status writes are skipped when nothing changed so a settled
    /// source produces no writes at all on repeat passes.
    async fn write_status_if_changed(
        &self,
        source: &ContainerSource,
        status: &ContainerSourceStatus,
    ) -> Result<()> {
        if source.status.as_ref() == Some(status) {
            return Ok(());
        }
        let mut updated = source.clone();
        updated.status = Some(status.clone());
        self.ctx
            .kube
            .update_container_source_status(&updated)
            .await
            .map(drop)
            .map_err(Error::StatusUpdate)
    }
}
