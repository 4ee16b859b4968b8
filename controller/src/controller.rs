use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use kube::runtime::{Controller, controller::Action, watcher};
use ksource::k8s_openapi::api::apps::v1::Deployment;
use ksource::prelude::*;
use ksource::{ContainerSource, SinkBinding};

use crate::context::Context;
use crate::error::{ControllerResult, Error};
use crate::reconciler::SourceReconciler;

const RETRY_INTERVAL: Duration = Duration::from_secs(10);

async fn reconcile(source: Arc<ContainerSource>, ctx: Arc<Context>) -> Result<Action, Error> {
    let key = format!("{}/{}", source.require_namespace()?, source.name()?);
    let timeout = Duration::from_secs(ctx.config.reconcile_timeout_secs);
    let reconciler = SourceReconciler::new(ctx);
    match tokio::time::timeout(timeout, reconciler.reconcile_key(&key)).await {
        Ok(result) => result.map(|()| Action::await_change()),
        Err(_) => Err(Error::Timeout { key, timeout }),
    }
}

fn error_policy(source: Arc<ContainerSource>, err: &Error, _ctx: Arc<Context>) -> Action {
    if err.is_retryable() {
        tracing::warn!(source = %source.name_any(), %err, "reconcile failed, requeueing");
        Action::requeue(RETRY_INTERVAL)
    } else {
        tracing::error!(source = %source.name_any(), %err, "reconcile failed, waiting for a new change");
        Action::await_change()
    }
}

/// Watches sources plus both owned child kinds, so child churn (a
/// binding turning ready, a deployment scaling) re-triggers the parent.
pub fn run(
    client: &ksource::Client,
    ctx: Arc<Context>,
    shutdown_signal: impl Future<Output = ()> + Send + Sync + 'static,
) -> impl Stream<Item = ControllerResult<ContainerSource>> {
    let sources = match ctx.config.namespace.as_deref() {
        Some(namespace) => client.api_with_namespace::<ContainerSource>(namespace),
        None => client.api::<ContainerSource>(),
    };
    let bindings = match ctx.config.namespace.as_deref() {
        Some(namespace) => client.api_with_namespace::<SinkBinding>(namespace),
        None => client.api::<SinkBinding>(),
    };
    let deployments = match ctx.config.namespace.as_deref() {
        Some(namespace) => client.api_with_namespace::<Deployment>(namespace),
        None => client.api::<Deployment>(),
    };
    Controller::new(sources.kube().clone(), watcher::Config::default())
        .owns(bindings.kube().clone(), watcher::Config::default())
        .owns(deployments.kube().clone(), watcher::Config::default())
        .graceful_shutdown_on(shutdown_signal)
        .run(reconcile, error_policy, ctx)
}
