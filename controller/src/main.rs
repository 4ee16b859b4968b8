use std::sync::Arc;
use std::time::Duration;

use futures::prelude::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use ksource_controller::{Config, Context, ControllerStreamExt, controller};

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
}

async fn shutdown_signal() {
    ctrl_c().await;
    tracing::info!("Received shutdown signal, shutting down source controller...");
}

async fn shutdown_timeout(timeout: Duration) -> Result<(), String> {
    ctrl_c().await;
    tokio::time::sleep(timeout).await;
    tracing::warn!("Shutdown timeout reached, shutting down forcefully");
    Err("shutdown timeout reached".to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
    let config = Config::load().unwrap();

    let mut builder = ksource::Client::builder();
    builder.name(&config.name);
    if let Some(namespace) = config.namespace.as_deref() {
        builder.namespace(namespace);
    }
    let client = builder.build().await.unwrap();

    tracing::info!("Patching CRDs...");
    client.patch_all_crds().await.unwrap();

    let ctx = Arc::new(Context::from_client(client.clone(), config));

    tracing::info!(
        "Processing ContainerSources in {} namespace...",
        client.kube().default_namespace()
    );
    futures::future::try_select(
        controller::run(&client, ctx, shutdown_signal())
            .wait()
            .map(Ok),
        shutdown_timeout(Duration::from_secs(60)).boxed(),
    )
    .await
    .map_err(|err| err.factor_first().0)
    .unwrap();
}
