use std::sync::Arc;

use crate::client::{KubeSourceClient, SourceClient};
use crate::config::Config;
use crate::events::{EventRecorder, EventSink};
use crate::features::{FeatureFlags, OIDC_AUTHENTICATION};

/// Per-process dependency bundle. A reconcile pass is a pure function of
/// these capabilities plus the reconcile key; nothing here is mutated
/// between passes.
pub struct Context {
    pub kube: Arc<dyn SourceClient>,
    pub events: Arc<dyn EventSink>,
    pub features: FeatureFlags,
    pub config: Config,
}

impl Context {
    pub fn new(
        kube: Arc<dyn SourceClient>,
        events: Arc<dyn EventSink>,
        features: FeatureFlags,
        config: Config,
    ) -> Self {
        Self {
            kube,
            events,
            features,
            config,
        }
    }

    pub fn from_client(client: ksource::Client, config: Config) -> Self {
        let features =
            FeatureFlags::default().with(OIDC_AUTHENTICATION, config.oidc_authentication);
        Self {
            kube: Arc::new(KubeSourceClient::new(client.clone())),
            events: Arc::new(EventRecorder::new(client.kube().clone(), &config.name)),
            features,
            config,
        }
    }

    #[cfg(test)]
    pub fn for_testing(
        kube: Arc<dyn SourceClient>,
        events: Arc<dyn EventSink>,
        features: FeatureFlags,
    ) -> Self {
        Self {
            kube,
            events,
            features,
            config: Config::default(),
        }
    }
}
