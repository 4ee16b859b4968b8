use serde::{Deserialize, Serialize};

fn default_manager_name() -> String {
    "ksource-controller".to_string()
}

fn default_reconcile_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_manager_name")]
    pub name: String,
    /// Enables the `authentication-oidc` feature.
    #[serde(default)]
    pub oidc_authentication: bool,
    /// Deadline for a single reconcile pass; a pass that exceeds it is
    /// aborted with a retryable error.
    #[serde(default = "default_reconcile_timeout_secs")]
    pub reconcile_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("KSOURCE"))
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            name: default_manager_name(),
            oidc_authentication: false,
            reconcile_timeout_secs: default_reconcile_timeout_secs(),
        }
    }
}
