use std::collections::BTreeMap;

/// Feature flag enabling OIDC identity provisioning for sources.
pub const OIDC_AUTHENTICATION: &str = "authentication-oidc";

/// A read-only flag set consulted once per reconcile pass. Unknown
/// flags are disabled.
#[derive(Clone, Debug, Default)]
pub struct FeatureFlags(BTreeMap<String, bool>);

impl FeatureFlags {
    pub fn enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn with(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(name.into(), enabled);
        self
    }
}

impl FromIterator<(String, bool)> for FeatureFlags {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_flags_are_disabled() {
        assert!(!FeatureFlags::default().enabled(OIDC_AUTHENTICATION));
    }

    #[test]
    fn set_flags_are_read_back() {
        let flags = FeatureFlags::default().with(OIDC_AUTHENTICATION, true);
        assert!(flags.enabled(OIDC_AUTHENTICATION));
    }
}
