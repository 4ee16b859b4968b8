use ksource::prelude::*;
use ksource::{ContainerSource, ContainerSourceStatus};

use crate::client::SourceClient;
use crate::error::{Error, Result};
use crate::features::{FeatureFlags, OIDC_AUTHENTICATION};
use crate::resources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOutcome {
    Resolved,
    Created,
    Disabled,
}

/// Ensures the per-source OIDC service account exists when the
/// `authentication-oidc` feature is on. The account name still lands in
/// status on an ownership conflict so operators can see which account
/// is being fought over.
pub async fn ensure_oidc_identity(
    kube: &dyn SourceClient,
    features: &FeatureFlags,
    source: &ContainerSource,
    status: &mut ContainerSourceStatus,
) -> Result<IdentityOutcome> {
    if !features.enabled(OIDC_AUTHENTICATION) {
        status.auth = None;
        status.mark_oidc_identity_created_skipped();
        return Ok(IdentityOutcome::Disabled);
    }

    let namespace = source.require_namespace()?;
    let owner = source.name()?;
    let name = resources::oidc_service_account_name(owner);
    status.set_oidc_service_account_name(&name);

    // Every failure below lands in the condition, transient apiserver
    // errors included, so status always says why the identity is absent.
    let existing = match kube.get_service_account(namespace, &name).await {
        Ok(existing) => existing,
        Err(err) => return Err(mark_failed(status, err.into())),
    };
    match existing {
        Some(account) if account.controlled_by(source) => {
            status.mark_oidc_identity_created();
            Ok(IdentityOutcome::Resolved)
        }
        Some(_) => Err(mark_failed(
            status,
            Error::IdentityNotOwned {
                name: name.clone(),
                owner: owner.to_string(),
            },
        )),
        None => {
            let account = resources::oidc_service_account(source)?;
            if let Err(err) = kube.create_service_account(&account).await {
                return Err(mark_failed(status, err.into()));
            }
            status.mark_oidc_identity_created();
            Ok(IdentityOutcome::Created)
        }
    }
}

fn mark_failed(status: &mut ContainerSourceStatus, err: Error) -> Error {
    status.mark_oidc_identity_created_failed(
        "Unable to resolve service account for OIDC authentication",
        err.to_string(),
    );
    err
}
