use std::time::Duration;

use kube::runtime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A reconcile key that does not split into namespace/name. Dropped
    /// without retry; never surfaced past the key parser.
    #[error("malformed reconcile key {0:?}")]
    MalformedKey(String),
    #[error("getting {kind}: {source}")]
    GetChild {
        kind: &'static str,
        #[source]
        source: ksource::Error,
    },
    #[error("creating new {kind}: {source}")]
    CreateChild {
        kind: &'static str,
        #[source]
        source: ksource::Error,
    },
    #[error("updating {kind}: {source}")]
    UpdateChild {
        kind: &'static str,
        #[source]
        source: ksource::Error,
    },
    /// A same-named child carrying a missing or foreign owner reference.
    /// Fatal for this generation, but still requeued: an operator may
    /// remove the conflicting object out-of-band.
    #[error("{kind} {name:?} is not owned by ContainerSource {owner:?}")]
    ChildNotOwned {
        kind: &'static str,
        name: String,
        owner: String,
    },
    #[error("service account {name} not owned by ContainerSource {owner}")]
    IdentityNotOwned { name: String, owner: String },
    #[error("updating status: {0}")]
    StatusUpdate(#[source] ksource::Error),
    #[error("reconcile of {key:?} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },
    #[error(transparent)]
    Client(#[from] ksource::Error),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::MalformedKey(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type ControllerError = runtime::controller::Error<Error, runtime::watcher::Error>;
pub type ControllerResult<T> = Result<
    (
        runtime::reflector::ObjectRef<T>,
        runtime::controller::Action,
    ),
    ControllerError,
>;
