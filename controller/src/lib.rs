mod client;
mod config;
mod context;
pub mod controller;
mod error;
mod events;
mod features;
mod identity;
mod reconciler;
mod resources;
mod sync;
mod utils;

pub use client::{KubeSourceClient, SourceClient};
pub use config::Config;
pub use context::Context;
pub use error::{ControllerError, ControllerResult, Error};
pub use features::{FeatureFlags, OIDC_AUTHENTICATION};
pub use reconciler::{ReconcileKey, SourceReconciler};
pub use utils::ControllerStreamExt;
