use futures::future::BoxFuture;
use futures::prelude::*;

/// Drains a controller stream until it completes, logging each settled
/// reconcile so failures show up even when the caller discards items.
pub trait ControllerStreamExt<'a> {
    fn wait(self) -> BoxFuture<'a, ()>;
}

impl<'a, T, I, E> ControllerStreamExt<'a> for T
where
    T: Stream<Item = Result<I, E>> + Send + 'a,
    I: std::fmt::Debug,
    E: std::fmt::Display,
{
    fn wait(self) -> BoxFuture<'a, ()> {
        self.for_each_concurrent(None, |item| {
            match item {
                Ok(settled) => tracing::debug!(?settled, "reconcile settled"),
                Err(err) => tracing::warn!(%err, "controller stream error"),
            }
            futures::future::ready(())
        })
        .boxed()
    }
}
