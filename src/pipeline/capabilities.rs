//! One-time capability acquisition before the first page is laid out.
//!
//! The encoder and the builder are prepared concurrently with
//! `try_join_all`; the join resolves to readiness or to the first failure,
//! which is reported as [`RosterQrError::DependencyLoad`] naming the
//! capability. There is no timeout on a capability's `prepare`.

use crate::error::{CapabilityError, RosterQrError};
use crate::pipeline::encode::SymbolEncoder;
use crate::pipeline::layout::DocumentBuilder;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::time::Instant;
use tracing::{debug, info};

/// A named, not-yet-awaited load step.
pub struct LoadTask<'a> {
    pub capability: String,
    pub future: BoxFuture<'a, Result<(), CapabilityError>>,
}

impl<'a> LoadTask<'a> {
    pub fn new(
        capability: impl Into<String>,
        future: impl std::future::Future<Output = Result<(), CapabilityError>> + Send + 'a,
    ) -> Self {
        Self {
            capability: capability.into(),
            future: future.boxed(),
        }
    }
}

/// Await every task together. Returns the elapsed time on success.
pub async fn load_all(tasks: Vec<LoadTask<'_>>) -> Result<std::time::Duration, RosterQrError> {
    let start = Instant::now();
    let count = tasks.len();

    let pending = tasks.into_iter().map(|task| {
        let LoadTask { capability, future } = task;
        async move {
            debug!("Loading capability: {}", capability);
            future.await.map_err(|e| RosterQrError::DependencyLoad {
                capability,
                detail: e.0,
            })
        }
    });
    try_join_all(pending).await?;

    let elapsed = start.elapsed();
    info!("Loaded {} capabilities in {}ms", count, elapsed.as_millis());
    Ok(elapsed)
}

/// Prepare the symbol encoder and the document builder.
pub async fn load_capabilities<E, B>(encoder: &E, builder: &B) -> Result<std::time::Duration, RosterQrError>
where
    E: SymbolEncoder + ?Sized,
    B: DocumentBuilder + Sync,
{
    load_all(vec![
        LoadTask::new(encoder.name().to_string(), encoder.prepare()),
        LoadTask::new(builder.name().to_string(), async move { builder.prepare() }),
    ])
    .await
}
