//! Asynchronous resolution governance.
//!
//! Locking (join-or-reject of in-flight handles), the timeout race every
//! pending resolution runs against, the slow-path warning, transactional
//! multi-provider resolution with best-effort rollback, and the
//! sync/async boundary policy.

use std::time::Instant;

use futures::future::join_all;

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::instantiate;
use crate::options::ContainerOptions;
use crate::provider::Provider;
use crate::record::SharedResolution;
use crate::token::Token;
use crate::Instance;

/// A resolution that leaked across the sync/async boundary.
///
/// Under the lenient boundary policy, a synchronous resolution whose
/// factory yields a pending result returns (and caches) one of these
/// instead of failing. The caller may downcast the instance and await
/// [`PendingResolution::wait`] to obtain the real value.
pub struct PendingResolution {
    token: String,
    handle: SharedResolution,
}

impl PendingResolution {
    pub(crate) fn new(token: &Token, handle: SharedResolution) -> PendingResolution {
        PendingResolution { token: token.name().to_string(), handle }
    }

    /// Name of the token whose resolution is pending.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Awaits the underlying resolution.
    pub async fn wait(&self) -> DiResult<Instance> {
        self.handle.clone().await
    }

    pub(crate) fn handle(&self) -> SharedResolution {
        self.handle.clone()
    }
}

pub(crate) fn is_pending(value: &Instance) -> bool {
    value.downcast_ref::<PendingResolution>().is_some()
}

/// Applies the sync/async boundary policy: a hard error when strict, a
/// warning when lenient. Fixed-value providers never reach this.
pub(crate) fn sync_boundary(container: &Container, token: &Token, origin: &str) -> DiResult<()> {
    if container.options().strict_async_boundary {
        Err(DiError::SyncResolvedAsync(token.name().to_string()))
    } else {
        tracing::warn!(
            token = %token.name(),
            origin,
            "asynchronous result leaked into a synchronous resolution"
        );
        Ok(())
    }
}

/// Awaits an in-flight handle under the configured timeout. Expiry frees
/// the record's lock for retry at the call site; success past the slow
/// threshold is reported as a performance warning.
pub(crate) async fn await_governed(
    token: &Token,
    handle: SharedResolution,
    options: &ContainerOptions,
) -> DiResult<Instance> {
    let started = Instant::now();
    match tokio::time::timeout(options.resolution_timeout, handle).await {
        Ok(result) => {
            let elapsed = started.elapsed();
            if elapsed > options.slow_threshold {
                tracing::warn!(
                    token = %token.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "slow asynchronous resolution"
                );
            }
            result
        }
        Err(_) => Err(DiError::Timeout {
            token: token.name().to_string(),
            millis: options.resolution_timeout.as_millis() as u64,
        }),
    }
}

/// Resolves every contributor of a multi binding, settling all of them
/// before judging the outcome. Each contributor runs through the full
/// hook-gated construction, so listeners fire per element and the
/// error-listener chain may substitute a failed one. On any remaining
/// failure the contributors that did succeed are rolled back (disposed
/// best-effort via their captured teardowns); a single failure surfaces
/// as-is, several combine into one aggregate error.
pub(crate) async fn resolve_multi_transactional(
    container: &Container,
    token: &Token,
    contributors: &[Provider],
) -> DiResult<Vec<Instance>> {
    let pending = contributors
        .iter()
        .map(|provider| instantiate::instantiate_async(container, token, provider));
    let settled = join_all(pending).await;

    let mut values: Vec<(usize, Instance)> = Vec::new();
    let mut failures: Vec<DiError> = Vec::new();
    for (index, outcome) in settled.into_iter().enumerate() {
        match outcome {
            Ok(constructed) => values.push((index, constructed.instance)),
            Err(error) => failures.push(error),
        }
    }
    if failures.is_empty() {
        return Ok(values.into_iter().map(|(_, value)| value).collect());
    }

    let mut rollbacks = Vec::new();
    for (index, value) in &values {
        if let Some(teardown) = &contributors[*index].teardown {
            if let Some(pending) = teardown.run(value) {
                rollbacks.push(pending);
            }
        }
    }
    join_all(rollbacks).await;

    if failures.len() == 1 {
        Err(failures.remove(0).with_token(token.name()))
    } else {
        Err(DiError::Aggregate(failures.iter().map(|e| e.to_string()).collect()))
    }
}
