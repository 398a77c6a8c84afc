//! Concurrent fan-out with first-error propagation.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use super::error::ScrapeError;

/// Run all `fetches` concurrently and collect their results.
///
/// Every fetch runs to completion, so each one gets to close its page. If
/// any fail, the first failure to complete is returned and everything else
/// is discarded. Output order follows completion order, not input order.
pub async fn gather<I, F, T>(fetches: I) -> Result<Vec<T>, ScrapeError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, ScrapeError>>,
{
    let mut pending: FuturesUnordered<F> = fetches.into_iter().collect();
    let mut results = Vec::with_capacity(pending.len());
    let mut first_error = None;

    while let Some(outcome) = pending.next().await {
        match outcome {
            Ok(value) if first_error.is_none() => results.push(value),
            Ok(_) => {}
            Err(e) => match first_error {
                None => first_error = Some(e),
                Some(_) => debug!(error = %e, "Discarding later fan-out failure"),
            },
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
