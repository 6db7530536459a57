//! Per-call deadlines for provider and store calls.

use std::future::Future;
use std::time::Duration;

use tidings_core::{Error, Result};

/// Await `fut`, failing with `Error::Timeout` once `limit` has elapsed.
///
/// `operation` is only rendered when the deadline fires.
pub(crate) async fn within<T, F, D>(limit: Option<Duration>, operation: D, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
    D: FnOnce() -> String,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::timeout(operation(), limit))?,
        None => fut.await,
    }
}
