use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::SourceError;

/// Retry an async request while it fails with a transient error.
///
/// Makes one initial attempt plus one retry per entry in `delays`, sleeping
/// the given delay before each retry. Permanent errors (bad credentials,
/// malformed payloads, 4xx) are returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    delays: &[Duration],
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let total = delays.len() + 1;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < total => {
                let delay = delays[attempt - 1];
                warn!("Request failed (attempt {attempt}/{total}): {e}. Retrying after {delay:?}...");
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
