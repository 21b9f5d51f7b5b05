use async_trait::async_trait;

use crate::{NormalizedEvent, SearchProfile};

/// One external event provider.
///
/// `discover` never fails: an implementation that cannot reach its source
/// (missing credentials, timeout, bad response) logs and returns an empty
/// list. Implementations must tolerate being dropped mid-call when the
/// aggregator's timeout fires.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Identifier stamped on every event this source emits.
    fn name(&self) -> &str;

    async fn discover(&self, profile: &SearchProfile) -> Vec<NormalizedEvent>;
}
