#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod error;
pub mod eventbrite;
pub mod firecrawl;
mod retry;

use calclub_core::{NormalizedEvent, SearchProfile};

pub use error::SourceError;
pub use eventbrite::{EventbriteApi, EventbriteClient, EventbriteQuery, EventbriteSource};
pub use firecrawl::{AgentEventItem, DiscoveryAgent, FirecrawlAgentClient, FirecrawlSource};
pub use retry::retry_with_backoff;

/// Drop events the profile would reject anyway (`free_only`, time window).
///
/// Adapters run this before returning; the aggregator re-checks after merge.
pub fn prefilter(
    profile: &SearchProfile,
    events: impl IntoIterator<Item = NormalizedEvent>,
) -> Vec<NormalizedEvent> {
    events.into_iter().filter(|e| profile.admits(e)).collect()
}
