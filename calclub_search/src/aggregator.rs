use calclub_core::{EventSource, NormalizedEvent, SearchError, SearchProfile, fingerprint};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::cache::EventCache;
use crate::dedup::dedup;

/// Time budgets for one aggregate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// A source still running after this is abandoned and contributes nothing.
    pub source_timeout: Duration,
    /// Overall budget for the fan-out; whatever finished by then is used.
    pub search_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(900),
        }
    }
}

/// Fans a profile out to every registered source, merges and dedups the
/// results, and caches them under the profile's fingerprint.
pub struct Aggregator {
    sources: Vec<Arc<dyn EventSource>>,
    cache: Arc<EventCache>,
    config: AggregatorConfig,
}

impl Aggregator {
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_cache(Arc::new(EventCache::new()), config)
    }

    #[must_use]
    pub const fn with_cache(cache: Arc<EventCache>, config: AggregatorConfig) -> Self {
        Self {
            sources: Vec::new(),
            cache,
            config,
        }
    }

    /// Add a source. Registration order breaks dedup ties, so register the
    /// more authoritative sources first.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.register(source);
        self
    }

    pub fn register(&mut self, source: Arc<dyn EventSource>) {
        info!("Registered event source: {}", source.name());
        self.sources.push(source);
    }

    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<EventCache> {
        &self.cache
    }

    #[must_use]
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Deduplicated, filtered events for `profile`.
    ///
    /// Served from the cache when a live entry exists. Partial source failure
    /// never fails the call; only an empty source list does.
    pub async fn aggregate(&self, profile: &SearchProfile) -> Result<Vec<NormalizedEvent>, SearchError> {
        if self.sources.is_empty() {
            return Err(SearchError::NoSources);
        }

        let key = fingerprint(profile);
        let entry = self
            .cache
            .get_or_populate(&key, self.config.cache_ttl, || self.fan_out(profile))
            .await;

        if entry.fingerprint != key {
            return Err(SearchError::Invariant(format!(
                "cache entry {} returned for fingerprint {}",
                entry.fingerprint.short(),
                key.short()
            )));
        }

        Ok(entry.events.clone())
    }

    async fn fan_out(&self, profile: &SearchProfile) -> Vec<NormalizedEvent> {
        let started = Instant::now();
        let deadline = started + self.config.search_timeout;
        let source_timeout = self.config.source_timeout;

        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let profile = profile.clone();
            tasks.spawn(async move {
                match timeout(source_timeout, source.discover(&profile)).await {
                    Ok(events) => {
                        debug!("Source {} returned {} events", source.name(), events.len());
                        (index, events)
                    }
                    Err(_) => {
                        warn!("Source {} timed out after {source_timeout:?}", source.name());
                        (index, Vec::new())
                    }
                }
            });
        }

        let mut per_source: Vec<Vec<NormalizedEvent>> = vec![Vec::new(); self.sources.len()];
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, events)))) => {
                    if let Some(slot) = per_source.get_mut(index) {
                        *slot = events;
                    }
                }
                Ok(Some(Err(e))) => warn!("Source task failed: {e}"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Search timed out after {:?} with {} sources outstanding",
                        self.config.search_timeout,
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        let merged: Vec<NormalizedEvent> = per_source.into_iter().flatten().collect();
        let fetched = merged.len();
        let events: Vec<NormalizedEvent> = dedup(merged)
            .into_iter()
            .filter(|e| profile.admits(e))
            .collect();

        info!(
            "Aggregated {} events ({fetched} fetched) from {} sources in {:?}",
            events.len(),
            self.sources.len(),
            started.elapsed()
        );
        events
    }
}
