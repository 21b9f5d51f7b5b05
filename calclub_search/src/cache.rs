use calclub_core::{CachedEvent, Fingerprint, NormalizedEvent};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Floor for background sweep periods; `interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

type Slot = Option<Arc<CachedEvent>>;

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that waited on another caller's population instead of
    /// starting their own.
    pub joins: u64,
    pub entries: usize,
    pub in_flight: usize,
}

/// Fingerprint-keyed result cache with single-flight population.
///
/// Entries and in-flight markers live in sharded maps, so two fingerprints
/// never contend on the same lock. A shard lock is only held while checking
/// or registering a marker, never while a population runs.
pub struct EventCache {
    entries: DashMap<Fingerprint, Arc<CachedEvent>>,
    in_flight: DashMap<Fingerprint, watch::Receiver<Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
}

enum Role {
    Leader(watch::Sender<Slot>),
    Follower(watch::Receiver<Slot>),
}

/// Clears the in-flight marker when the populating caller finishes or is
/// dropped mid-population.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<Fingerprint, watch::Receiver<Slot>>,
    fingerprint: &'a Fingerprint,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(self.fingerprint);
    }
}

impl Default for EventCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            joins: AtomicU64::new(0),
        }
    }

    /// Live entry for `fingerprint`. An expired entry counts as a miss and is
    /// evicted.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<CachedEvent>> {
        let found = self.lookup(fingerprint);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Install a new entry, replacing any prior one for the fingerprint.
    pub fn put(
        &self,
        fingerprint: Fingerprint,
        events: Vec<NormalizedEvent>,
        ttl: Duration,
    ) -> Arc<CachedEvent> {
        let entry = Arc::new(CachedEvent::new(fingerprint.clone(), events, ttl));
        self.entries.insert(fingerprint, Arc::clone(&entry));
        entry
    }

    /// Return the live entry, or run `populate` to build one.
    ///
    /// Concurrent callers for the same fingerprint share a single
    /// population: the first registers an in-flight marker and runs
    /// `populate`, the rest wait on the marker. If the populating caller is
    /// dropped before finishing, one of the waiters takes over.
    pub async fn get_or_populate<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        ttl: Duration,
        populate: F,
    ) -> Arc<CachedEvent>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<NormalizedEvent>>,
    {
        loop {
            if let Some(entry) = self.lookup(fingerprint) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {fingerprint}");
                return entry;
            }

            let role = match self.in_flight.entry(fingerprint.clone()) {
                Entry::Occupied(marker) => Role::Follower(marker.get().clone()),
                Entry::Vacant(slot) => {
                    let (tx, rx) = watch::channel(None);
                    slot.insert(rx);
                    Role::Leader(tx)
                }
            };

            match role {
                Role::Follower(mut rx) => {
                    self.joins.fetch_add(1, Ordering::Relaxed);
                    debug!("Joining in-flight population for {fingerprint}");
                    let shared = rx
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|slot| (*slot).clone());
                    if let Some(entry) = shared {
                        return entry;
                    }
                    debug!("In-flight population for {fingerprint} was abandoned, retrying");
                }
                Role::Leader(tx) => {
                    let _guard = InFlightGuard {
                        in_flight: &self.in_flight,
                        fingerprint,
                    };

                    // A previous leader may have finished between the lookup
                    // above and registering the marker.
                    if let Some(entry) = self.lookup(fingerprint) {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        tx.send_replace(Some(Arc::clone(&entry)));
                        return entry;
                    }

                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache miss for {fingerprint}, populating");
                    let events = populate().await;
                    let entry = self.put(fingerprint.clone(), events, ttl);
                    tx.send_replace(Some(Arc::clone(&entry)));
                    return entry;
                }
            }
        }
    }

    /// Drop the entry for `fingerprint`. Returns whether one existed.
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.remove(fingerprint).is_some()
    }

    /// Evict every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired();
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of stored entries, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            entries: self.entries.len(),
            in_flight: self.in_flight.len(),
        }
    }

    /// Periodically evict expired entries until the handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(MIN_SWEEP_INTERVAL));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    info!("Cache sweep evicted {removed} expired entries");
                }
            }
        })
    }

    fn lookup(&self, fingerprint: &Fingerprint) -> Option<Arc<CachedEvent>> {
        let entry = self.entries.get(fingerprint).map(|e| Arc::clone(e.value()))?;
        if entry.is_expired() {
            self.entries.remove_if(fingerprint, |_, e| e.is_expired());
            debug!("Evicted expired cache entry {fingerprint}");
            return None;
        }
        Some(entry)
    }
}
