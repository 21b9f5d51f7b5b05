use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::Fingerprint;

/// Source-agnostic event after parsing.
///
/// `is_free == true` implies `price_amount == None`. A stated zero price is
/// `is_free == false, price_amount == Some(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub title: String,
    pub start: Option<NaiveDateTime>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub is_free: bool,
    /// Minor currency units (cents).
    pub price_amount: Option<i64>,
    pub source: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl NormalizedEvent {
    /// A free event with nothing but a title, tagged with its source.
    #[must_use]
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start: None,
            venue_name: None,
            venue_address: None,
            is_free: true,
            price_amount: None,
            source: source.into(),
            url: None,
            description: None,
        }
    }

    #[must_use]
    pub const fn with_start(mut self, start: Option<NaiveDateTime>) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub fn with_venue(mut self, name: Option<String>, address: Option<String>) -> Self {
        self.venue_name = name.filter(|s| !s.trim().is_empty());
        self.venue_address = address.filter(|s| !s.trim().is_empty());
        self
    }

    /// Set the price from a `parse_price` result. A free flag always clears
    /// the amount.
    #[must_use]
    pub const fn with_price(mut self, (is_free, amount_minor): (bool, Option<i64>)) -> Self {
        self.is_free = is_free;
        self.price_amount = if is_free { None } else { amount_minor };
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url.filter(|s| !s.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|s| !s.trim().is_empty());
        self
    }

    /// Count of the optional fields that matter when picking between
    /// duplicates.
    #[must_use]
    pub fn richness(&self) -> usize {
        usize::from(self.venue_address.is_some()) + usize::from(self.price_amount.is_some())
    }

    /// Events a calendar file can be built from.
    #[must_use]
    pub fn is_exportable(&self) -> bool {
        !self.title.trim().is_empty() && self.start.is_some()
    }
}

/// Subset of `events` with a title and a parsed start.
#[must_use]
pub fn export_eligible(events: &[NormalizedEvent]) -> Vec<&NormalizedEvent> {
    events.iter().filter(|e| e.is_exportable()).collect()
}

/// Result set stored under a fingerprint. Never mutated, only replaced.
#[derive(Debug, Clone)]
pub struct CachedEvent {
    pub fingerprint: Fingerprint,
    pub events: Vec<NormalizedEvent>,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    stored_at: Instant,
}

impl CachedEvent {
    #[must_use]
    pub fn new(fingerprint: Fingerprint, events: Vec<NormalizedEvent>, ttl: Duration) -> Self {
        Self {
            fingerprint,
            events,
            created_at: Utc::now(),
            ttl,
            stored_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }
}
