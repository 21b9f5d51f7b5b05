//! Ticketing API adapter backed by Eventbrite's event search.

use anyhow::Context;
use async_trait::async_trait;
use calclub_core::{EventSource, NormalizedEvent, SearchProfile, parse_datetime, parse_price};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::retry::retry_with_backoff;
use crate::{SourceError, prefilter};

pub const SOURCE_NAME: &str = "eventbrite";

const DEFAULT_BASE_URL: &str = "https://www.eventbriteapi.com/v3";
const DATETIME_PARAM_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextField {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventStart {
    /// Venue-local wall clock time, e.g. `2026-01-15T19:00:00`.
    #[serde(default)]
    pub local: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueAddress {
    #[serde(default)]
    pub localized_address_display: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Venue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<VenueAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPrice {
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketAvailability {
    #[serde(default)]
    pub minimum_ticket_price: Option<TicketPrice>,
}

/// One event as returned by the search endpoint with
/// `expand=venue,ticket_availability`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventbriteEvent {
    #[serde(default)]
    pub name: TextField,
    #[serde(default)]
    pub description: Option<TextField>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start: Option<EventStart>,
    #[serde(default)]
    pub is_free: Option<bool>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(default)]
    pub ticket_availability: Option<TicketAvailability>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    events: Vec<EventbriteEvent>,
}

/// Query parameters for one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventbriteQuery {
    params: Vec<(String, String)>,
}

impl EventbriteQuery {
    #[must_use]
    pub fn from_profile(profile: &SearchProfile, default_location: &str) -> Self {
        let mut params = Vec::new();

        let terms: Vec<&str> = profile
            .categories
            .iter()
            .chain(&profile.keywords)
            .map(String::as_str)
            .collect();
        if !terms.is_empty() {
            params.push(("q".to_string(), terms.join(" ")));
        }

        let location = if profile.location.trim().is_empty() {
            default_location
        } else {
            profile.location.trim()
        };
        params.push(("location.address".to_string(), location.to_string()));

        if let Some(miles) = profile.max_distance_miles {
            params.push(("location.within".to_string(), format!("{}mi", miles.ceil())));
        }
        if let Some(window) = profile.time_window {
            if let Some(start) = window.start {
                params.push((
                    "start_date.range_start".to_string(),
                    start.format(DATETIME_PARAM_FORMAT).to_string(),
                ));
            }
            if let Some(end) = window.end {
                params.push((
                    "start_date.range_end".to_string(),
                    end.format(DATETIME_PARAM_FORMAT).to_string(),
                ));
            }
        }
        if profile.free_only {
            params.push(("price".to_string(), "free".to_string()));
        }
        params.push(("expand".to_string(), "venue,ticket_availability".to_string()));

        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport seam for the search endpoint.
#[async_trait]
pub trait EventbriteApi: Send + Sync {
    async fn search(&self, query: &EventbriteQuery) -> Result<Vec<EventbriteEvent>, SourceError>;
}

/// HTTP client for the Eventbrite v3 API.
pub struct EventbriteClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    retry_delays: Vec<Duration>,
}

impl EventbriteClient {
    pub fn new(api_key: Option<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry_delays: vec![Duration::from_millis(500), Duration::from_secs(1)],
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn try_search(&self, url: &Url, api_key: &str) -> Result<Vec<EventbriteEvent>, SourceError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        Ok(response.events)
    }
}

#[async_trait]
impl EventbriteApi for EventbriteClient {
    async fn search(&self, query: &EventbriteQuery) -> Result<Vec<EventbriteEvent>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingCredentials(SOURCE_NAME))?;

        let url = Url::parse_with_params(
            &format!("{}/events/search/", self.base_url.trim_end_matches('/')),
            query.params(),
        )
        .map_err(|e| SourceError::Malformed(format!("invalid search URL: {e}")))?;

        info!("Searching Eventbrite: {}", query.get("location.address").unwrap_or_default());
        retry_with_backoff(|| self.try_search(&url, api_key), &self.retry_delays).await
    }
}

/// Map one API event onto the shared model.
#[must_use]
pub fn normalize(event: EventbriteEvent) -> NormalizedEvent {
    let title = event.name.text.unwrap_or_default().trim().to_string();
    let start = parse_datetime(event.start.and_then(|s| s.local).as_deref(), None);

    let price = match event.is_free {
        Some(true) => (true, None),
        flag => {
            let display = event
                .ticket_availability
                .and_then(|t| t.minimum_ticket_price)
                .and_then(|p| p.display);
            match parse_price(display.as_deref()) {
                // An explicit paid flag outranks the unknown-price fallback.
                (true, None) if flag == Some(false) => (false, None),
                parsed => parsed,
            }
        }
    };

    let (venue_name, venue_address) = event.venue.map_or((None, None), |v| {
        (v.name, v.address.and_then(|a| a.localized_address_display))
    });

    NormalizedEvent::new(title, SOURCE_NAME)
        .with_start(start)
        .with_venue(venue_name, venue_address)
        .with_price(price)
        .with_url(event.url)
        .with_description(event.description.and_then(|d| d.text))
}

/// Structured-query adapter over an [`EventbriteApi`].
pub struct EventbriteSource<A = EventbriteClient> {
    api: A,
    default_location: String,
}

impl<A: EventbriteApi> EventbriteSource<A> {
    pub fn new(api: A, default_location: impl Into<String>) -> Self {
        Self {
            api,
            default_location: default_location.into(),
        }
    }
}

#[async_trait]
impl<A: EventbriteApi> EventSource for EventbriteSource<A> {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn discover(&self, profile: &SearchProfile) -> Vec<NormalizedEvent> {
        let query = EventbriteQuery::from_profile(profile, &self.default_location);

        let raw = match self.api.search(&query).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Eventbrite search failed: {e}");
                return Vec::new();
            }
        };

        let fetched = raw.len();
        let events = prefilter(profile, raw.into_iter().map(normalize));
        debug!(
            "Eventbrite returned {fetched} events, {} after filtering",
            events.len()
        );
        events
    }
}
