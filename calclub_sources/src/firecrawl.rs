//! Autonomous web-discovery adapter backed by the Firecrawl agent API.
//!
//! The agent receives a natural-language brief plus a JSON schema and crawls
//! on its own; results come back loosely structured, so every item goes
//! through the shared date and price parsers.

use anyhow::Context;
use async_trait::async_trait;
use calclub_core::{EventSource, NormalizedEvent, SearchProfile, parse_datetime, parse_price};
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{SourceError, prefilter};

pub const SOURCE_NAME: &str = "firecrawl-agent";

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";
const PROMPT_DATE_FORMAT: &str = "%B %-d, %Y";

fn default_price() -> String {
    "Free".to_string()
}

/// One event as described by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEventItem {
    pub title: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub venue_address: Option<String>,
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AgentEventItem {
    #[must_use]
    pub fn new(title: impl Into<String>, start_date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start_date: Some(start_date.into()),
            start_time: None,
            venue_name: None,
            venue_address: None,
            price: default_price(),
            url: None,
            description: None,
        }
    }
}

/// Structured-output schema handed to the agent.
#[must_use]
pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "start_date": {"type": "string", "description": "e.g. January 15, 2026"},
                        "start_time": {"type": "string", "description": "e.g. 7:00 PM"},
                        "venue_name": {"type": "string"},
                        "venue_address": {"type": "string"},
                        "price": {"type": "string", "description": "\"Free\" or an amount like $25"},
                        "url": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["title", "start_date", "url"]
                }
            }
        },
        "required": ["events"]
    })
}

/// Pull event items out of the agent's `data` payload.
///
/// Accepts `{"events": [...]}` or a bare list. Items that do not match the
/// item shape are skipped.
#[must_use]
pub fn extract_items(data: Value) -> Vec<AgentEventItem> {
    let list = match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    list.into_iter()
        .filter_map(|item| match serde_json::from_value::<AgentEventItem>(item) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!("Skipping malformed agent item: {e}");
                None
            }
        })
        .collect()
}

/// Natural-language brief for the agent.
#[must_use]
pub fn build_prompt(profile: &SearchProfile, default_location: &str) -> String {
    let location = if profile.location.trim().is_empty() {
        default_location
    } else {
        profile.location.trim()
    };

    let mut sentences = vec![format!("Find upcoming local events in {location}.")];

    if !profile.categories.is_empty() {
        let categories: Vec<&str> = profile.categories.iter().map(String::as_str).collect();
        sentences.push(format!("Focus on these categories: {}.", categories.join(", ")));
    }
    if !profile.keywords.is_empty() {
        let keywords: Vec<&str> = profile.keywords.iter().map(String::as_str).collect();
        sentences.push(format!("Look for events related to: {}.", keywords.join(", ")));
    }
    if let Some(window) = profile.time_window {
        let day = |at: NaiveDateTime| at.format(PROMPT_DATE_FORMAT).to_string();
        match (window.start, window.end) {
            (Some(start), Some(end)) => {
                sentences.push(format!("Only include events between {} and {}.", day(start), day(end)));
            }
            (Some(start), None) => sentences.push(format!("Only include events on or after {}.", day(start))),
            (None, Some(end)) => sentences.push(format!("Only include events on or before {}.", day(end))),
            (None, None) => {}
        }
    }
    if let Some(miles) = profile.max_distance_miles {
        sentences.push(format!("Stay within {miles} miles of {location}."));
    }
    if profile.free_only {
        sentences.push("Only include events that are free to attend.".to_string());
    }
    sentences.push(
        "For each event give the title, start date, start time, venue name, venue address, \
         price (\"Free\" if there is no charge), event URL and a one-sentence description."
            .to_string(),
    );
    sentences.join(" ")
}

/// Map one agent item onto the shared model.
#[must_use]
pub fn normalize(item: AgentEventItem) -> NormalizedEvent {
    let start = parse_datetime(item.start_date.as_deref(), item.start_time.as_deref());
    NormalizedEvent::new(item.title.trim(), SOURCE_NAME)
        .with_start(start)
        .with_venue(item.venue_name, item.venue_address)
        .with_price(parse_price(Some(&item.price)))
        .with_url(item.url)
        .with_description(item.description)
}

/// Backend seam: run one discovery job for a prompt.
#[async_trait]
pub trait DiscoveryAgent: Send + Sync {
    async fn discover_events(&self, prompt: &str) -> Result<Vec<AgentEventItem>, SourceError>;
}

/// HTTP client for Firecrawl's agent endpoint.
///
/// Submits a job, then polls its status until it completes, fails, or the
/// overall `timeout` elapses.
pub struct FirecrawlAgentClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl FirecrawlAgentClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            timeout,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v2/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn run_job(&self, api_key: &str, prompt: &str) -> Result<Vec<AgentEventItem>, SourceError> {
        let submitted = self
            .client
            .post(self.endpoint("agent"))
            .bearer_auth(api_key)
            .json(&json!({
                "prompt": prompt,
                "schema": output_schema(),
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        if let Some(items) = Self::finished_items(&submitted)? {
            return Ok(items);
        }

        let job_id = submitted["id"]
            .as_str()
            .ok_or_else(|| SourceError::Malformed("agent response has neither data nor id".to_string()))?
            .to_string();
        info!("Firecrawl agent job submitted: {job_id}");

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let status = self
                .client
                .get(self.endpoint(&format!("agent/{job_id}")))
                .bearer_auth(api_key)
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await?;

            if let Some(items) = Self::finished_items(&status)? {
                return Ok(items);
            }
            debug!("Firecrawl agent job {job_id} still running");
        }
    }

    /// `Some(items)` once a job payload is terminal and successful.
    fn finished_items(payload: &Value) -> Result<Option<Vec<AgentEventItem>>, SourceError> {
        match payload["status"].as_str() {
            Some("failed" | "cancelled") => Err(SourceError::JobFailed(
                payload["error"].as_str().unwrap_or("unknown error").to_string(),
            )),
            Some("completed") => Ok(Some(extract_items(payload["data"].clone()))),
            None if !payload["data"].is_null() => Ok(Some(extract_items(payload["data"].clone()))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl DiscoveryAgent for FirecrawlAgentClient {
    async fn discover_events(&self, prompt: &str) -> Result<Vec<AgentEventItem>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingCredentials(SOURCE_NAME))?;

        tokio::time::timeout(self.timeout, self.run_job(api_key, prompt))
            .await
            .map_err(|_| SourceError::Timeout(self.timeout))?
    }
}

/// Prompt-driven adapter over a [`DiscoveryAgent`].
pub struct FirecrawlSource<A = FirecrawlAgentClient> {
    agent: A,
    default_location: String,
}

impl<A: DiscoveryAgent> FirecrawlSource<A> {
    pub fn new(agent: A, default_location: impl Into<String>) -> Self {
        Self {
            agent,
            default_location: default_location.into(),
        }
    }
}

#[async_trait]
impl<A: DiscoveryAgent> EventSource for FirecrawlSource<A> {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn discover(&self, profile: &SearchProfile) -> Vec<NormalizedEvent> {
        let prompt = build_prompt(profile, &self.default_location);
        debug!("Firecrawl agent prompt: {prompt}");

        let items = match self.agent.discover_events(&prompt).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Firecrawl agent discovery failed: {e}");
                return Vec::new();
            }
        };

        let fetched = items.len();
        let events = prefilter(profile, items.into_iter().map(normalize));
        debug!(
            "Firecrawl agent returned {fetched} events, {} after filtering",
            events.len()
        );
        events
    }
}
