//! Static strategy pattern for CLI commands.
//!
//! Each command is its own strategy type with its own input type.

use anyhow::Context;
use calclub_config::Config;
use calclub_core::{NormalizedEvent, export_eligible};
use calclub_search::{Aggregator, AggregatorConfig};
use calclub_sources::{EventbriteClient, EventbriteSource, FirecrawlAgentClient, FirecrawlSource};
use std::sync::Arc;
use tracing::{info, warn};

mod info;
mod init;
mod search;
mod session;
mod version;

pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use search::{SearchInput, SearchStrategy};
pub use session::{SessionInput, SessionStrategy};
pub use version::VersionStrategy;

/// Contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Build the aggregator with every configured source.
///
/// The ticketing source is registered first so it wins dedup ties.
fn build_aggregator(config: &Config) -> anyhow::Result<Aggregator> {
    let location = config.search.default_location.clone();
    let source_timeout = config.search.source_timeout();

    let eventbrite = &config.providers.eventbrite;
    let eventbrite_client = EventbriteClient::new(Some(eventbrite.api_key.clone()), source_timeout)
        .context("Failed to build Eventbrite client")?
        .with_base_url(eventbrite.base_url.clone());
    if !eventbrite_client.has_credentials() {
        warn!("Eventbrite API key not set, the ticketing source will return nothing");
    }

    let firecrawl = &config.providers.firecrawl;
    let firecrawl_client = FirecrawlAgentClient::new(Some(firecrawl.api_key.clone()), source_timeout)
        .context("Failed to build Firecrawl client")?
        .with_base_url(firecrawl.base_url.clone())
        .with_poll_interval(firecrawl.poll_interval());
    if !firecrawl_client.has_credentials() {
        warn!("Firecrawl API key not set, the discovery source will return nothing");
    }

    let aggregator = Aggregator::new(AggregatorConfig {
        source_timeout,
        search_timeout: config.search.search_timeout(),
        cache_ttl: config.cache.ttl(),
    })
    .with_source(Arc::new(EventbriteSource::new(eventbrite_client, location.clone())))
    .with_source(Arc::new(FirecrawlSource::new(firecrawl_client, location)));

    info!("Sources: {}", aggregator.source_names().join(", "));
    Ok(aggregator)
}

fn format_price(event: &NormalizedEvent) -> String {
    match event.price_amount {
        Some(cents) if !event.is_free => format!("${}.{:02}", cents / 100, cents % 100),
        _ => "Free".to_string(),
    }
}

/// One human-readable block per event.
fn format_event(event: &NormalizedEvent) -> String {
    let when = event
        .start
        .map_or_else(|| "Date TBD".to_string(), |s| s.format("%a %b %-d, %-I:%M %p").to_string());

    let mut out = format!("{when}  {}  [{}]  ({})", event.title, format_price(event), event.source);
    if let Some(venue) = &event.venue_name {
        out.push_str("\n    @ ");
        out.push_str(venue);
        if let Some(address) = &event.venue_address {
            out.push_str(", ");
            out.push_str(address);
        }
    }
    if let Some(url) = &event.url {
        out.push_str("\n    ");
        out.push_str(url);
    }
    out
}

fn print_events(events: &[NormalizedEvent], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    for event in events {
        println!("{}\n", format_event(event));
    }
    let exportable = export_eligible(events).len();
    println!(
        "{} events, {exportable} with a date and title for calendar export.",
        events.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn price_formatting() {
        let paid = NormalizedEvent::new("Workshop", "test").with_price((false, Some(1050)));
        let zero = NormalizedEvent::new("Social", "test").with_price((false, Some(0)));
        let free = NormalizedEvent::new("Talk", "test");
        assert_eq!(format_price(&paid), "$10.50");
        assert_eq!(format_price(&zero), "$0.00");
        assert_eq!(format_price(&free), "Free");
    }

    #[test]
    fn event_block_includes_venue_and_url() {
        let event = NormalizedEvent::new("AI Meetup", "eventbrite")
            .with_start(NaiveDate::from_ymd_opt(2026, 1, 15).and_then(|d| d.and_hms_opt(19, 0, 0)))
            .with_venue(Some("Rev1 Ventures".to_string()), Some("1275 Kinnear Rd".to_string()))
            .with_url(Some("https://example.com/e/1".to_string()));

        let block = format_event(&event);
        assert!(block.starts_with("Thu Jan 15, 7:00 PM  AI Meetup  [Free]  (eventbrite)"));
        assert!(block.contains("@ Rev1 Ventures, 1275 Kinnear Rd"));
        assert!(block.ends_with("https://example.com/e/1"));
    }

    #[test]
    fn undated_event_block() {
        let block = format_event(&NormalizedEvent::new("Mystery Show", "firecrawl-agent"));
        assert_eq!(block, "Date TBD  Mystery Show  [Free]  (firecrawl-agent)");
    }
}
