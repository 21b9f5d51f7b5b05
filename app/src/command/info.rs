use calclub_config::Config;

/// Strategy for displaying configuration information: masked API keys,
/// endpoints, time budgets, cache and session settings.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== calclub Configuration ===\n");

        println!("Sources:");
        let eventbrite = &config.providers.eventbrite;
        println!("  Eventbrite: {}", mask_key(&eventbrite.api_key));
        println!("    URL: {}", eventbrite.base_url);
        let firecrawl = &config.providers.firecrawl;
        println!("  Firecrawl:  {}", mask_key(&firecrawl.api_key));
        println!("    URL: {}", firecrawl.base_url);
        println!("    Poll Interval: {}ms", firecrawl.poll_interval_ms);
        println!();

        println!("Search:");
        println!("  Default Location: {}", config.search.default_location);
        println!("  Source Timeout: {}s", config.search.source_timeout_secs);
        println!("  Search Timeout: {}s", config.search.search_timeout_secs);
        println!();

        println!("Cache:");
        println!("  TTL: {}s", config.cache.ttl_secs);
        println!("  Sweep Interval: {}s", config.cache.sweep_interval_secs);
        println!();

        println!("Session:");
        println!("  Idle Timeout: {}s", config.session.idle_timeout_secs);
        println!("  Sweep Interval: {}s", config.session.sweep_interval_secs);

        Ok(())
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n > 8 => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}...{tail}")
        }
        _ => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_masked() {
        assert_eq!(mask_key(""), "(not set)");
        assert_eq!(mask_key("short"), "***");
        assert_eq!(mask_key("abcd1234efgh5678"), "abcd...5678");
    }
}
