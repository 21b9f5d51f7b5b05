use calclub_config::{Config, EVENTBRITE_API_KEY_ENV, FIRECRAWL_API_KEY_ENV};

/// Strategy for initializing the configuration.
///
/// Creates the default configuration file at `~/calclub/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config_path = Config::create_config()?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add your Eventbrite and Firecrawl API keys to the config file,");
        println!("      or export {EVENTBRITE_API_KEY_ENV} / {FIRECRAWL_API_KEY_ENV}");
        println!("   2. Set search.default_location to your city");
        println!("   3. Run 'calclub search --when \"this weekend\"' or 'calclub session'");
        println!();
        println!("🔧 Configuration options:");
        println!("   - search.source_timeout_secs: how long one source may take");
        println!("   - search.search_timeout_secs: overall budget for one search");
        println!("   - cache.ttl_secs: how long identical searches are served from cache");
        println!("   - session.idle_timeout_secs: inactivity before a session is dropped");
        println!();
        Ok(())
    }
}
