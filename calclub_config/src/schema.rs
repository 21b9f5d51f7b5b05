use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const EVENTBRITE_API_KEY_ENV: &str = "EVENTBRITE_API_KEY";
pub const FIRECRAWL_API_KEY_ENV: &str = "FIRECRAWL_API_KEY";

const CONFIG_DIR_NAME: &str = "calclub";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub eventbrite: EventbriteConfig,
    #[serde(default)]
    pub firecrawl: FirecrawlConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EventbriteConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "EventbriteConfig::default_base_url")]
    pub base_url: String,
}

impl Default for EventbriteConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::default_base_url(),
        }
    }
}

impl EventbriteConfig {
    fn default_base_url() -> String {
        "https://www.eventbriteapi.com/v3".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FirecrawlConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "FirecrawlConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "FirecrawlConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::default_base_url(),
            poll_interval_ms: Self::default_poll_interval_ms(),
        }
    }
}

impl FirecrawlConfig {
    fn default_base_url() -> String {
        "https://api.firecrawl.dev".to_string()
    }

    const fn default_poll_interval_ms() -> u64 {
        2000
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_location")]
    pub default_location: String,
    #[serde(default = "SearchConfig::default_source_timeout_secs")]
    pub source_timeout_secs: u64,
    #[serde(default = "SearchConfig::default_search_timeout_secs")]
    pub search_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_location: Self::default_location(),
            source_timeout_secs: Self::default_source_timeout_secs(),
            search_timeout_secs: Self::default_search_timeout_secs(),
        }
    }
}

impl SearchConfig {
    fn default_location() -> String {
        "Columbus, Ohio".to_string()
    }

    const fn default_source_timeout_secs() -> u64 {
        30
    }

    const fn default_search_timeout_secs() -> u64 {
        60
    }

    #[must_use]
    pub const fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    #[must_use]
    pub const fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "CacheConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    const fn default_ttl_secs() -> u64 {
        900
    }

    const fn default_sweep_interval_secs() -> u64 {
        60
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "SessionConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: Self::default_idle_timeout_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
        }
    }
}

impl SessionConfig {
    const fn default_idle_timeout_secs() -> u64 {
        3600
    }

    const fn default_sweep_interval_secs() -> u64 {
        300
    }

    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Load `~/calclub/config.json` and apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'calclub init' to create config.",
                config_path.display()
            );
        }

        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject periods the background tasks cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let periods = [
            ("cache.sweep_interval_secs", self.cache.sweep_interval_secs),
            ("session.sweep_interval_secs", self.session.sweep_interval_secs),
            ("providers.firecrawl.poll_interval_ms", self.providers.firecrawl.poll_interval_ms),
        ];
        for (key, value) in periods {
            if value == 0 {
                anyhow::bail!("{key} must be greater than zero");
            }
        }
        Ok(())
    }

    /// Non-empty values from `lookup` replace the file's API keys.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(EVENTBRITE_API_KEY_ENV) {
            debug!("Using {EVENTBRITE_API_KEY_ENV} from environment");
            self.providers.eventbrite.api_key = key;
        }
        if let Some(key) = non_empty(FIRECRAWL_API_KEY_ENV) {
            debug!("Using {FIRECRAWL_API_KEY_ENV} from environment");
            self.providers.firecrawl.api_key = key;
        }
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR_NAME))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;
        Ok(config_path)
    }
}

pub const CONFIG_TEMPLATE: &str = r#"{
  "providers": {
    "eventbrite": {
      "api_key": "",
      "base_url": "https://www.eventbriteapi.com/v3"
    },
    "firecrawl": {
      "api_key": "",
      "base_url": "https://api.firecrawl.dev",
      "poll_interval_ms": 2000
    }
  },
  "search": {
    "default_location": "Columbus, Ohio",
    "source_timeout_secs": 30,
    "search_timeout_secs": 60
  },
  "cache": {
    "ttl_secs": 900,
    "sweep_interval_secs": 60
  },
  "session": {
    "idle_timeout_secs": 3600,
    "sweep_interval_secs": 300
  }
}"#;
